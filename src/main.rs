use dotenvy::dotenv;
use order_kv_service::{build_server, build_service, AppConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    log::info!(
        "Starting server at http://{}:{} (order ttl {:?})",
        config.host,
        config.port,
        config.order_ttl
    );

    build_server(build_service(&config), &config.host, config.port)?.await
}
