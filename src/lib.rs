pub mod application;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::order_service::OrderService;
use domain::ports::OrderRepository;
use handlers::orders::SharedOrderService;
use infrastructure::memory_store::InMemoryKvStore;
use infrastructure::order_repo::KvOrderRepository;

pub use config::AppConfig;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
    ),
    components(schemas(
        handlers::orders::CreateOrderRequest,
        handlers::orders::LineItemRequest,
        handlers::orders::UpdateOrderRequest,
        handlers::orders::OrderResponse,
        handlers::orders::LineItemResponse,
        handlers::orders::ListOrdersResponse,
    )),
    tags((name = "orders", description = "Order storage"))
)]
pub struct ApiDoc;

/// Wire the order service onto a fresh in-process key-value store.
pub fn build_service(config: &AppConfig) -> SharedOrderService {
    let repo: Arc<dyn OrderRepository> = Arc::new(KvOrderRepository::with_ttl(
        InMemoryKvStore::new(),
        config.order_ttl,
    ));
    OrderService::new(repo)
}

/// Register the health check and the `/orders` routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::orders::health))
        .service(
            web::scope("/orders")
                .route("", web::post().to(handlers::orders::create_order))
                .route("", web::get().to(handlers::orders::list_orders))
                .route("/{id}", web::get().to(handlers::orders::get_order))
                .route("/{id}", web::put().to(handlers::orders::update_order))
                .route("/{id}", web::delete().to(handlers::orders::delete_order)),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    service: SharedOrderService,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(service);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::default())
            .configure(configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
