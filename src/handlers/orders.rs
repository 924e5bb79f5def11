use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::domain::order::{LineItem, Order, OrderStatus};
use crate::domain::ports::OrderRepository;
use crate::errors::AppError;

pub type SharedOrderService = OrderService<Arc<dyn OrderRepository>>;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct LineItemRequest {
    pub item_id: Uuid,
    pub quantity: u32,
    /// Unit price in the smallest currency unit, e.g. cents.
    pub price: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[serde(default)]
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    /// Either "shipped" or "completed".
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LineItemResponse {
    pub item_id: Uuid,
    pub quantity: u32,
    pub price: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItemResponse>,
    /// Sum of price times quantity over all line items.
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        let total = o.total();
        Self {
            order_id: o.order_id,
            customer_id: o.customer_id,
            line_items: o
                .line_items
                .into_iter()
                .map(|l| LineItemResponse {
                    item_id: l.item_id,
                    quantity: l.quantity,
                    price: l.price,
                })
                .collect(),
            total,
            created_at: o.created_at,
            shipped_at: o.shipped_at,
            completed_at: o.completed_at,
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Cursor returned by the previous page. Defaults to 0 (start).
    #[serde(default)]
    pub cursor: u64,
    /// Number of orders to examine. Defaults to 50.
    #[serde(default = "default_size")]
    pub size: u64,
}

fn default_size() -> u64 {
    50
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    /// Cursor for the next page; absent once every order has been listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<u64>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// POST /orders
///
/// Stores a new order under a generated id. The order record and its index
/// entry are written in one store transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = OrderResponse),
        (status = 409, description = "Generated order id already in use"),
        (status = 503, description = "Store unavailable"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<SharedOrderService>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let line_items = body
        .line_items
        .into_iter()
        .map(|l| LineItem {
            item_id: l.item_id,
            quantity: l.quantity,
            price: l.price,
        })
        .collect();

    let order = web::block(move || service.create_order(body.customer_id, line_items))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns one page of orders. Pages come in no particular order; keep
/// passing `next` back as `cursor` until it is absent.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("cursor" = Option<u64>, Query, description = "Cursor from the previous page (default 0)"),
        ("size" = Option<u64>, Query, description = "Orders to examine per page (default 50)"),
    ),
    responses(
        (status = 200, description = "One page of orders", body = ListOrdersResponse),
        (status = 503, description = "Store unavailable"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    service: web::Data<SharedOrderService>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();

    let result = web::block(move || service.list_orders(params.cursor, params.size))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.orders.into_iter().map(OrderResponse::from).collect(),
        next: (result.cursor != 0).then_some(result.cursor),
    }))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = u64, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<SharedOrderService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{id}
///
/// Records the next lifecycle milestone. An order must ship before it can
/// complete, and each milestone is recorded once.
#[utoipa::path(
    put,
    path = "/orders/{id}",
    params(
        ("id" = u64, Path, description = "Order id"),
    ),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Unknown status or invalid transition"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    service: web::Data<SharedOrderService>,
    path: web::Path<u64>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status: OrderStatus = body.status.parse()?;

    let order = web::block(move || service.update_status(order_id, status))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /orders/{id}
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(
        ("id" = u64, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    service: web::Data<SharedOrderService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    web::block(move || service.delete_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().finish())
}
