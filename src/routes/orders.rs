use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::orders::{CreateOrderRequest, OrderList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<Order>),
        (status = 200, description = "Existing order for a repeated client_request_id", body = ApiResponse<Order>),
        (status = 400, description = "Invalid order"),
        (status = 409, description = "client_request_id belongs to another user")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let placed = state.orders.create(user.user_id, payload.into()).await?;
    let (status, message) = if placed.created {
        (StatusCode::CREATED, "Order created")
    } else {
        (StatusCode::OK, "Order already exists")
    };
    Ok((
        status,
        Json(ApiResponse::success(message, placed.order, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Caller's 50 most recent orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let items = state.orders.list(user.user_id).await?;
    let total = items.len() as i64;
    Ok(Json(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(1, total, total)),
    )))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<Order>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.get(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("OK", order, Some(Meta::empty()))))
}
