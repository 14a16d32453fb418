use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::{
        admin::{CategoryRequest, ProductRequest, RegionRequest},
        orders::{AdminOrderListQuery, OrderList, UpdateOrderStatusRequest},
    },
    error::AppResult,
    middleware::auth::AdminUser,
    models::{Category, Order, Product, Region},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_all_orders))
        .route("/admin/orders/{id}/status", put(update_order_status))
        .route("/admin/categories", post(create_category))
        .route(
            "/admin/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/admin/products", post(create_product))
        .route(
            "/admin/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route("/admin/regions", post(create_region))
        .route(
            "/admin/regions/{id}",
            put(update_region).delete(delete_region),
        )
}

fn deleted(message: &str, id: i64) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        message,
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

#[utoipa::path(
    get,
    path = "/admin/orders",
    params(AdminOrderListQuery),
    responses(
        (status = 200, description = "Orders across all users, newest first", body = ApiResponse<OrderList>),
        (status = 400, description = "Invalid filter"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminOrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let items = state.orders.list_admin(query.into()).await?;
    let total = items.len() as i64;
    Ok(Json(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(1, total, total)),
    )))
}

#[utoipa::path(
    put,
    path = "/admin/orders/{id}/status",
    params(("id" = i64, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.update_status(id, &payload.status).await?;
    tracing::debug!(admin_id = admin.admin_id, order_id = id, "admin changed order status");
    Ok(Json(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CategoryRequest,
    responses((status = 201, description = "Category created", body = ApiResponse<Category>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Category>>)> {
    let category = state.catalog.create_category(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Category created", category, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category = state.catalog.update_category(id, payload.into()).await?;
    Ok(Json(ApiResponse::success("Category updated", category, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.catalog.delete_category(id).await?;
    Ok(deleted("Category deleted", id))
}

#[utoipa::path(
    post,
    path = "/admin/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<ProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = state.catalog.create_product(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Product created", product, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    put,
    path = "/admin/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<ProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = state.catalog.update_product(id, payload.into()).await?;
    Ok(Json(ApiResponse::success("Product updated", product, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.catalog.delete_product(id).await?;
    Ok(deleted("Product deleted", id))
}

#[utoipa::path(
    post,
    path = "/admin/regions",
    request_body = RegionRequest,
    responses((status = 201, description = "Region created", body = ApiResponse<Region>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_region(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<RegionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Region>>)> {
    let region = state.catalog.create_region(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Region created", region, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    put,
    path = "/admin/regions/{id}",
    params(("id" = i64, Path, description = "Region id")),
    request_body = RegionRequest,
    responses(
        (status = 200, description = "Region updated", body = ApiResponse<Region>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_region(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<RegionRequest>,
) -> AppResult<Json<ApiResponse<Region>>> {
    let region = state.catalog.update_region(id, payload.into()).await?;
    Ok(Json(ApiResponse::success("Region updated", region, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/admin/regions/{id}",
    params(("id" = i64, Path, description = "Region id")),
    responses(
        (status = 200, description = "Region deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Region still referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_region(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.catalog.delete_region(id).await?;
    Ok(deleted("Region deleted", id))
}
