use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::{
    dto::addresses::{AddressList, AddressRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/{id}", put(update_address).delete(delete_address))
}

#[utoipa::path(
    get,
    path = "/addresses",
    responses(
        (status = 200, description = "Caller's addresses, default first", body = ApiResponse<AddressList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let items = state.addresses.list(user.user_id).await?;
    let total = items.len() as i64;
    Ok(Json(ApiResponse::success(
        "Ok",
        AddressList { items },
        Some(Meta::new(1, total, total)),
    )))
}

#[utoipa::path(
    post,
    path = "/addresses",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Address created", body = ApiResponse<Address>),
        (status = 400, description = "Invalid address")
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Address>>)> {
    let address = state.addresses.create(user.user_id, payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Address created",
            address,
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    put,
    path = "/addresses/{id}",
    params(("id" = i64, Path, description = "Address id")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<Address>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let address = state
        .addresses
        .update(user.user_id, id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(
        "Address updated",
        address,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/addresses/{id}",
    params(("id" = i64, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address deleted"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.addresses.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Address deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    )))
}
