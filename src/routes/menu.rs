use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::menu::{MenuResponse, RegionList},
    error::AppResult,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/menu", get(get_menu))
        .route("/regions", get(list_regions))
}

#[utoipa::path(
    get,
    path = "/menu",
    responses(
        (status = 200, description = "Active categories with their active products", body = ApiResponse<MenuResponse>)
    ),
    tag = "Menu"
)]
pub async fn get_menu(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<MenuResponse>>> {
    let categories = state.menu.get_menu().await?;
    Ok(Json(ApiResponse::success(
        "Ok",
        MenuResponse { categories },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/regions",
    responses(
        (status = 200, description = "Active delivery regions", body = ApiResponse<RegionList>)
    ),
    tag = "Menu"
)]
pub async fn list_regions(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RegionList>>> {
    let regions = state.menu.get_regions().await?;
    Ok(Json(ApiResponse::success(
        "Ok",
        RegionList { regions },
        Some(Meta::empty()),
    )))
}
