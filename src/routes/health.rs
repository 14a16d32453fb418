use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::response::{ApiResponse, Meta};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct VersionData {
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<HealthData>> {
    let data = HealthData {
        status: "ok".to_string(),
    };

    Json(ApiResponse::success(
        "Health check",
        data,
        Some(Meta::empty()),
    ))
}

#[utoipa::path(
    get,
    path = "/version",
    responses(
        (status = 200, description = "Build version", body = ApiResponse<VersionData>),
    ),
    tag = "Health"
)]
pub async fn version() -> Json<ApiResponse<VersionData>> {
    let data = VersionData {
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(ApiResponse::success("Version", data, Some(Meta::empty())))
}
