use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::profile::ProfileResponse,
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::profile_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Current user and saved addresses", body = ApiResponse<ProfileResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = profile_service::get_profile(&state, user.user_id).await?;
    Ok(Json(ApiResponse::success("Ok", profile, Some(Meta::empty()))))
}
