use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};

use crate::{
    dto::auth::{
        AdminLoginRequest, BotRegisterRequest, TelegramAuthRequest, TelegramAuthResponse,
        TokenResponse,
    },
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const BOT_SECRET_HEADER: &str = "x-bot-secret";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/telegram", post(telegram_login))
        .route("/bot/register", post(bot_register))
        .route("/admin/login", post(admin_login))
}

#[utoipa::path(
    post,
    path = "/auth/telegram",
    request_body = TelegramAuthRequest,
    responses(
        (status = 200, description = "Session token and profile", body = ApiResponse<TelegramAuthResponse>),
        (status = 401, description = "Invalid, expired or unsigned initData")
    ),
    tag = "Auth"
)]
pub async fn telegram_login(
    State(state): State<AppState>,
    Json(payload): Json<TelegramAuthRequest>,
) -> AppResult<Json<ApiResponse<TelegramAuthResponse>>> {
    let session = state.auth.authenticate(&payload.init_data).await?;
    let data = TelegramAuthResponse {
        token: session.token,
        profile: session.profile,
    };
    Ok(Json(ApiResponse::success(
        "Authenticated",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/bot/register",
    request_body = BotRegisterRequest,
    params(
        ("X-Bot-Secret" = Option<String>, Header, description = "Required when the server has a bot secret configured")
    ),
    responses(
        (status = 200, description = "Session token for the registered user", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Missing name, phone or location"),
        (status = 401, description = "Bot secret mismatch")
    ),
    tag = "Auth"
)]
pub async fn bot_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BotRegisterRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    if let Some(expected) = state.config.bot_register_secret.as_deref() {
        let supplied = headers
            .get(BOT_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if supplied != expected {
            return Err(AppError::Unauthorized("invalid bot secret".into()));
        }
    }

    let token = state.auth.register_bot_user(payload.into()).await?;
    Ok(Json(ApiResponse::success(
        "Registered",
        TokenResponse { token },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin session token", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let token = state
        .admin_auth
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(ApiResponse::success(
        "Logged in",
        TokenResponse { token },
        Some(Meta::empty()),
    )))
}
