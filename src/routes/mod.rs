use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderName, HeaderValue, Request, Response, StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::get,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::AppConfig,
    metrics::{metrics_handler, track_metrics},
    middleware::rate_limit::{limit_admins, limit_users},
    response::{ApiResponse, Meta},
    routes::doc::scalar_docs,
    state::AppState,
};

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod doc;
pub mod health;
pub mod menu;
pub mod orders;
pub mod profile;

// Build the API router without binding state; it will be provided at the top level.
// User and admin groups are rate limited per client IP.
pub fn create_api_router(state: &AppState) -> Router<AppState> {
    let user_routes = Router::new()
        .merge(profile::router())
        .merge(addresses::router())
        .merge(orders::router())
        .route_layer(from_fn_with_state(state.clone(), limit_users));

    let admin_routes =
        admin::router().route_layer(from_fn_with_state(state.clone(), limit_admins));

    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/version", get(health::version))
        .route("/metrics", get(metrics_handler))
        .merge(menu::router())
        .merge(auth::router())
        .merge(user_routes)
        .merge(admin_routes)
}

/// The full application: API routes, docs, fallback and the tower stack.
pub fn app(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "request started"
            );
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    let timeout = timeout_layer(Duration::from_secs(state.config.request_timeout_secs.max(1)));
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(create_api_router(&state))
        .merge(scalar_docs())
        .route_layer(from_fn_with_state(state.clone(), track_metrics))
        .fallback(not_found)
        .layer(timeout)
        .layer(cors)
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(ConcurrencyLimitLayer::new(100))
        .with_state(state)
}

fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if origins.is_empty() {
        if config.is_production() {
            return CorsLayer::new();
        }
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
