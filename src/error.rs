use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};
use crate::services::{
    address_service::AddressError, admin_auth_service::AdminAuthError, auth_service::AuthError,
    catalog_admin_service::CatalogError, order_service::OrderError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("Too Many Requests")]
    TooManyRequests,

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::OrmError(err) => tracing::error!(error = %err, "database failure"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal failure"),
            _ => {}
        }

        let message = status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string();
        let error = match &self {
            AppError::OrmError(_) | AppError::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        let body = ApiResponse {
            message,
            data: Some(ErrorData { error }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => AppError::NotFound,
            OrderError::IdempotencyConflict => AppError::Conflict(err.to_string()),
            OrderError::Storage(db) => AppError::OrmError(db),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Storage(db) => AppError::OrmError(db),
            AuthError::Token(e) => AppError::Internal(anyhow::anyhow!(e)),
            AuthError::InvalidRegisterInput => AppError::BadRequest(err.to_string()),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AdminAuthError> for AppError {
    fn from(err: AdminAuthError) -> Self {
        match err {
            AdminAuthError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            AdminAuthError::Storage(db) => AppError::OrmError(db),
            AdminAuthError::Hash(e) => AppError::Internal(anyhow::anyhow!(e)),
            AdminAuthError::Token(e) => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => AppError::NotFound,
            CatalogError::InUse(_) => AppError::Conflict(err.to_string()),
            CatalogError::Storage(db) => AppError::OrmError(db),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::NotFound => AppError::NotFound,
            AddressError::Storage(db) => AppError::OrmError(db),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
