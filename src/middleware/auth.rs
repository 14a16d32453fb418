use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::{
    error::AppError,
    services::token_service::{Claims, Role},
    state::AppState,
};

/// A Mini-App user authenticated by a bearer session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub telegram_id: Option<i64>,
}

/// An administrator authenticated by a bearer token with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub admin_id: i64,
}

fn bearer_claims(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid authorization header".into()))?;

    let token = match auth_str.strip_prefix("Bearer ") {
        Some(t) => t.trim(),
        None => return Err(AppError::Unauthorized("invalid authorization scheme".into())),
    };

    state
        .tokens
        .verify(token)
        .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))
}

pub fn ensure_role(claims: &Claims, role: Role) -> Result<(), AppError> {
    if claims.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        ensure_role(&claims, Role::User)?;
        Ok(AuthUser {
            user_id: claims.sub,
            telegram_id: claims.telegram_id,
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        ensure_role(&claims, Role::Admin)?;
        Ok(AdminUser {
            admin_id: claims.sub,
        })
    }
}
