use std::sync::Arc;

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::DbErr;
use thiserror::Error;

use crate::{repository::AdminUserRepository, services::token_service::TokenService};

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),
    #[error(transparent)]
    Storage(#[from] DbErr),
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct AdminAuthService {
    admins: Arc<dyn AdminUserRepository>,
    tokens: TokenService,
}

impl AdminAuthService {
    pub fn new(admins: Arc<dyn AdminUserRepository>, tokens: TokenService) -> Self {
        Self { admins, tokens }
    }

    /// Creates the bootstrap admin unless the username already exists.
    pub async fn ensure_default_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), AdminAuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            tracing::warn!("default admin credentials are empty; skipping");
            return Ok(());
        }
        let hash = hash_password(password)?;
        if self.admins.ensure_user(username, &hash).await? {
            tracing::info!(username, "default admin created");
        }
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String, AdminAuthError> {
        let admin = match self.admins.find_by_username(username.trim()).await? {
            Some(a) => a,
            None => return Err(AdminAuthError::InvalidCredentials),
        };

        let parsed_hash = match PasswordHash::new(&admin.password_hash) {
            Ok(h) => h,
            Err(err) => {
                tracing::warn!(error = %err, admin_id = admin.id, "stored admin hash is malformed");
                return Err(AdminAuthError::InvalidCredentials);
            }
        };
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Err(AdminAuthError::InvalidCredentials);
        }

        Ok(self.tokens.issue_admin(admin.id)?)
    }
}

pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AdminAuthError::Hash)?
        .to_string();
    Ok(hash)
}
