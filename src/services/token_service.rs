use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Session token claims. `sub` is a user id for `Role::User` and an admin id
/// for `Role::Admin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    user_ttl: Duration,
    admin_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        secret: &str,
        user_ttl_secs: i64,
        admin_ttl_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            user_ttl: Duration::seconds(user_ttl_secs),
            admin_ttl: Duration::seconds(admin_ttl_secs),
            clock,
        }
    }

    pub fn issue_user(
        &self,
        user_id: i64,
        telegram_id: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(user_id, Some(telegram_id), Role::User, self.user_ttl)
    }

    pub fn issue_admin(&self, admin_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(admin_id, None, Role::Admin, self.admin_ttl)
    }

    fn issue(
        &self,
        sub: i64,
        telegram_id: Option<i64>,
        role: Role,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = self.clock.utc();
        let claims = Claims {
            sub,
            telegram_id,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Checks signature, algorithm, expiry and claim shape.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}
