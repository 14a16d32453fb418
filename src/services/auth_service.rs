//! Telegram Mini-App authentication and bot-driven registration.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use mockable::Clock;
use sea_orm::DbErr;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    models::User,
    repository::{TelegramProfile, UserRepository},
    services::token_service::TokenService,
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid init data")]
    InvalidInitData,
    #[error("init data expired")]
    ExpiredInitData,
    #[error("user payload is missing")]
    MissingUserPayload,
    #[error("first name, phone and location are required")]
    InvalidRegisterInput,
    #[error(transparent)]
    Storage(#[from] DbErr),
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// The `user` field of Telegram initData.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub language_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BotRegistration {
    pub telegram_id: i64,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    /// Used when `first_name` is blank.
    pub name: String,
    pub location: Option<Location>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub profile: User,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    bot_token: String,
    init_data_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        bot_token: impl Into<String>,
        init_data_ttl_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            tokens,
            bot_token: bot_token.into(),
            init_data_ttl: Duration::seconds(init_data_ttl_secs),
            clock,
        }
    }

    pub async fn authenticate(&self, init_data: &str) -> Result<Session, AuthError> {
        let fields = verify_init_data(
            init_data,
            &self.bot_token,
            self.clock.utc(),
            self.init_data_ttl,
        )?;

        let raw_user = fields
            .get("user")
            .filter(|u| !u.is_empty())
            .ok_or(AuthError::MissingUserPayload)?;
        let tg_user: TelegramUser =
            serde_json::from_str(raw_user).map_err(|_| AuthError::InvalidInitData)?;

        let user = self
            .users
            .upsert_telegram_user(TelegramProfile {
                telegram_id: tg_user.id,
                first_name: tg_user.first_name,
                last_name: tg_user.last_name,
                username: tg_user.username,
                phone: tg_user.phone_number.trim().to_string(),
                language: tg_user.language_code,
                latitude: None,
                longitude: None,
            })
            .await?;

        let token = self.tokens.issue_user(user.id, user.telegram_id)?;
        tracing::debug!(user_id = user.id, "telegram user authenticated");
        Ok(Session {
            token,
            profile: user,
        })
    }

    pub async fn register_bot_user(&self, input: BotRegistration) -> Result<String, AuthError> {
        let mut first_name = input.first_name.trim().to_string();
        if first_name.is_empty() {
            first_name = input.name.trim().to_string();
        }
        let phone = input.phone.trim().to_string();
        let location = match input.location {
            Some(l) => l,
            None => return Err(AuthError::InvalidRegisterInput),
        };
        if input.telegram_id == 0 || first_name.is_empty() || phone.is_empty() {
            return Err(AuthError::InvalidRegisterInput);
        }

        let user = self
            .users
            .upsert_telegram_user(TelegramProfile {
                telegram_id: input.telegram_id,
                first_name,
                last_name: input.last_name.trim().to_string(),
                username: String::new(),
                phone,
                language: String::new(),
                latitude: Some(location.latitude),
                longitude: Some(location.longitude),
            })
            .await?;

        tracing::info!(user_id = user.id, "bot user registered");
        Ok(self.tokens.issue_user(user.id, user.telegram_id)?)
    }
}

/// Parses and authenticates a Telegram initData query string, returning its
/// fields (first value wins for repeated keys).
pub fn verify_init_data(
    raw: &str,
    bot_token: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<BTreeMap<String, String>, AuthError> {
    if raw.trim().is_empty() {
        return Err(AuthError::InvalidInitData);
    }

    let mut fields = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        if key.is_empty() {
            return Err(AuthError::InvalidInitData);
        }
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }

    let hash = fields.get("hash").ok_or(AuthError::InvalidInitData)?;
    let auth_date = fields
        .get("auth_date")
        .ok_or(AuthError::InvalidInitData)?
        .parse::<i64>()
        .map_err(|_| AuthError::InvalidInitData)?;
    if now.timestamp() - auth_date > ttl.num_seconds() {
        return Err(AuthError::ExpiredInitData);
    }

    let provided = hex::decode(hash).map_err(|_| AuthError::InvalidInitData)?;
    let mut mac = signer(bot_token)?;
    mac.update(data_check_string(&fields).as_bytes());
    mac.verify_slice(&provided)
        .map_err(|_| AuthError::InvalidInitData)?;

    Ok(fields)
}

/// `key=value` lines of every field except `hash`, sorted as whole lines.
fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    let mut lines: Vec<String> = fields
        .iter()
        .filter(|(k, _)| k.as_str() != "hash")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    lines.sort();
    lines.join("\n")
}

fn signer(bot_token: &str) -> Result<HmacSha256, AuthError> {
    let secret = Sha256::digest(bot_token.as_bytes());
    HmacSha256::new_from_slice(&secret).map_err(|_| AuthError::InvalidInitData)
}

/// The hex `hash` Telegram attaches to `fields` for this bot token.
pub fn sign_fields(fields: &BTreeMap<String, String>, bot_token: &str) -> Result<String, AuthError> {
    let mut mac = signer(bot_token)?;
    mac.update(data_check_string(fields).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
