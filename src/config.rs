use std::{env, str::FromStr};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_env: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: i64,
    pub admin_jwt_expiration_secs: i64,
    pub telegram_bot_token: String,
    pub telegram_admin_chat_id: Option<i64>,
    pub init_data_ttl_secs: i64,
    pub menu_cache_ttl_secs: u64,
    pub regions_cache_ttl_secs: u64,
    pub admin_default_username: String,
    pub admin_default_password: String,
    pub rate_user_limit: u32,
    pub rate_admin_limit: u32,
    pub rate_window_secs: i64,
    pub cors_origins: Vec<String>,
    pub bot_register_secret: Option<String>,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let telegram_bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            database_url,
            host,
            port,
            app_env,
            redis_url: non_empty("REDIS_URL"),
            jwt_secret,
            jwt_expiration_secs: parse_or("JWT_EXPIRATION_SECS", 24 * 60 * 60),
            admin_jwt_expiration_secs: parse_or("ADMIN_JWT_EXPIRATION_SECS", 24 * 60 * 60),
            telegram_bot_token,
            telegram_admin_chat_id: non_empty("TELEGRAM_ADMIN_CHAT_ID")
                .and_then(|v| v.parse::<i64>().ok()),
            init_data_ttl_secs: parse_or("AUTH_TELEGRAM_INIT_TTL_SECS", 60 * 60),
            menu_cache_ttl_secs: parse_or("CACHE_MENU_TTL_SECS", 30),
            regions_cache_ttl_secs: parse_or("CACHE_REGIONS_TTL_SECS", 30),
            admin_default_username: env::var("ADMIN_DEFAULT_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_default_password: env::var("ADMIN_DEFAULT_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            rate_user_limit: parse_or("RATE_USER_LIMIT", 60),
            rate_admin_limit: parse_or("RATE_ADMIN_LIMIT", 120),
            rate_window_secs: parse_or("RATE_WINDOW_SECS", 60),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            bot_register_secret: non_empty("BOT_REGISTER_SECRET"),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

/// Settings for the companion bot binary.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_bot_token: String,
    pub backend_url: String,
    pub mini_app_url: String,
    pub bot_register_secret: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let telegram_bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is not set")?;
        let backend_url = env::var("BACKEND_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let mini_app_url = env::var("MINI_APP_URL").context("MINI_APP_URL is not set")?;
        Ok(Self {
            telegram_bot_token,
            backend_url,
            mini_app_url,
            bot_register_secret: non_empty("BOT_REGISTER_SECRET"),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_list;

    #[test]
    fn split_list_drops_blank_entries() {
        assert_eq!(
            split_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}
