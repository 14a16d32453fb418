use std::{sync::Arc, time::Duration};

use chrono::Duration as ChronoDuration;
use mockable::Clock;
use thiserror::Error;

use crate::{
    bot::{
        Incoming, Reply, Session, step,
        telegram::{
            TelegramApi, contact_keyboard, location_keyboard, remove_keyboard, web_app_button,
        },
    },
    config::BotConfig,
    dto::auth::{BotRegisterRequest, TokenResponse},
    keyed_state::{Entry, StateStore},
    response::ApiResponse,
    routes::auth::BOT_SECRET_HEADER,
};

pub const SESSION_IDLE_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend rejected registration: status {0}")]
    Rejected(u16),
    #[error("backend returned no token")]
    MissingToken,
}

/// Client for the backend's `/bot/register` endpoint.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, secret: Option<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
        })
    }

    pub async fn register(&self, request: &BotRegisterRequest) -> Result<String, BackendError> {
        let mut builder = self
            .client
            .post(format!("{}/bot/register", self.base_url))
            .json(request);
        if let Some(secret) = &self.secret {
            builder = builder.header(BOT_SECRET_HEADER, secret);
        }
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Rejected(response.status().as_u16()));
        }
        let body: ApiResponse<TokenResponse> = response.json().await?;
        body.data
            .map(|d| d.token)
            .ok_or(BackendError::MissingToken)
    }
}

pub struct BotRunner {
    api: TelegramApi,
    backend: BackendClient,
    sessions: Arc<dyn StateStore<Session>>,
    clock: Arc<dyn Clock>,
    mini_app_url: String,
}

impl BotRunner {
    pub fn new(
        config: &BotConfig,
        sessions: Arc<dyn StateStore<Session>>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            api: TelegramApi::new(&config.telegram_bot_token)?,
            backend: BackendClient::new(&config.backend_url, config.bot_register_secret.clone())?,
            sessions,
            clock,
            mini_app_url: config.mini_app_url.clone(),
        })
    }

    /// Long-polls until the future is dropped.
    pub async fn run(&self) {
        let mut offset = 0;
        loop {
            let updates = match self.api.get_updates(offset).await {
                Ok(u) => u,
                Err(err) => {
                    tracing::warn!(error = %err, "getUpdates failed");
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else {
                    continue;
                };
                let chat_id = message.chat.id;
                let telegram_id = message.sender_id();
                self.handle(chat_id, telegram_id, message.to_incoming())
                    .await;
            }
        }
    }

    pub async fn handle(&self, chat_id: i64, telegram_id: i64, incoming: Incoming) {
        let key = telegram_id.to_string();
        let now = self.clock.utc();
        let current = self.sessions.get(&key, now);
        let (next, reply) = step(telegram_id, current, incoming);
        self.save(&key, next);

        let result = match reply {
            Reply::AskContact => {
                self.api
                    .send_message(
                        chat_id,
                        "Welcome! Please share your phone number to continue.",
                        Some(contact_keyboard()),
                    )
                    .await
            }
            Reply::InvalidPhone => {
                self.api
                    .send_message(
                        chat_id,
                        "That does not look like a phone number. Share your contact or type the number.",
                        Some(contact_keyboard()),
                    )
                    .await
            }
            Reply::AskName => {
                self.api
                    .send_message(chat_id, "How should we call you?", Some(remove_keyboard()))
                    .await
            }
            Reply::AskLocation => {
                self.api
                    .send_message(
                        chat_id,
                        "Please share your location for delivery.",
                        Some(location_keyboard()),
                    )
                    .await
            }
            Reply::AskStart => {
                self.api
                    .send_message(chat_id, "Send /start to begin.", None)
                    .await
            }
            Reply::Register(request) => self.complete(chat_id, &key, request).await,
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, chat_id, "telegram reply failed");
        }
    }

    async fn complete(
        &self,
        chat_id: i64,
        key: &str,
        request: BotRegisterRequest,
    ) -> Result<(), crate::bot::telegram::TelegramError> {
        match self.backend.register(&request).await {
            Ok(token) => {
                let link = mini_app_link(&self.mini_app_url, &token);
                self.sessions.remove(key);
                tracing::info!(telegram_id = request.telegram_id, "bot registration completed");
                self.api
                    .send_message(
                        chat_id,
                        "All set! Tap the button to open the menu.",
                        Some(web_app_button(&link)),
                    )
                    .await
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    telegram_id = request.telegram_id,
                    "bot registration failed"
                );
                self.sessions.remove(key);
                self.api
                    .send_message(
                        chat_id,
                        "Registration failed. Please send /start to try again.",
                        Some(remove_keyboard()),
                    )
                    .await
            }
        }
    }

    fn save(&self, key: &str, session: Option<Session>) {
        let now = self.clock.utc();
        let expires_at = now + ChronoDuration::hours(SESSION_IDLE_HOURS);
        let mut session = session;
        self.sessions.modify(key, now, &mut |_| {
            session.take().map(|state| Entry { state, expires_at })
        });
    }
}

/// Appends the session token to the Mini-App URL as `token=`.
pub fn mini_app_link(base: &str, token: &str) -> String {
    match url::Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("token", token);
            url.to_string()
        }
        Err(_) => {
            let sep = if base.contains('?') { '&' } else { '?' };
            format!("{base}{sep}token={token}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_keeps_existing_query() {
        assert_eq!(
            mini_app_link("https://app.example/?lang=uz", "abc"),
            "https://app.example/?lang=uz&token=abc"
        );
        assert_eq!(
            mini_app_link("https://app.example/menu", "abc"),
            "https://app.example/menu?token=abc"
        );
    }
}
