//! Minimal Telegram Bot API client for long polling and replies.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;

use crate::bot::Incoming;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram api error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<Sender>,
    pub text: Option<String>,
    pub contact: Option<Contact>,
    pub location: Option<Location>,
}

impl Message {
    pub fn sender_id(&self) -> i64 {
        self.from.as_ref().map(|f| f.id).unwrap_or(self.chat.id)
    }

    pub fn to_incoming(&self) -> Incoming {
        if let Some(contact) = &self.contact {
            // Only the sender's own contact counts.
            if contact.user_id.is_some_and(|id| id != self.sender_id()) {
                return Incoming::Other;
            }
            return Incoming::Contact {
                phone: contact.phone_number.clone(),
                first_name: contact.first_name.clone(),
                last_name: contact.last_name.clone(),
            };
        }
        if let Some(location) = &self.location {
            return Incoming::Location {
                latitude: location.latitude,
                longitude: location.longitude,
            };
        }
        match self.text.as_deref().map(str::trim) {
            Some(text) if text == "/start" || text.starts_with("/start ") => Incoming::Start,
            Some(text) => Incoming::Text(text.to_string()),
            None => Incoming::Other,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    base_url: String,
}

pub const POLL_TIMEOUT_SECS: u64 = 30;

impl TelegramApi {
    pub fn new(bot_token: &str) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, TelegramError> {
        let reply: ApiReply<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        match (reply.ok, reply.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api(
                reply
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            )),
        }
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<serde_json::Value>,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text,
                    reply_markup,
                },
            )
            .await?;
        Ok(())
    }
}

pub fn contact_keyboard() -> serde_json::Value {
    json!({
        "keyboard": [[{ "text": "Share phone number", "request_contact": true }]],
        "resize_keyboard": true,
        "one_time_keyboard": true,
    })
}

pub fn location_keyboard() -> serde_json::Value {
    json!({
        "keyboard": [[{ "text": "Share location", "request_location": true }]],
        "resize_keyboard": true,
        "one_time_keyboard": true,
    })
}

pub fn remove_keyboard() -> serde_json::Value {
    json!({ "remove_keyboard": true })
}

pub fn web_app_button(url: &str) -> serde_json::Value {
    json!({
        "inline_keyboard": [[{ "text": "Open menu", "web_app": { "url": url } }]],
    })
}
