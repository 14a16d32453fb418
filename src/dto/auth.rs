use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::User, services::auth_service::{BotRegistration, Location}};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TelegramAuthRequest {
    pub init_data: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TelegramAuthResponse {
    pub token: String,
    pub profile: User,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BotRegisterRequest {
    pub telegram_id: i64,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<LocationPayload>,
}

impl From<BotRegisterRequest> for BotRegistration {
    fn from(req: BotRegisterRequest) -> Self {
        BotRegistration {
            telegram_id: req.telegram_id,
            phone: req.phone,
            first_name: req.first_name,
            last_name: req.last_name,
            name: req.name,
            location: req.location.map(|l| Location {
                latitude: l.latitude,
                longitude: l.longitude,
            }),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}
