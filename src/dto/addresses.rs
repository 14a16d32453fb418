use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::Address, repository::AddressInput};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddressRequest {
    pub region_id: i64,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub house: String,
    pub entrance: Option<String>,
    pub flat: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl From<AddressRequest> for AddressInput {
    fn from(req: AddressRequest) -> Self {
        AddressInput {
            region_id: req.region_id,
            street: req.street,
            house: req.house,
            entrance: req.entrance,
            flat: req.flat,
            comment: req.comment,
            is_default: req.is_default,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressList {
    pub items: Vec<Address>,
}
