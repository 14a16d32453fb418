use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Address, User};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: User,
    pub addresses: Vec<Address>,
}
