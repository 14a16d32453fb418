use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{MenuCategory, Region};

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuResponse {
    pub categories: Vec<MenuCategory>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionList {
    pub regions: Vec<Region>,
}
