use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::repository::{CategoryInput, ProductInput, RegionInput};

fn active() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl From<CategoryRequest> for CategoryInput {
    fn from(req: CategoryRequest) -> Self {
        CategoryInput {
            name: req.name,
            emoji: req.emoji,
            sort_order: req.sort_order,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub category_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub old_price: Option<Decimal>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl From<ProductRequest> for ProductInput {
    fn from(req: ProductRequest) -> Self {
        ProductInput {
            category_id: req.category_id,
            name: req.name,
            description: req.description,
            price: req.price,
            old_price: req.old_price,
            image_url: req.image_url,
            is_active: req.is_active,
            sort_order: req.sort_order,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegionRequest {
    pub name: String,
    #[serde(default)]
    pub delivery_price: Decimal,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl From<RegionRequest> for RegionInput {
    fn from(req: RegionRequest) -> Self {
        RegionInput {
            name: req.name,
            delivery_price: req.delivery_price,
            is_active: req.is_active,
        }
    }
}
