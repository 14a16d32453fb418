use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub phone: String,
    pub language: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub delivery_price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub emoji: String,
    pub sort_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub image_url: String,
    pub is_active: bool,
    pub sort_order: i32,
}

/// A category as it appears in the public menu, with its active products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MenuCategory {
    pub id: i64,
    pub name: String,
    pub emoji: String,
    pub sort_order: i32,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub region_id: i64,
    pub street: String,
    pub house: String,
    pub entrance: Option<String>,
    pub flat: Option<String>,
    pub comment: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub client_request_id: Uuid,
    pub user_id: i64,
    pub address_id: Option<i64>,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub payment_method: String,
    pub status: OrderStatus,
    pub region_id: i64,
    pub delivery_price: Decimal,
    pub items_total: Decimal,
    pub total_price: Decimal,
    pub comment: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub qty: i32,
    pub price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Delivery,
    Pickup,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Delivery => "delivery",
            OrderType::Pickup => "pickup",
        }
    }
}

impl FromStr for OrderType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(OrderType::Delivery),
            "pickup" => Ok(OrderType::Pickup),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Accepted,
    Cooking,
    Delivery,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Cooking => "cooking",
            OrderStatus::Delivery => "delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(OrderStatus::New),
            "accepted" => Ok(OrderStatus::Accepted),
            "cooking" => Ok(OrderStatus::Cooking),
            "delivery" => Ok(OrderStatus::Delivery),
            "delivered" => Ok(OrderStatus::Delivered),
            "canceled" => Ok(OrderStatus::Canceled),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value {:?}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("new", OrderStatus::New)]
    #[case("ACCEPTED", OrderStatus::Accepted)]
    #[case(" Cooking ", OrderStatus::Cooking)]
    #[case("delivery", OrderStatus::Delivery)]
    #[case("Delivered", OrderStatus::Delivered)]
    #[case("canceled", OrderStatus::Canceled)]
    fn status_parses_case_insensitively(#[case] raw: &str, #[case] expected: OrderStatus) {
        assert_eq!(raw.parse::<OrderStatus>(), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("cancelled")]
    #[case("done")]
    fn unknown_status_is_rejected(#[case] raw: &str) {
        assert!(raw.parse::<OrderStatus>().is_err());
    }

    #[rstest]
    #[case("Delivery", OrderType::Delivery)]
    #[case("PICKUP", OrderType::Pickup)]
    fn order_type_parses_case_insensitively(#[case] raw: &str, #[case] expected: OrderType) {
        assert_eq!(raw.parse::<OrderType>(), Ok(expected));
    }

    #[test]
    fn order_type_serializes_lowercase() {
        let json = serde_json::to_string(&OrderType::Pickup).unwrap();
        assert_eq!(json, "\"pickup\"");
    }
}
