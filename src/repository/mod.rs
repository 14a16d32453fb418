//! Storage ports used by the services.
//!
//! Each trait has a SeaORM-backed implementation in the sibling modules and an
//! in-memory implementation in `test_support` for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::models::{
    Address, AdminUser, Category, Order, OrderStatus, OrderType, Product, Region, User,
};

pub mod addresses;
pub mod admin_users;
pub mod menu;
pub mod orders;
pub mod regions;
pub mod users;

pub use addresses::SeaAddressRepository;
pub use admin_users::SeaAdminUserRepository;
pub use menu::SeaMenuRepository;
pub use orders::SeaOrderRepository;
pub use regions::SeaRegionRepository;
pub use users::SeaUserRepository;

/// Profile fields written on every Telegram login or bot registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelegramProfile {
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    /// Empty keeps the stored phone.
    pub phone: String,
    pub language: String,
    /// `None` keeps the stored coordinates.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn upsert_telegram_user(&self, profile: TelegramProfile) -> Result<User, DbErr>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DbErr>;
}

#[async_trait]
pub trait AdminUserRepository: Send + Sync {
    /// Inserts the admin unless the username is taken. Returns whether a row was written.
    async fn ensure_user(&self, username: &str, password_hash: &str) -> Result<bool, DbErr>;
    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, DbErr>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionInput {
    pub name: String,
    pub delivery_price: Decimal,
    pub is_active: bool,
}

#[async_trait]
pub trait RegionRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Region>, DbErr>;
    /// Active regions ordered by id.
    async fn list_active(&self) -> Result<Vec<Region>, DbErr>;
    async fn create(&self, input: RegionInput) -> Result<Region, DbErr>;
    async fn update(&self, id: i64, input: RegionInput) -> Result<Option<Region>, DbErr>;
    async fn delete(&self, id: i64) -> Result<bool, DbErr>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInput {
    pub name: String,
    pub emoji: String,
    pub sort_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub image_url: String,
    pub is_active: bool,
    pub sort_order: i32,
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Active categories ordered by (sort_order, id).
    async fn list_active_categories(&self) -> Result<Vec<Category>, DbErr>;
    /// Active products ordered by (sort_order, id).
    async fn list_active_products(&self) -> Result<Vec<Product>, DbErr>;
    /// Active products among `ids`, keyed by id. Inactive or unknown ids are absent.
    async fn find_active_products(&self, ids: &[i64]) -> Result<HashMap<i64, Product>, DbErr>;

    async fn create_category(&self, input: CategoryInput) -> Result<Category, DbErr>;
    async fn update_category(&self, id: i64, input: CategoryInput)
    -> Result<Option<Category>, DbErr>;
    async fn delete_category(&self, id: i64) -> Result<bool, DbErr>;

    async fn create_product(&self, input: ProductInput) -> Result<Product, DbErr>;
    async fn update_product(&self, id: i64, input: ProductInput) -> Result<Option<Product>, DbErr>;
    async fn delete_product(&self, id: i64) -> Result<bool, DbErr>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressInput {
    pub region_id: i64,
    pub street: String,
    pub house: String,
    pub entrance: Option<String>,
    pub flat: Option<String>,
    pub comment: Option<String>,
    pub is_default: bool,
}

/// Address storage. Writes with `is_default` clear the user's other defaults
/// in the same transaction.
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Default first, then newest.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Address>, DbErr>;
    async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Address>, DbErr>;
    async fn create(&self, user_id: i64, input: AddressInput) -> Result<Address, DbErr>;
    async fn update(
        &self,
        id: i64,
        user_id: i64,
        input: AddressInput,
    ) -> Result<Option<Address>, DbErr>;
    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, DbErr>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub qty: i32,
    pub price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub client_request_id: Uuid,
    pub user_id: i64,
    pub address_id: Option<i64>,
    pub order_type: OrderType,
    pub payment_method: String,
    pub region_id: i64,
    pub delivery_price: Decimal,
    pub items_total: Decimal,
    pub total_price: Decimal,
    pub comment: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Order),
    /// The `client_request_id` is already taken; nothing was written.
    DuplicateKey,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Writes the header and items atomically.
    async fn insert(&self, order: NewOrder) -> Result<InsertOutcome, DbErr>;
    async fn find_by_client_request_id(&self, key: Uuid) -> Result<Option<Order>, DbErr>;
    async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Order>, DbErr>;
    /// Newest first.
    async fn list_by_user(&self, user_id: i64, limit: u64) -> Result<Vec<Order>, DbErr>;
    /// Newest first.
    async fn list_admin(&self, filter: OrderFilter) -> Result<Vec<Order>, DbErr>;
    async fn update_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>, DbErr>;
}
