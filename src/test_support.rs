//! In-memory adapters for tests: repositories, cache, notifier and clock.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::{
    cache::{Cache, CacheError},
    config::AppConfig,
    models::{
        Address, AdminUser, Category, Order, OrderItem, OrderStatus, Product, Region, User,
    },
    notifications::{Notifier, NotifyError},
    repository::{
        AddressInput, AddressRepository, AdminUserRepository, CategoryInput, InsertOutcome,
        MenuRepository, NewOrder, OrderFilter, OrderRepository, ProductInput, RegionInput,
        RegionRepository, TelegramProfile, UserRepository,
    },
    state::{AppState, Ports},
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    admins: Vec<AdminUser>,
    regions: Vec<Region>,
    categories: Vec<Category>,
    products: Vec<Product>,
    addresses: Vec<Address>,
    orders: Vec<Order>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// One shared in-memory database implementing every repository port.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    fail_reads: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every subsequent read fail with a storage error.
    pub fn fail_reads(&self, fail: bool) {
        *lock(&self.fail_reads) = fail;
    }

    fn check_reads(&self) -> Result<(), DbErr> {
        if *lock(&self.fail_reads) {
            return Err(DbErr::Custom("injected read failure".into()));
        }
        Ok(())
    }

    pub fn add_region(&self, name: &str, delivery_price: Decimal, is_active: bool) -> Region {
        let mut t = lock(&self.tables);
        let region = Region {
            id: t.id(),
            name: name.to_string(),
            delivery_price,
            is_active,
        };
        t.regions.push(region.clone());
        region
    }

    pub fn add_category(&self, name: &str, sort_order: i32, is_active: bool) -> Category {
        let mut t = lock(&self.tables);
        let category = Category {
            id: t.id(),
            name: name.to_string(),
            emoji: String::new(),
            sort_order,
            is_active,
        };
        t.categories.push(category.clone());
        category
    }

    pub fn add_product(
        &self,
        category_id: i64,
        name: &str,
        price: Decimal,
        is_active: bool,
    ) -> Product {
        let mut t = lock(&self.tables);
        let product = Product {
            id: t.id(),
            category_id,
            name: name.to_string(),
            description: String::new(),
            price,
            old_price: None,
            image_url: String::new(),
            is_active,
            sort_order: 0,
        };
        t.products.push(product.clone());
        product
    }

    pub fn add_user(&self, telegram_id: i64, first_name: &str) -> User {
        let mut t = lock(&self.tables);
        let user = User {
            id: t.id(),
            telegram_id,
            first_name: first_name.to_string(),
            last_name: String::new(),
            username: String::new(),
            phone: String::new(),
            language: String::new(),
            latitude: None,
            longitude: None,
            created_at: Utc::now(),
        };
        t.users.push(user.clone());
        user
    }

    pub fn set_product_price(&self, product_id: i64, price: Decimal) {
        let mut t = lock(&self.tables);
        if let Some(p) = t.products.iter_mut().find(|p| p.id == product_id) {
            p.price = price;
        }
    }

    pub fn order_count(&self) -> usize {
        lock(&self.tables).orders.len()
    }

    pub fn address_snapshot(&self, user_id: i64) -> Vec<Address> {
        lock(&self.tables)
            .addresses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn ports(
        self: &Arc<Self>,
        cache: Arc<dyn Cache>,
        notifier: Arc<dyn Notifier>,
    ) -> Ports {
        Ports {
            users: self.clone(),
            admins: self.clone(),
            regions: self.clone(),
            menu: self.clone(),
            addresses: self.clone(),
            orders: self.clone(),
            cache,
            notifier,
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn upsert_telegram_user(&self, profile: TelegramProfile) -> Result<User, DbErr> {
        let mut t = lock(&self.tables);
        if let Some(user) = t
            .users
            .iter_mut()
            .find(|u| u.telegram_id == profile.telegram_id)
        {
            user.first_name = profile.first_name;
            user.last_name = profile.last_name;
            user.username = profile.username;
            user.language = profile.language;
            if !profile.phone.is_empty() {
                user.phone = profile.phone;
            }
            if profile.latitude.is_some() {
                user.latitude = profile.latitude;
            }
            if profile.longitude.is_some() {
                user.longitude = profile.longitude;
            }
            return Ok(user.clone());
        }
        let user = User {
            id: t.id(),
            telegram_id: profile.telegram_id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            username: profile.username,
            phone: profile.phone,
            language: profile.language,
            latitude: profile.latitude,
            longitude: profile.longitude,
            created_at: Utc::now(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DbErr> {
        self.check_reads()?;
        Ok(lock(&self.tables).users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl AdminUserRepository for InMemoryStore {
    async fn ensure_user(&self, username: &str, password_hash: &str) -> Result<bool, DbErr> {
        let mut t = lock(&self.tables);
        if t.admins.iter().any(|a| a.username == username) {
            return Ok(false);
        }
        let admin = AdminUser {
            id: t.id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        t.admins.push(admin);
        Ok(true)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, DbErr> {
        Ok(lock(&self.tables)
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }
}

#[async_trait]
impl RegionRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Region>, DbErr> {
        self.check_reads()?;
        Ok(lock(&self.tables).regions.iter().find(|r| r.id == id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Region>, DbErr> {
        self.check_reads()?;
        let mut regions: Vec<Region> = lock(&self.tables)
            .regions
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        regions.sort_by_key(|r| r.id);
        Ok(regions)
    }

    async fn create(&self, input: RegionInput) -> Result<Region, DbErr> {
        Ok(self.add_region(&input.name, input.delivery_price, input.is_active))
    }

    async fn update(&self, id: i64, input: RegionInput) -> Result<Option<Region>, DbErr> {
        let mut t = lock(&self.tables);
        Ok(t.regions.iter_mut().find(|r| r.id == id).map(|r| {
            r.name = input.name;
            r.delivery_price = input.delivery_price;
            r.is_active = input.is_active;
            r.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, DbErr> {
        let mut t = lock(&self.tables);
        let before = t.regions.len();
        t.regions.retain(|r| r.id != id);
        Ok(t.regions.len() != before)
    }
}

#[async_trait]
impl MenuRepository for InMemoryStore {
    async fn list_active_categories(&self) -> Result<Vec<Category>, DbErr> {
        self.check_reads()?;
        let mut categories: Vec<Category> = lock(&self.tables)
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by_key(|c| (c.sort_order, c.id));
        Ok(categories)
    }

    async fn list_active_products(&self) -> Result<Vec<Product>, DbErr> {
        self.check_reads()?;
        let mut products: Vec<Product> = lock(&self.tables)
            .products
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        products.sort_by_key(|p| (p.sort_order, p.id));
        Ok(products)
    }

    async fn find_active_products(&self, ids: &[i64]) -> Result<HashMap<i64, Product>, DbErr> {
        self.check_reads()?;
        Ok(lock(&self.tables)
            .products
            .iter()
            .filter(|p| p.is_active && ids.contains(&p.id))
            .map(|p| (p.id, p.clone()))
            .collect())
    }

    async fn create_category(&self, input: CategoryInput) -> Result<Category, DbErr> {
        let mut t = lock(&self.tables);
        let category = Category {
            id: t.id(),
            name: input.name,
            emoji: input.emoji,
            sort_order: input.sort_order,
            is_active: input.is_active,
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i64,
        input: CategoryInput,
    ) -> Result<Option<Category>, DbErr> {
        let mut t = lock(&self.tables);
        Ok(t.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = input.name;
            c.emoji = input.emoji;
            c.sort_order = input.sort_order;
            c.is_active = input.is_active;
            c.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, DbErr> {
        let mut t = lock(&self.tables);
        let before = t.categories.len();
        t.categories.retain(|c| c.id != id);
        t.products.retain(|p| p.category_id != id);
        Ok(t.categories.len() != before)
    }

    async fn create_product(&self, input: ProductInput) -> Result<Product, DbErr> {
        let mut t = lock(&self.tables);
        let product = Product {
            id: t.id(),
            category_id: input.category_id,
            name: input.name,
            description: input.description,
            price: input.price,
            old_price: input.old_price,
            image_url: input.image_url,
            is_active: input.is_active,
            sort_order: input.sort_order,
        };
        t.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, input: ProductInput) -> Result<Option<Product>, DbErr> {
        let mut t = lock(&self.tables);
        Ok(t.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.category_id = input.category_id;
            p.name = input.name;
            p.description = input.description;
            p.price = input.price;
            p.old_price = input.old_price;
            p.image_url = input.image_url;
            p.is_active = input.is_active;
            p.sort_order = input.sort_order;
            p.clone()
        }))
    }

    async fn delete_product(&self, id: i64) -> Result<bool, DbErr> {
        let mut t = lock(&self.tables);
        let before = t.products.len();
        t.products.retain(|p| p.id != id);
        Ok(t.products.len() != before)
    }
}

fn clear_default(t: &mut Tables, user_id: i64) {
    for a in t.addresses.iter_mut().filter(|a| a.user_id == user_id) {
        a.is_default = false;
    }
}

#[async_trait]
impl AddressRepository for InMemoryStore {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Address>, DbErr> {
        self.check_reads()?;
        let mut addresses = self.address_snapshot(user_id);
        addresses.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(addresses)
    }

    async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Address>, DbErr> {
        self.check_reads()?;
        Ok(lock(&self.tables)
            .addresses
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn create(&self, user_id: i64, input: AddressInput) -> Result<Address, DbErr> {
        let mut t = lock(&self.tables);
        if input.is_default {
            clear_default(&mut t, user_id);
        }
        let address = Address {
            id: t.id(),
            user_id,
            region_id: input.region_id,
            street: input.street,
            house: input.house,
            entrance: input.entrance,
            flat: input.flat,
            comment: input.comment,
            is_default: input.is_default,
            created_at: Utc::now(),
        };
        t.addresses.push(address.clone());
        Ok(address)
    }

    async fn update(
        &self,
        id: i64,
        user_id: i64,
        input: AddressInput,
    ) -> Result<Option<Address>, DbErr> {
        let mut t = lock(&self.tables);
        if !t.addresses.iter().any(|a| a.id == id && a.user_id == user_id) {
            return Ok(None);
        }
        if input.is_default {
            clear_default(&mut t, user_id);
        }
        Ok(t.addresses.iter_mut().find(|a| a.id == id).map(|a| {
            a.region_id = input.region_id;
            a.street = input.street;
            a.house = input.house;
            a.entrance = input.entrance;
            a.flat = input.flat;
            a.comment = input.comment;
            a.is_default = input.is_default;
            a.clone()
        }))
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, DbErr> {
        let mut t = lock(&self.tables);
        let before = t.addresses.len();
        t.addresses.retain(|a| !(a.id == id && a.user_id == user_id));
        Ok(t.addresses.len() != before)
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert(&self, order: NewOrder) -> Result<InsertOutcome, DbErr> {
        let mut t = lock(&self.tables);
        if t
            .orders
            .iter()
            .any(|o| o.client_request_id == order.client_request_id)
        {
            return Ok(InsertOutcome::DuplicateKey);
        }
        let id = t.id();
        let now = Utc::now();
        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            items.push(OrderItem {
                id: t.id(),
                order_id: id,
                product_id: item.product_id,
                product_name: item.product_name,
                qty: item.qty,
                price: item.price,
                total: item.total,
            });
        }
        let stored = Order {
            id,
            client_request_id: order.client_request_id,
            user_id: order.user_id,
            address_id: order.address_id,
            order_type: order.order_type,
            payment_method: order.payment_method,
            status: OrderStatus::New,
            region_id: order.region_id,
            delivery_price: order.delivery_price,
            items_total: order.items_total,
            total_price: order.total_price,
            comment: order.comment,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            created_at: now,
            updated_at: now,
            items,
        };
        t.orders.push(stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    async fn find_by_client_request_id(&self, key: Uuid) -> Result<Option<Order>, DbErr> {
        self.check_reads()?;
        Ok(lock(&self.tables)
            .orders
            .iter()
            .find(|o| o.client_request_id == key)
            .cloned())
    }

    async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Order>, DbErr> {
        self.check_reads()?;
        Ok(lock(&self.tables)
            .orders
            .iter()
            .find(|o| o.id == id && o.user_id == user_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: i64, limit: u64) -> Result<Vec<Order>, DbErr> {
        self.check_reads()?;
        let mut orders: Vec<Order> = lock(&self.tables)
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        orders.truncate(limit as usize);
        Ok(orders)
    }

    async fn list_admin(&self, filter: OrderFilter) -> Result<Vec<Order>, DbErr> {
        self.check_reads()?;
        let mut orders: Vec<Order> = lock(&self.tables)
            .orders
            .iter()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.from.is_none_or(|from| o.created_at >= from))
            .filter(|o| filter.to.is_none_or(|to| o.created_at <= to))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn update_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>, DbErr> {
        let mut t = lock(&self.tables);
        Ok(t.orders.iter_mut().find(|o| o.id == id).map(|o| {
            o.status = status;
            o.updated_at = Utc::now();
            o.clone()
        }))
    }
}

/// Cache backed by a map; TTLs are recorded but never expire entries.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Duration)>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn ttl(&self, key: &str) -> Option<Duration> {
        lock(&self.entries).get(key).map(|(_, ttl)| *ttl)
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), (value.to_string(), Duration::ZERO));
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(lock(&self.entries).get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        lock(&self.entries).insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Created { order_id: i64, chat_id: i64 },
    StatusChanged { order_id: i64, chat_id: i64, status: OrderStatus },
}

/// Records notifications; optionally fails every send after recording it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        lock(&self.sent).clone()
    }

    fn outcome(&self) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Rejected(502));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_created(&self, order: &Order, user_chat_id: i64) -> Result<(), NotifyError> {
        lock(&self.sent).push(Sent::Created {
            order_id: order.id,
            chat_id: user_chat_id,
        });
        self.outcome()
    }

    async fn order_status_changed(
        &self,
        order: &Order,
        user_chat_id: i64,
    ) -> Result<(), NotifyError> {
        lock(&self.sent).push(Sent::StatusChanged {
            order_id: order.id,
            chat_id: user_chat_id,
            status: order.status,
        });
        self.outcome()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = lock(&self.0);
        *now += by;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

pub const TEST_BOT_TOKEN: &str = "123456:TEST-bot-token";
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        app_env: "test".to_string(),
        redis_url: None,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiration_secs: 3600,
        admin_jwt_expiration_secs: 3600,
        telegram_bot_token: TEST_BOT_TOKEN.to_string(),
        telegram_admin_chat_id: None,
        init_data_ttl_secs: 3600,
        menu_cache_ttl_secs: 30,
        regions_cache_ttl_secs: 30,
        admin_default_username: "admin".to_string(),
        admin_default_password: "admin".to_string(),
        rate_user_limit: 1000,
        rate_admin_limit: 1000,
        rate_window_secs: 60,
        cors_origins: Vec::new(),
        bot_register_secret: None,
        request_timeout_secs: 30,
    }
}

/// State wired to `store` with the system clock.
pub fn test_state(
    store: &Arc<InMemoryStore>,
    cache: Arc<dyn Cache>,
    notifier: Arc<dyn Notifier>,
) -> AppState {
    test_state_with(test_config(), store, cache, notifier)
}

pub fn test_state_with(
    config: AppConfig,
    store: &Arc<InMemoryStore>,
    cache: Arc<dyn Cache>,
    notifier: Arc<dyn Notifier>,
) -> AppState {
    AppState::build(
        config,
        store.ports(cache, notifier),
        Arc::new(mockable::DefaultClock),
    )
    .expect("metrics registry")
}
