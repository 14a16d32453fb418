use std::{sync::Arc, time::Duration};

use mockable::Clock;

use crate::{
    cache::Cache,
    config::AppConfig,
    keyed_state::MemoryStateStore,
    metrics::AppMetrics,
    middleware::rate_limit::{Bucket, RateLimiter},
    notifications::Notifier,
    repository::{
        AddressRepository, AdminUserRepository, MenuRepository, OrderRepository, RegionRepository,
        UserRepository,
    },
    services::{
        address_service::AddressService, admin_auth_service::AdminAuthService,
        auth_service::AuthService, catalog_admin_service::CatalogAdminService,
        menu_service::MenuService, order_service::OrderService, token_service::TokenService,
    },
};

/// Storage, cache and notification adapters the services are built from.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepository>,
    pub admins: Arc<dyn AdminUserRepository>,
    pub regions: Arc<dyn RegionRepository>,
    pub menu: Arc<dyn MenuRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub cache: Arc<dyn Cache>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: TokenService,
    pub auth: AuthService,
    pub admin_auth: AdminAuthService,
    pub orders: OrderService,
    pub menu: MenuService,
    pub catalog: CatalogAdminService,
    pub addresses: AddressService,
    pub metrics: AppMetrics,
    pub user_limiter: RateLimiter,
    pub admin_limiter: RateLimiter,
}

impl AppState {
    pub fn build(
        config: AppConfig,
        ports: Ports,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, prometheus::Error> {
        let metrics = AppMetrics::new()?;
        let tokens = TokenService::new(
            &config.jwt_secret,
            config.jwt_expiration_secs,
            config.admin_jwt_expiration_secs,
            clock.clone(),
        );

        let menu = MenuService::new(
            ports.menu.clone(),
            ports.regions.clone(),
            ports.cache.clone(),
            Duration::from_secs(config.menu_cache_ttl_secs),
            Duration::from_secs(config.regions_cache_ttl_secs),
        );
        let catalog =
            CatalogAdminService::new(ports.menu.clone(), ports.regions.clone(), menu.clone());
        let auth = AuthService::new(
            ports.users.clone(),
            tokens.clone(),
            config.telegram_bot_token.clone(),
            config.init_data_ttl_secs,
            clock.clone(),
        );
        let admin_auth = AdminAuthService::new(ports.admins.clone(), tokens.clone());
        let orders = OrderService::new(
            ports.orders.clone(),
            ports.regions.clone(),
            ports.menu.clone(),
            ports.addresses.clone(),
            ports.users.clone(),
            ports.notifier.clone(),
            metrics.clone(),
        );
        let addresses = AddressService::new(ports.addresses.clone());

        let window = chrono::Duration::seconds(config.rate_window_secs);
        let user_limiter = RateLimiter::new(
            Arc::new(MemoryStateStore::<Bucket>::new()),
            clock.clone(),
            config.rate_user_limit,
            window,
        );
        let admin_limiter = RateLimiter::new(
            Arc::new(MemoryStateStore::<Bucket>::new()),
            clock,
            config.rate_admin_limit,
            window,
        );

        Ok(Self {
            config: Arc::new(config),
            users: ports.users,
            tokens,
            auth,
            admin_auth,
            orders,
            menu,
            catalog,
            addresses,
            metrics,
            user_limiter,
            admin_limiter,
        })
    }
}
