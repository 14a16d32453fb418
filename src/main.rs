use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kabob_food::{
    cache::{Cache, NoopCache, RedisCache},
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    notifications::{NoopNotifier, Notifier, TelegramNotifier},
    repository::{
        SeaAddressRepository, SeaAdminUserRepository, SeaMenuRepository, SeaOrderRepository,
        SeaRegionRepository, SeaUserRepository,
    },
    routes,
    state::{AppState, Ports},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kabob_food=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let cache: Arc<dyn Cache> = match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("menu cache backed by redis");
            Arc::new(RedisCache::connect(url).await?)
        }
        None => {
            tracing::warn!("REDIS_URL not set; menu cache disabled");
            Arc::new(NoopCache)
        }
    };

    let notifier: Arc<dyn Notifier> = if config.telegram_bot_token.is_empty() {
        Arc::new(NoopNotifier)
    } else {
        Arc::new(TelegramNotifier::new(
            &config.telegram_bot_token,
            config.telegram_admin_chat_id,
        )?)
    };

    let ports = Ports {
        users: Arc::new(SeaUserRepository::new(orm.clone())),
        admins: Arc::new(SeaAdminUserRepository::new(orm.clone())),
        regions: Arc::new(SeaRegionRepository::new(orm.clone())),
        menu: Arc::new(SeaMenuRepository::new(orm.clone())),
        addresses: Arc::new(SeaAddressRepository::new(orm.clone())),
        orders: Arc::new(SeaOrderRepository::new(orm)),
        cache,
        notifier,
    };

    let admin_username = config.admin_default_username.clone();
    let admin_password = config.admin_default_password.clone();
    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));

    let state = AppState::build(config, ports, Arc::new(mockable::DefaultClock))?;
    state
        .admin_auth
        .ensure_default_admin(&admin_username, &admin_password)
        .await?;

    let app = routes::app(state);

    tracing::info!("listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
