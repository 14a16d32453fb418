use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kabob_food::{
    bot::{Session, runner::BotRunner},
    config::BotConfig,
    keyed_state::MemoryStateStore,
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

    let config = BotConfig::from_env()?;
    // Sessions are process-local and do not survive a restart.
    let runner = BotRunner::new(
        &config,
        Arc::new(MemoryStateStore::<Session>::new()),
        Arc::new(mockable::DefaultClock),
    )?;

    tracing::info!(backend = %config.backend_url, "bot polling started");
    tokio::select! {
        _ = runner.run() => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("bot shutting down");
        }
    }
    Ok(())
}
