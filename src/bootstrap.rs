use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{error, info, warn};

use crate::{
    catalog::CatalogRepository,
    config::Config,
    delivery::DeliveryExecutor,
    error::AppResult,
    ledger::PaymentRepository,
    matcher::Matcher,
    scheduler::FulfillmentScheduler,
    store::HttpRemoteStore,
    transport::BotApiTransport,
};

/// Wire every component with explicitly injected handles. No ambient
/// connection state: the pool is created here once and threaded through
/// constructors.
pub async fn initialize_scheduler(config: &Config) -> AppResult<FulfillmentScheduler> {
    info!("Initializing application components ...");

    let pool = initialize_database(&config.database_url).await?;

    let ledger = Arc::new(PaymentRepository::new(pool.clone()));
    let catalog = Arc::new(CatalogRepository::new(pool.clone()));

    let store = Arc::new(HttpRemoteStore::new(config.remote_store_url.clone()));
    info!("✅ Remote store client initialized");

    let transport = Arc::new(BotApiTransport::new(
        config.bot_api_url.clone(),
        &config.bot_token,
    ));
    info!("✅ Messaging transport initialized");

    if config.strategy.is_degraded() {
        warn!(
            requested = config.strategy.as_str(),
            effective = config.strategy.effective().as_str(),
            "strategy has no delivery-history ranking and falls back to 'recent'"
        );
    }
    if config.strategy.requires_hint() {
        warn!(
            strategy = config.strategy.as_str(),
            "payments carry no free-text hint, so this strategy records every item as unmatched"
        );
    }
    let matcher = Matcher::new(catalog.clone(), config.strategy);
    info!(strategy = config.strategy.as_str(), "✅ Matcher initialized");

    let executor = Arc::new(DeliveryExecutor::new(
        ledger.clone(),
        catalog.clone(),
        store,
        transport,
        config.operator_id,
    ));
    info!("✅ Delivery executor initialized");

    // Hourly janitor: expire payments that overstayed pending
    let janitor_ledger = ledger.clone();
    let expiry_hours = config.request_expiry_hours;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            match janitor_ledger.expire_overdue_pending(expiry_hours).await {
                Ok(count) => {
                    if count > 0 {
                        info!("🗑️  Expired {} overdue pending payments", count);
                    }
                }
                Err(e) => error!("Failed to expire pending payments: {:?}", e),
            }
        }
    });
    info!("✅ Payment expiry janitor started (hourly)");

    Ok(FulfillmentScheduler::new(
        config.scheduler(),
        ledger,
        matcher,
        executor,
    ))
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
