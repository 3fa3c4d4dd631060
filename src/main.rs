use fulfillment_backend::{bootstrap, config::Config};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,fulfillment_backend=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting content fulfillment backend");

    let config = Config::from_env()?;
    let scheduler = bootstrap::initialize_scheduler(&config).await?;

    let ct = CancellationToken::new();
    let handle = scheduler.start(ct.clone());

    // the in-flight delivery finishes before the loop exits
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, stopping after the current item...");
    ct.cancel();
    handle.await?;

    info!("Shutdown complete");
    Ok(())
}
