//! Sputnik - a multi-tenant IRC bouncer

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sputnik::error::Result;
use sputnik::{Bouncer, Config};

fn main() -> Result<()> {
    let config = Config::discover()?;

    // Initialize logging
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .or_else(|| config.log.level.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Sputnik v{} starting...", env!("CARGO_PKG_VERSION"));

    // One event loop on one thread
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(async {
        let bouncer = Bouncer::from_config(config).await?;
        bouncer.start().await
    })?;

    info!("Goodbye!");
    Ok(())
}
