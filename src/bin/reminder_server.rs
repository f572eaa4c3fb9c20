use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use local_reminder::core::Config;
use local_reminder::features::notification::build_notifier;
use local_reminder::features::reminders::ReminderService;
use local_reminder::features::storage::open_store;
use local_reminder::http;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {e}");
        return;
    }
    info!("Shutdown requested, stopping server...");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting local reminder server...");
    info!(
        "Store: {:?}, notifier: {:?}, default delay: {} minute(s)",
        config.store_backend, config.notifier, config.default_delay_minutes
    );

    let store = open_store(&config);
    let notifier = build_notifier(config.notifier);
    let service = Arc::new(
        ReminderService::new(store, notifier).with_default_delay(config.default_delay_minutes),
    );

    info!("Press Ctrl+C to stop the server");
    let served = http::serve(&config.bind_addr, service.clone(), shutdown_signal()).await;

    // No notification should fire once we've been asked to stop
    service.cleanup();

    match served {
        Ok(()) => {
            info!("Server stopped");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {e:#}");
            Err(e)
        }
    }
}
