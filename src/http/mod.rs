//! # HTTP Module
//!
//! JSON-over-HTTP surface for the reminder service.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Reminders, status and health routes with permissive CORS

pub mod routes;

pub use routes::{router, HealthReport};

use crate::features::reminders::ReminderService;
use anyhow::{Context, Result};
use log::info;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bind `addr` and serve until `shutdown` resolves
pub async fn serve<S>(addr: &str, service: Arc<ReminderService>, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve_on(listener, service, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve_on<S>(
    listener: TcpListener,
    service: Arc<ReminderService>,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let local: SocketAddr = listener.local_addr()?;
    info!("Server address: http://{local}");
    info!("API endpoint:   http://{local}/api/reminders");
    info!("Health check:   http://{local}/health");
    info!("Status check:   http://{local}/status");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
    Ok(())
}
