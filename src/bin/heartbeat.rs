//! Heartbeat receiver (companion process)
//!
//! Deployed away from the monitored server. Exposes the ping endpoint that
//! server's outbound watchdog hits, and alerts through its own webhook when
//! the pings go stale.
//!
//! Run with: cargo run --bin heartbeat
//!
//! Environment variables:
//! - HEARTBEAT_HOST: Bind address (default: 0.0.0.0)
//! - HEARTBEAT_PORT: Port number (default: 8081)
//! - HEARTBEAT_WEBHOOK_URL: Chat webhook URL (unset = notifications disabled)
//! - HEARTBEAT_STALE_MINUTES: Silence tolerated before alerting (default: 60)
//! - HEARTBEAT_TICK_SECONDS: Staleness check interval (default: 60)
//! - HEARTBEAT_ERROR_CLEAR_MINUTES: Error flag retention (default: 30)
//! - RUST_LOG: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thermwatch::alerts::Notifier;
use thermwatch::api::build_heartbeat_router;
use thermwatch::errors::ErrorTrigger;
use thermwatch::watchdog::{HeartbeatCell, HeartbeatMonitor};

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thermwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env_var("HEARTBEAT_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port: u16 = env_parse("HEARTBEAT_PORT", 8081);
    let webhook_url = env_var("HEARTBEAT_WEBHOOK_URL");
    let stale_minutes: i64 = env_parse("HEARTBEAT_STALE_MINUTES", 60);
    let tick_seconds: u64 = env_parse("HEARTBEAT_TICK_SECONDS", 60);
    let error_clear_minutes: i64 = env_parse("HEARTBEAT_ERROR_CLEAR_MINUTES", 30);

    tracing::info!("Heartbeat receiver configuration:");
    tracing::info!("  Host: {}:{}", host, port);
    tracing::info!(
        "  Notifications: {}",
        if webhook_url.is_some() {
            "ENABLED"
        } else {
            "DISABLED (no webhook URL)"
        }
    );
    tracing::info!(
        "  Alert after {} min of silence, checked every {} s",
        stale_minutes,
        tick_seconds
    );

    let errors = Arc::new(ErrorTrigger::new(true, error_clear_minutes));
    let notifier = Arc::new(Notifier::new(webhook_url, errors));

    let cell = HeartbeatCell::new(Utc::now());
    let mut monitor = HeartbeatMonitor::new(
        cell.clone(),
        Duration::from_secs(tick_seconds),
        stale_minutes,
        notifier,
    );
    let monitor_handle = monitor.start();

    let app = build_heartbeat_router(cell);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting heartbeat receiver on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.stop().await;
    let _ = monitor_handle.await;

    tracing::info!("Heartbeat receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, stopping monitor...");
}
