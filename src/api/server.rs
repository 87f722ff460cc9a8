use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_check, heartbeat_ping, overview, probe_readings, submit, AppState,
};
use crate::alerts::{Notifier, ThresholdAlertLoop};
use crate::errors::ErrorTrigger;
use crate::store::ProbeStore;
use crate::telemetry::TelemetryIngestor;
use crate::watchdog::{HeartbeatCell, OutboundWatchdog};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Chat webhook URL; notifications are disabled when unset
    pub webhook_url: Option<String>,
    pub alerts_enabled: bool,
    pub alert_interval_minutes: u64,
    pub alert_frequency_hours: i64,
    /// Remote health-check URL; the outbound watchdog is disabled when unset
    pub watchdog_url: Option<String>,
    pub watchdog_enabled: bool,
    pub watchdog_interval_minutes: u64,
    pub watchdog_error_threshold: u32,
    pub error_clear_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            webhook_url: None,
            alerts_enabled: true,
            alert_interval_minutes: 10,
            alert_frequency_hours: 8,
            watchdog_url: None,
            watchdog_enabled: true,
            watchdog_interval_minutes: 5,
            watchdog_error_threshold: 12,
            error_clear_minutes: 30,
        }
    }
}

/// Build the monitoring server router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/submit", post(submit))
        .route("/api/overview", get(overview))
        .route("/api/probes/:id/readings", get(probe_readings))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Build the companion heartbeat-receiver router
pub fn build_heartbeat_router(cell: HeartbeatCell) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ping", get(heartbeat_ping))
        .layer(TraceLayer::new_for_http())
        .with_state(cell)
}

/// Run the monitoring server with its background loops
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let errors = Arc::new(ErrorTrigger::new(true, config.error_clear_minutes));
    let notifier = Arc::new(Notifier::new(config.webhook_url.clone(), Arc::clone(&errors)));
    let store = Arc::new(ProbeStore::new());

    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        ingestor: TelemetryIngestor::new(Arc::clone(&store), Arc::clone(&notifier)),
        errors: Arc::clone(&errors),
    });

    // Threshold alert loop
    let mut alert_loop = ThresholdAlertLoop::new(
        Arc::clone(&store),
        Arc::clone(&notifier),
        Arc::clone(&errors),
        Duration::from_secs(config.alert_interval_minutes * 60),
        config.alert_frequency_hours,
    );
    let alert_handle = if config.alerts_enabled {
        Some(alert_loop.start())
    } else {
        tracing::warn!("Threshold alert loop disabled by configuration");
        None
    };

    // Outbound watchdog
    let mut watchdog = None;
    let mut watchdog_handle = None;
    match (&config.watchdog_url, config.watchdog_enabled) {
        (Some(url), true) => {
            let mut dog = OutboundWatchdog::new(
                url.clone(),
                Duration::from_secs(config.watchdog_interval_minutes * 60),
                config.watchdog_error_threshold,
                Arc::clone(&notifier),
                Arc::clone(&errors),
            );
            watchdog_handle = Some(dog.start());
            watchdog = Some(dog);
        }
        _ => tracing::warn!("Outbound watchdog disabled by configuration"),
    }

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting thermwatch server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    alert_loop.stop().await;
    if let Some(mut dog) = watchdog {
        dog.stop().await;
    }
    if let Some(handle) = alert_handle {
        let _ = handle.await;
    }
    if let Some(handle) = watchdog_handle {
        let _ = handle.await;
    }

    tracing::info!("thermwatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, stopping workers...");
}
