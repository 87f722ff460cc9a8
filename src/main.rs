//! Thermwatch Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - THERMWATCH_HOST: Bind address (default: 0.0.0.0)
//! - THERMWATCH_PORT: Port number (default: 8080)
//! - THERMWATCH_WEBHOOK_URL: Chat webhook URL (unset = notifications disabled)
//! - THERMWATCH_ALERTS_ENABLED: Run the threshold alert loop (default: true)
//! - THERMWATCH_ALERT_INTERVAL_MINUTES: Delay between alert passes (default: 10)
//! - THERMWATCH_ALERT_FREQUENCY_HOURS: Per-probe dedup window (default: 8)
//! - THERMWATCH_WATCHDOG_URL: Remote health-check URL (unset = watchdog disabled)
//! - THERMWATCH_WATCHDOG_ENABLED: Run the outbound watchdog (default: true)
//! - THERMWATCH_WATCHDOG_INTERVAL_MINUTES: Delay between health checks (default: 5)
//! - THERMWATCH_WATCHDOG_ERROR_THRESHOLD: Consecutive failures before alerting (default: 12)
//! - THERMWATCH_ERROR_CLEAR_MINUTES: Dashboard error flag retention (default: 30)
//! - RUST_LOG: Log level (default: info)

use thermwatch::api::{run_server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thermwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = ServerConfig::default();
    let config = ServerConfig {
        host: env_var("THERMWATCH_HOST").unwrap_or(defaults.host),
        port: env_parse("THERMWATCH_PORT", defaults.port),
        webhook_url: env_var("THERMWATCH_WEBHOOK_URL"),
        alerts_enabled: env_parse("THERMWATCH_ALERTS_ENABLED", defaults.alerts_enabled),
        alert_interval_minutes: env_parse(
            "THERMWATCH_ALERT_INTERVAL_MINUTES",
            defaults.alert_interval_minutes,
        ),
        alert_frequency_hours: env_parse(
            "THERMWATCH_ALERT_FREQUENCY_HOURS",
            defaults.alert_frequency_hours,
        ),
        watchdog_url: env_var("THERMWATCH_WATCHDOG_URL"),
        watchdog_enabled: env_parse("THERMWATCH_WATCHDOG_ENABLED", defaults.watchdog_enabled),
        watchdog_interval_minutes: env_parse(
            "THERMWATCH_WATCHDOG_INTERVAL_MINUTES",
            defaults.watchdog_interval_minutes,
        ),
        watchdog_error_threshold: env_parse(
            "THERMWATCH_WATCHDOG_ERROR_THRESHOLD",
            defaults.watchdog_error_threshold,
        ),
        error_clear_minutes: env_parse(
            "THERMWATCH_ERROR_CLEAR_MINUTES",
            defaults.error_clear_minutes,
        ),
    };

    tracing::info!("Thermwatch configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Notifications: {}",
        if config.webhook_url.is_some() {
            "ENABLED"
        } else {
            "DISABLED (no webhook URL)"
        }
    );
    tracing::info!(
        "  Threshold alerts: enabled={}, every {} min, dedup window {} h",
        config.alerts_enabled,
        config.alert_interval_minutes,
        config.alert_frequency_hours
    );
    match &config.watchdog_url {
        Some(url) if config.watchdog_enabled => {
            tracing::info!(
                "  Outbound watchdog: {} every {} min, threshold {}",
                url,
                config.watchdog_interval_minutes,
                config.watchdog_error_threshold
            );
        }
        _ => tracing::info!("  Outbound watchdog: DISABLED"),
    }

    println!(
        r#"
  _   _                                      _       _
 | |_| |__   ___ _ __ _ __ _____      ____ _| |_ ___| |__
 | __| '_ \ / _ \ '__| '_ ` _ \ \ /\ / / _` | __/ __| '_ \
 | |_| | | |  __/ |  | | | | | \ V  V / (_| | || (__| | | |
  \__|_| |_|\___|_|  |_| |_| |_|\_/\_/ \__,_|\__\___|_| |_|

 Temperature Telemetry Monitor
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(config).await
}
