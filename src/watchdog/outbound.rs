//! Outbound health-check watchdog
//!
//! Periodically GETs the companion process's health endpoint. A successful
//! check doubles as the liveness ping the companion watches for, so one
//! request drives both directions of the dead-man's switch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;

use super::WatchdogEvent;
use crate::alerts::Notifier;
use crate::errors::ErrorTrigger;

const OUTAGE_ALERT: &str = "@everyone **CRITICAL ALERT** -> the remote health-check service is \
     unreachable, so a local power or network loss would go unreported! Check the heartbeat \
     receiver's health. This alert can be disabled in the configuration.";

const RECOVERY_MESSAGE: &str =
    "End of alert, the remote health-check service is reachable again";

/// Counter-based hysteresis state for the outbound direction.
///
/// A single failed check never alerts; only `error_threshold` consecutive
/// failures escalate, and exactly one alert/recovery pair is produced per
/// outage.
#[derive(Debug, Default)]
pub struct OutboundState {
    consecutive_failures: u32,
    in_alert: bool,
}

impl OutboundState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(&mut self) -> Option<WatchdogEvent> {
        let event = self.in_alert.then_some(WatchdogEvent::Recover);
        self.in_alert = false;
        self.consecutive_failures = 0;
        event
    }

    pub fn on_failure(&mut self, error_threshold: u32) -> Option<WatchdogEvent> {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= error_threshold && !self.in_alert {
            self.in_alert = true;
            return Some(WatchdogEvent::RaiseAlert);
        }
        None
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn in_alert(&self) -> bool {
        self.in_alert
    }
}

/// Background loop driving [`OutboundState`] with real health checks
pub struct OutboundWatchdog {
    health_url: String,
    check_interval: Duration,
    error_threshold: u32,
    notifier: Arc<Notifier>,
    errors: Arc<ErrorTrigger>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl OutboundWatchdog {
    pub fn new(
        health_url: String,
        check_interval: Duration,
        error_threshold: u32,
        notifier: Arc<Notifier>,
        errors: Arc<ErrorTrigger>,
    ) -> Self {
        Self {
            health_url,
            check_interval,
            error_threshold,
            notifier,
            errors,
            shutdown_tx: None,
        }
    }

    /// Start the background loop. The first check runs immediately; the
    /// interval applies after each attempt.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let client = reqwest::Client::new();
        let health_url = self.health_url.clone();
        let check_interval = self.check_interval;
        let error_threshold = self.error_threshold;
        let notifier = Arc::clone(&self.notifier);
        let errors = Arc::clone(&self.errors);

        tokio::spawn(async move {
            tracing::info!(
                url = %health_url,
                "Outbound watchdog started with interval {:?}",
                check_interval
            );

            let mut state = OutboundState::new();
            let mut ticker = interval(check_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        check_once(
                            &client,
                            &health_url,
                            check_interval,
                            error_threshold,
                            &mut state,
                            &notifier,
                            &errors,
                        )
                        .await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Outbound watchdog shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

async fn check_once(
    client: &reqwest::Client,
    health_url: &str,
    check_interval: Duration,
    error_threshold: u32,
    state: &mut OutboundState,
    notifier: &Notifier,
    errors: &ErrorTrigger,
) {
    let outcome = match client
        .get(health_url)
        .timeout(check_interval)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => Err(format!("health check returned status {}", response.status())),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(()) => {
            if state.on_success() == Some(WatchdogEvent::Recover) {
                notifier.send(RECOVERY_MESSAGE).await;
            }
        }
        Err(reason) => match state.on_failure(error_threshold) {
            Some(WatchdogEvent::RaiseAlert) => {
                notifier.send(OUTAGE_ALERT).await;
                errors.report(&reason, OUTAGE_ALERT);
            }
            _ if state.in_alert() => {
                errors.report(&reason, OUTAGE_ALERT);
            }
            _ => {
                tracing::warn!(
                    failures = state.consecutive_failures(),
                    threshold = error_threshold,
                    "Health check failed: {}",
                    reason
                );
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_fires_exactly_at_threshold() {
        let mut state = OutboundState::new();

        for i in 1..=11 {
            assert_eq!(state.on_failure(12), None, "no alert at failure {}", i);
            assert!(!state.in_alert());
        }

        assert_eq!(state.on_failure(12), Some(WatchdogEvent::RaiseAlert));
        assert!(state.in_alert());
        assert_eq!(state.consecutive_failures(), 12);

        // Further failures do not re-alert
        assert_eq!(state.on_failure(12), None);
        assert!(state.in_alert());
    }

    #[test]
    fn test_recovery_sent_exactly_once() {
        let mut state = OutboundState::new();
        for _ in 0..12 {
            state.on_failure(12);
        }
        assert!(state.in_alert());

        assert_eq!(state.on_success(), Some(WatchdogEvent::Recover));
        assert!(!state.in_alert());
        assert_eq!(state.consecutive_failures(), 0);

        assert_eq!(state.on_success(), None);
    }

    #[test]
    fn test_success_resets_counter_before_threshold() {
        let mut state = OutboundState::new();
        for _ in 0..11 {
            state.on_failure(12);
        }
        assert_eq!(state.on_success(), None);
        assert_eq!(state.consecutive_failures(), 0);

        // A fresh outage has to accumulate the full threshold again
        for _ in 0..11 {
            assert_eq!(state.on_failure(12), None);
        }
        assert_eq!(state.on_failure(12), Some(WatchdogEvent::RaiseAlert));
    }

    #[tokio::test]
    async fn test_check_against_unreachable_endpoint_counts_a_failure() {
        let errors = Arc::new(ErrorTrigger::new(true, 30));
        let notifier = Notifier::capture(Arc::clone(&errors));
        let client = reqwest::Client::new();
        let mut state = OutboundState::new();

        check_once(
            &client,
            "http://127.0.0.1:1/health",
            Duration::from_secs(1),
            2,
            &mut state,
            &notifier,
            &errors,
        )
        .await;
        assert_eq!(state.consecutive_failures(), 1);
        assert!(notifier.sent().is_empty());

        check_once(
            &client,
            "http://127.0.0.1:1/health",
            Duration::from_secs(1),
            2,
            &mut state,
            &notifier,
            &errors,
        )
        .await;
        assert!(state.in_alert());
        assert_eq!(notifier.sent().len(), 1);
        assert!(errors.has_error());
    }
}
