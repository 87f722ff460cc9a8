//! Background threshold alert loop
//!
//! Scans all probes on a fixed interval and dispatches out-of-range and
//! probe-silent alerts, deduplicated per probe through `last_notified_at`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

use super::notifier::Notifier;
use crate::errors::ErrorTrigger;
use crate::store::{Probe, ProbeStore, StoreError};

/// Background threshold alert loop
pub struct ThresholdAlertLoop {
    store: Arc<ProbeStore>,
    notifier: Arc<Notifier>,
    errors: Arc<ErrorTrigger>,
    /// Delay between passes (also the grace period before the first pass)
    check_interval: Duration,
    /// Minimum time between two alerts for the same probe
    alert_frequency: chrono::Duration,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl ThresholdAlertLoop {
    pub fn new(
        store: Arc<ProbeStore>,
        notifier: Arc<Notifier>,
        errors: Arc<ErrorTrigger>,
        check_interval: Duration,
        alert_frequency_hours: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            errors,
            check_interval,
            alert_frequency: chrono::Duration::hours(alert_frequency_hours),
            shutdown_tx: None,
        }
    }

    /// Start the background loop. The first pass runs one full interval after
    /// startup so probes have time to report again after a restart.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let errors = Arc::clone(&self.errors);
        let check_interval = self.check_interval;
        let alert_frequency = self.alert_frequency;

        tokio::spawn(async move {
            tracing::info!(
                "Threshold alert loop started with interval {:?}",
                check_interval
            );

            let mut ticker = interval_at(Instant::now() + check_interval, check_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) =
                            run_pass(&store, &notifier, alert_frequency, Utc::now()).await
                        {
                            errors.report(e, "threshold alert pass failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Threshold alert loop shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the background loop
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

/// One pass over all probes. Takes `now` explicitly so tests can single-step
/// passes without waiting on the wall clock.
pub async fn run_pass(
    store: &ProbeStore,
    notifier: &Notifier,
    alert_frequency: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    for probe in store.list_probes() {
        // Look back twice the probe's cadence, but never less than 2 hours
        let lookback_secs = (probe.send_frequency_secs as i64 * 2).max(2 * 3600);
        let horizon = now - chrono::Duration::seconds(lookback_secs);
        let latest = store.latest_reading_since(probe.id, horizon)?;

        // One dedup window per probe, regardless of alert kind
        if let Some(notified_at) = probe.last_notified_at {
            if now - notified_at < alert_frequency {
                continue;
            }
        }

        match latest {
            Some(reading) if probe.is_out_of_bounds(reading.temperature) => {
                notifier
                    .send(&out_of_bounds_message(&probe, reading.temperature))
                    .await;
                store.update_last_notified(probe.id, now)?;
            }
            None => {
                notifier
                    .send(&format!(
                        "@everyone ALERT -> probe {} has stopped reporting temperatures, \
                         check its wiring and power supply",
                        probe.name
                    ))
                    .await;
                store.update_last_notified(probe.id, now)?;
            }
            Some(_) => {}
        }
    }

    Ok(())
}

fn out_of_bounds_message(probe: &Probe, temperature: f64) -> String {
    let direction = if probe.is_too_cold(temperature) {
        "cold"
    } else {
        "hot"
    };
    format!(
        "@everyone ALERT -> probe {} reported a temperature that is too {}: {} C \
         (bounds {} to {})",
        probe.name,
        direction,
        temperature,
        format_bound(probe.min_temperature),
        format_bound(probe.max_temperature),
    )
}

fn format_bound(bound: Option<f64>) -> String {
    match bound {
        Some(value) => value.to_string(),
        None => "unset".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewProbe, Reading};

    fn fixture() -> (Arc<ProbeStore>, Arc<Notifier>) {
        let errors = Arc::new(ErrorTrigger::new(true, 30));
        (
            Arc::new(ProbeStore::new()),
            Arc::new(Notifier::capture(errors)),
        )
    }

    fn add_probe(store: &ProbeStore, min: Option<f64>, max: Option<f64>) -> u64 {
        let (probe, _) = store.find_or_create(NewProbe {
            machine_name: "tank-1".to_string(),
            color: "#112233".to_string(),
            signal_strength: Some(-60),
            created_at: Utc::now() - chrono::Duration::days(1),
        });
        store.set_bounds(probe.id, min, max).unwrap();
        probe.id
    }

    fn add_reading(store: &ProbeStore, probe_id: u64, minutes_ago: i64, temperature: f64) {
        store
            .add_reading(Reading {
                probe_id,
                timestamp: Utc::now() - chrono::Duration::minutes(minutes_ago),
                temperature,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_out_of_range_alert_then_dedup() {
        let (store, notifier) = fixture();
        let probe_id = add_probe(&store, Some(18.0), Some(26.0));
        add_reading(&store, probe_id, 5, 27.5);

        let now = Utc::now();
        let frequency = chrono::Duration::hours(8);

        run_pass(&store, &notifier, frequency, now).await.unwrap();
        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].contains("too hot"));
        assert!(notifier.sent()[0].contains("27.5"));
        assert!(notifier.sent()[0].contains("18"));
        assert!(notifier.sent()[0].contains("26"));

        // Suppressed inside the dedup window
        run_pass(&store, &notifier, frequency, now + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);

        // Eligible again once the window has elapsed (the old reading is now
        // outside the lookback horizon, so this pass reports silence)
        run_pass(&store, &notifier, frequency, now + chrono::Duration::hours(9))
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_too_cold_direction() {
        let (store, notifier) = fixture();
        let probe_id = add_probe(&store, Some(18.0), Some(26.0));
        add_reading(&store, probe_id, 5, 12.0);

        run_pass(&store, &notifier, chrono::Duration::hours(8), Utc::now())
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].contains("too cold"));
    }

    #[tokio::test]
    async fn test_silent_probe_alerts_once_per_window() {
        let (store, notifier) = fixture();
        add_probe(&store, Some(18.0), Some(26.0));
        // No readings at all: probe went silent

        let now = Utc::now();
        let frequency = chrono::Duration::hours(8);

        run_pass(&store, &notifier, frequency, now).await.unwrap();
        run_pass(&store, &notifier, frequency, now + chrono::Duration::minutes(10))
            .await
            .unwrap();
        run_pass(&store, &notifier, frequency, now + chrono::Duration::minutes(20))
            .await
            .unwrap();

        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].contains("stopped reporting"));

        run_pass(&store, &notifier, frequency, now + chrono::Duration::hours(9))
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_in_range_reading_is_quiet() {
        let (store, notifier) = fixture();
        let probe_id = add_probe(&store, Some(18.0), Some(26.0));
        add_reading(&store, probe_id, 5, 22.0);

        run_pass(&store, &notifier, chrono::Duration::hours(8), Utc::now())
            .await
            .unwrap();
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unset_bounds_never_out_of_range() {
        let (store, notifier) = fixture();
        let probe_id = add_probe(&store, None, None);
        add_reading(&store, probe_id, 5, 95.0);

        run_pass(&store, &notifier, chrono::Duration::hours(8), Utc::now())
            .await
            .unwrap();
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_lookback_horizon_uses_probe_cadence() {
        let (store, notifier) = fixture();
        let probe_id = add_probe(&store, Some(18.0), Some(26.0));
        // In range, but 3 hours old: outside max(2 * 60s, 2h)
        add_reading(&store, probe_id, 180, 22.0);

        run_pass(&store, &notifier, chrono::Duration::hours(8), Utc::now())
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].contains("stopped reporting"));
    }
}
