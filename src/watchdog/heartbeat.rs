//! Inbound heartbeat staleness monitor
//!
//! Runs in the companion process. The monitored server's successful health
//! checks land on the ping endpoint, which records the time into a shared
//! [`HeartbeatCell`]; this loop alerts when that timestamp goes stale.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::interval;

use super::WatchdogEvent;
use crate::alerts::Notifier;

/// Last-heartbeat timestamp shared between the ping endpoint (writer) and the
/// staleness loop (reader)
#[derive(Clone)]
pub struct HeartbeatCell(Arc<RwLock<DateTime<Utc>>>);

impl HeartbeatCell {
    /// The cell starts fresh so a restart does not alert immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Arc::new(RwLock::new(now)))
    }

    pub fn record(&self, now: DateTime<Utc>) {
        *self.0.write() = now;
    }

    pub fn last(&self) -> DateTime<Utc> {
        *self.0.read()
    }
}

/// Staleness state machine: OK until the heartbeat is older than the
/// threshold, back to OK once it is fresh again. One alert/recovery pair per
/// outage.
#[derive(Debug, Default)]
pub struct HeartbeatState {
    in_alert: bool,
}

impl HeartbeatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        last_heartbeat: DateTime<Utc>,
        now: DateTime<Utc>,
        stale_after: chrono::Duration,
    ) -> Option<WatchdogEvent> {
        let stale = now - last_heartbeat > stale_after;
        match (stale, self.in_alert) {
            (true, false) => {
                self.in_alert = true;
                Some(WatchdogEvent::RaiseAlert)
            }
            (false, true) => {
                self.in_alert = false;
                Some(WatchdogEvent::Recover)
            }
            _ => None,
        }
    }

    pub fn in_alert(&self) -> bool {
        self.in_alert
    }
}

/// Background loop driving [`HeartbeatState`] off the shared cell
pub struct HeartbeatMonitor {
    cell: HeartbeatCell,
    tick: Duration,
    stale_after: chrono::Duration,
    notifier: Arc<Notifier>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl HeartbeatMonitor {
    pub fn new(
        cell: HeartbeatCell,
        tick: Duration,
        stale_after_minutes: i64,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            cell,
            tick,
            stale_after: chrono::Duration::minutes(stale_after_minutes),
            notifier,
            shutdown_tx: None,
        }
    }

    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let cell = self.cell.clone();
        let tick = self.tick;
        let stale_after = self.stale_after;
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            tracing::info!(
                "Heartbeat monitor started, alerting after {} min of silence",
                stale_after.num_minutes()
            );

            let mut state = HeartbeatState::new();
            let mut ticker = interval(tick);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match state.evaluate(cell.last(), Utc::now(), stale_after) {
                            Some(WatchdogEvent::RaiseAlert) => {
                                notifier
                                    .send(&format!(
                                        "@everyone **CRITICAL ALERT** -> the monitored server \
                                         has not pinged for more than {} min, power or network \
                                         loss suspected! Check the machine it runs on.",
                                        stale_after.num_minutes()
                                    ))
                                    .await;
                            }
                            Some(WatchdogEvent::Recover) => {
                                notifier
                                    .send("@everyone End of alert, the connection to the \
                                           monitored server has been restored")
                                    .await;
                            }
                            None => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Heartbeat monitor shutting down");
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
