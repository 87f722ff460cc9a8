//! Telemetry ingestion
//!
//! Matches an inbound reading to a probe (lazily creating one on first
//! contact), refreshes the probe's liveness metadata, and appends the parsed
//! reading.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::alerts::Notifier;
use crate::store::{NewProbe, Probe, ProbeStore, Reading, StoreError};

/// One inbound report from a probe
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub machine_name: String,
    pub temperature: String,
    pub signal_strength: i32,
    /// True on the probe's first report after booting
    pub first_loop_since_boot: bool,
}

/// Result of a successful ingestion: the resolved probe (with current bounds
/// and cadence) and the parsed temperature, so the caller can compute the
/// out-of-bounds flags and cadence to report back.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub probe: Probe,
    pub temperature: f64,
}

/// Ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Missing machine name")]
    MissingMachineName,

    #[error("Missing temperature")]
    MissingTemperature,

    #[error("Invalid temperature value '{0}'")]
    InvalidTemperature(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct TelemetryIngestor {
    store: Arc<ProbeStore>,
    notifier: Arc<Notifier>,
}

impl TelemetryIngestor {
    pub fn new(store: Arc<ProbeStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn ingest(&self, report: ProbeReport) -> Result<IngestOutcome, IngestError> {
        if report.machine_name.trim().is_empty() {
            return Err(IngestError::MissingMachineName);
        }
        if report.temperature.trim().is_empty() {
            return Err(IngestError::MissingTemperature);
        }

        let now = Utc::now();

        let (probe, created) = self.store.find_or_create(NewProbe {
            machine_name: report.machine_name.clone(),
            color: random_color(),
            signal_strength: Some(report.signal_strength),
            created_at: now,
        });

        if created {
            tracing::info!(
                machine_name = %probe.machine_name,
                probe_id = probe.id,
                "Discovered new probe"
            );
            // Always announced exactly once per creation, never deduped
            self.notifier
                .send(&format!(
                    "A new probe has been discovered: {}, finish its configuration \
                     (probe id {})",
                    probe.machine_name, probe.id
                ))
                .await;
        } else {
            let rebooted_at = report.first_loop_since_boot.then_some(now);
            self.store.update_communication_info(
                probe.id,
                report.signal_strength,
                now,
                rebooted_at,
            )?;
        }

        // Communication metadata is already persisted at this point, so a
        // parse failure drops the reading but keeps the probe marked alive.
        let temperature = parse_temperature(&report.temperature)
            .ok_or_else(|| IngestError::InvalidTemperature(report.temperature.clone()))?;

        self.store.add_reading(Reading {
            probe_id: probe.id,
            timestamp: now,
            temperature,
        })?;

        // Re-read so the outcome reflects the metadata written above
        let probe = self.store.get_probe(probe.id).unwrap_or(probe);

        Ok(IngestOutcome { probe, temperature })
    }
}

/// Parse a temperature string: invariant format first (decimal point), then
/// a decimal-comma fallback for probes with locale-formatted firmware.
pub fn parse_temperature(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return Some(value);
    }
    trimmed.replace(',', ".").parse::<f64>().ok()
}

fn random_color() -> String {
    format!("#{:06X}", rand::thread_rng().gen_range(0..0x1000000))
}
