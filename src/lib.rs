//! Thermwatch: temperature telemetry monitor
//!
//! Ingests periodic temperature readings from networked probes, computes
//! short-term trend signals, and raises deduplicated chat alerts when a
//! reading breaches its configured bounds or a probe goes silent. A companion
//! binary implements the other half of a bidirectional dead-man's switch, so
//! both a local outage and a remote-service outage are detected and reported
//! exactly once per incident.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thermwatch::alerts::Notifier;
//! use thermwatch::errors::ErrorTrigger;
//! use thermwatch::store::ProbeStore;
//! use thermwatch::telemetry::{ProbeReport, TelemetryIngestor};
//!
//! # async fn demo() {
//! let errors = Arc::new(ErrorTrigger::new(true, 30));
//! let notifier = Arc::new(Notifier::new(None, Arc::clone(&errors)));
//! let store = Arc::new(ProbeStore::new());
//! let ingestor = TelemetryIngestor::new(Arc::clone(&store), notifier);
//!
//! let outcome = ingestor
//!     .ingest(ProbeReport {
//!         machine_name: "tank-1".to_string(),
//!         temperature: "23.5".to_string(),
//!         signal_strength: -58,
//!         first_loop_since_boot: false,
//!     })
//!     .await
//!     .unwrap();
//! println!("{} reported {} C", outcome.probe.name, outcome.temperature);
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod errors;
pub mod store;
pub mod telemetry;
pub mod watchdog;

// Re-export commonly used types
pub use alerts::{Notifier, ThresholdAlertLoop};
pub use errors::ErrorTrigger;
pub use store::{Probe, ProbeStore, Reading, StoreError};
pub use telemetry::{IngestError, TelemetryIngestor};
pub use watchdog::{HeartbeatCell, HeartbeatMonitor, OutboundWatchdog};
