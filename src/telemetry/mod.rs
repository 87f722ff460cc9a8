//! Telemetry ingestion and trend analysis

pub mod ingest;
pub mod trend;

pub use ingest::{parse_temperature, IngestError, IngestOutcome, ProbeReport, TelemetryIngestor};
pub use trend::tendency;
