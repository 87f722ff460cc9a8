//! Probe and reading store
//!
//! In-process store behind a single lock. Probe creation is serialized with
//! the machine-name lookup so concurrent first-ever submissions from the same
//! probe resolve to one record.

pub mod memory;
pub mod model;

pub use memory::{ProbeStore, StoreError};
pub use model::{NewProbe, Probe, Reading, SignalQuality};
