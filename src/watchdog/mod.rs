//! Bidirectional liveness watchdogs
//!
//! Two symmetric, independent state machines: the outbound watchdog
//! health-checks a remote endpoint from the monitoring server, and the
//! heartbeat monitor (running in the companion process) watches for staleness
//! of pings received from that server. Each raises exactly one alert and one
//! recovery message per outage.

pub mod heartbeat;
pub mod outbound;

pub use heartbeat::{HeartbeatCell, HeartbeatMonitor, HeartbeatState};
pub use outbound::{OutboundState, OutboundWatchdog};

/// A state transition worth notifying about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Entered the alert state: dispatch a critical alert
    RaiseAlert,
    /// Left the alert state: dispatch a recovery message
    Recover,
}
