//! Alerting: chat webhook notifier and the threshold alert loop

pub mod notifier;
pub mod threshold;

pub use notifier::Notifier;
pub use threshold::ThresholdAlertLoop;
