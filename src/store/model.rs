//! Core data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A remote sensor unit reporting periodic temperature readings.
///
/// Identified by `machine_name`, matched case-insensitively after trimming.
/// Bounds are optional: an unset bound never triggers an out-of-range alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub id: u64,
    pub name: String,
    pub machine_name: String,
    /// Display color for charts (hex, e.g. "#3fa2c4")
    pub color: String,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    /// Expected reporting cadence, also echoed back to the probe
    pub send_frequency_secs: u32,
    /// Width of the trend window in hours
    pub tendency_span_hours: u32,
    /// Advisory minimum change for displaying a trend arrow
    pub minimum_tendency_change: f64,
    pub created_at: DateTime<Utc>,
    /// Last alert dispatch time, gates repeat notifications
    pub last_notified_at: Option<DateTime<Utc>>,
    pub last_communication_at: Option<DateTime<Utc>>,
    /// Set when the probe reports its first loop after a reboot
    pub last_booted_at: Option<DateTime<Utc>>,
    /// Radio signal indicator (RSSI, dBm)
    pub signal_strength: Option<i32>,
}

impl Probe {
    pub fn is_too_hot(&self, temperature: f64) -> bool {
        self.max_temperature.is_some_and(|max| temperature > max)
    }

    pub fn is_too_cold(&self, temperature: f64) -> bool {
        self.min_temperature.is_some_and(|min| temperature < min)
    }

    pub fn is_out_of_bounds(&self, temperature: f64) -> bool {
        self.is_too_hot(temperature) || self.is_too_cold(temperature)
    }

    pub fn signal_quality(&self) -> SignalQuality {
        SignalQuality::from_rssi(self.signal_strength)
    }
}

/// Fields needed to create a probe on first contact
#[derive(Debug, Clone)]
pub struct NewProbe {
    pub machine_name: String,
    pub color: String,
    pub signal_strength: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// One temperature sample from a probe. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub probe_id: u64,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
}

/// Rough quality classification of a probe's radio link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    Unknown,
    Excellent,
    Good,
    Fair,
    Weak,
    VeryPoor,
}

impl SignalQuality {
    /// An RSSI of 0 means the probe never reported one.
    pub fn from_rssi(rssi: Option<i32>) -> Self {
        match rssi {
            None | Some(0) => SignalQuality::Unknown,
            Some(r) if r >= -50 => SignalQuality::Excellent,
            Some(r) if r >= -60 => SignalQuality::Good,
            Some(r) if r >= -70 => SignalQuality::Fair,
            Some(r) if r >= -80 => SignalQuality::Weak,
            Some(_) => SignalQuality::VeryPoor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_with_bounds(min: Option<f64>, max: Option<f64>) -> Probe {
        Probe {
            id: 1,
            name: "tank".to_string(),
            machine_name: "tank".to_string(),
            color: "#123456".to_string(),
            min_temperature: min,
            max_temperature: max,
            send_frequency_secs: 60,
            tendency_span_hours: 2,
            minimum_tendency_change: 0.3,
            created_at: Utc::now(),
            last_notified_at: None,
            last_communication_at: None,
            last_booted_at: None,
            signal_strength: None,
        }
    }

    #[test]
    fn test_bounds_checks() {
        let probe = probe_with_bounds(Some(18.0), Some(26.0));
        assert!(probe.is_too_hot(27.5));
        assert!(!probe.is_too_hot(26.0));
        assert!(probe.is_too_cold(17.9));
        assert!(!probe.is_too_cold(18.0));
        assert!(probe.is_out_of_bounds(27.5));
        assert!(!probe.is_out_of_bounds(22.0));
    }

    #[test]
    fn test_unset_bounds_never_out_of_range() {
        let probe = probe_with_bounds(None, None);
        assert!(!probe.is_out_of_bounds(-40.0));
        assert!(!probe.is_out_of_bounds(95.0));

        let probe = probe_with_bounds(Some(18.0), None);
        assert!(!probe.is_too_hot(95.0));
        assert!(probe.is_too_cold(10.0));
    }

    #[test]
    fn test_signal_quality_boundaries() {
        assert_eq!(SignalQuality::from_rssi(None), SignalQuality::Unknown);
        assert_eq!(SignalQuality::from_rssi(Some(0)), SignalQuality::Unknown);
        assert_eq!(SignalQuality::from_rssi(Some(-50)), SignalQuality::Excellent);
        assert_eq!(SignalQuality::from_rssi(Some(-51)), SignalQuality::Good);
        assert_eq!(SignalQuality::from_rssi(Some(-60)), SignalQuality::Good);
        assert_eq!(SignalQuality::from_rssi(Some(-70)), SignalQuality::Fair);
        assert_eq!(SignalQuality::from_rssi(Some(-80)), SignalQuality::Weak);
        assert_eq!(SignalQuality::from_rssi(Some(-81)), SignalQuality::VeryPoor);
    }
}
