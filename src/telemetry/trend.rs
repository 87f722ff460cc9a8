//! Trend analysis over two half-windows of readings

use chrono::{DateTime, Duration, Utc};

use crate::store::Reading;

/// Directional tendency for a probe's readings.
///
/// Splits the last `span_hours` into a recent half `(now - span/2, now]` and
/// an older half `(now - span, now - span/2]` and returns the difference of
/// their mean temperatures. An empty window has mean 0, and the tendency is
/// only reported when both means are non-zero; a true zero-valued mean is
/// indistinguishable from "no data", so values near exactly 0° can yield a
/// false negative.
pub fn tendency(readings: &[Reading], span_hours: u32, now: DateTime<Utc>) -> f64 {
    let half_span = Duration::minutes(span_hours as i64 * 30);
    let recent_cut = now - half_span;
    let oldest_cut = now - half_span - half_span;

    let recent_mean = mean(
        readings
            .iter()
            .filter(|r| r.timestamp > recent_cut)
            .map(|r| r.temperature),
    );
    let older_mean = mean(
        readings
            .iter()
            .filter(|r| r.timestamp > oldest_cut && r.timestamp <= recent_cut)
            .map(|r| r.temperature),
    );

    if recent_mean != 0.0 && older_mean != 0.0 {
        recent_mean - older_mean
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(minutes_ago: i64, temperature: f64, now: DateTime<Utc>) -> Reading {
        Reading {
            probe_id: 1,
            timestamp: now - Duration::minutes(minutes_ago),
            temperature,
        }
    }

    #[test]
    fn test_tendency_of_both_windows() {
        let now = Utc::now();
        // 2-hour span: recent half is the last hour, older half the one before
        let readings = vec![
            reading(90, 20.0, now),
            reading(70, 21.0, now),
            reading(50, 22.0, now),
            reading(10, 23.0, now),
        ];

        let t = tendency(&readings, 2, now);
        assert!((t - 2.0).abs() < 1e-9, "expected 22.5 - 20.5 = 2, got {}", t);
    }

    #[test]
    fn test_empty_recent_window_yields_zero_not_negative_spike() {
        let now = Utc::now();
        let readings = vec![reading(90, 25.0, now), reading(70, 25.0, now)];

        assert_eq!(tendency(&readings, 2, now), 0.0);
    }

    #[test]
    fn test_empty_older_window_yields_zero() {
        let now = Utc::now();
        let readings = vec![reading(10, 25.0, now), reading(5, 26.0, now)];

        assert_eq!(tendency(&readings, 2, now), 0.0);
    }

    #[test]
    fn test_no_readings_yields_zero() {
        assert_eq!(tendency(&[], 2, Utc::now()), 0.0);
    }

    #[test]
    fn test_readings_outside_span_are_ignored() {
        let now = Utc::now();
        let readings = vec![
            reading(300, 5.0, now),
            reading(90, 20.0, now),
            reading(10, 22.0, now),
        ];

        let t = tendency(&readings, 2, now);
        assert!((t - 2.0).abs() < 1e-9, "got {}", t);
    }
}
