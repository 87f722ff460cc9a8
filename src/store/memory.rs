//! In-memory probe store

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::model::{NewProbe, Probe, Reading};

const DEFAULT_SEND_FREQUENCY_SECS: u32 = 60;
const DEFAULT_TENDENCY_SPAN_HOURS: u32 = 2;
const DEFAULT_MINIMUM_TENDENCY_CHANGE: f64 = 0.3;

/// Store of probes and their readings, guarded by a single lock
pub struct ProbeStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_probe_id: u64,
    probes: HashMap<u64, Probe>,
    /// Readings per probe, in append order
    readings: HashMap<u64, Vec<Reading>>,
}

impl ProbeStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_probe_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Find a probe by machine name (case-insensitive, trimmed)
    pub fn find_by_machine_name(&self, machine_name: &str) -> Option<Probe> {
        let wanted = machine_name.trim();
        let inner = self.inner.read();
        inner
            .probes
            .values()
            .find(|p| p.machine_name.trim().eq_ignore_ascii_case(wanted))
            .cloned()
    }

    /// Resolve a probe by machine name, creating it if unknown.
    ///
    /// Lookup and insert happen under one write lock, so concurrent
    /// first-ever submissions create a single probe. Returns the probe and
    /// whether it was created by this call.
    pub fn find_or_create(&self, seed: NewProbe) -> (Probe, bool) {
        let wanted = seed.machine_name.trim().to_string();
        let mut inner = self.inner.write();

        if let Some(existing) = inner
            .probes
            .values()
            .find(|p| p.machine_name.trim().eq_ignore_ascii_case(&wanted))
        {
            return (existing.clone(), false);
        }

        let id = inner.next_probe_id;
        inner.next_probe_id += 1;

        let probe = Probe {
            id,
            name: wanted.clone(),
            machine_name: wanted,
            color: seed.color,
            min_temperature: None,
            max_temperature: None,
            send_frequency_secs: DEFAULT_SEND_FREQUENCY_SECS,
            tendency_span_hours: DEFAULT_TENDENCY_SPAN_HOURS,
            minimum_tendency_change: DEFAULT_MINIMUM_TENDENCY_CHANGE,
            created_at: seed.created_at,
            last_notified_at: None,
            last_communication_at: Some(seed.created_at),
            last_booted_at: None,
            signal_strength: seed.signal_strength,
        };

        inner.probes.insert(id, probe.clone());
        inner.readings.insert(id, Vec::new());
        (probe, true)
    }

    pub fn get_probe(&self, id: u64) -> Option<Probe> {
        self.inner.read().probes.get(&id).cloned()
    }

    pub fn list_probes(&self) -> Vec<Probe> {
        let inner = self.inner.read();
        let mut probes: Vec<Probe> = inner.probes.values().cloned().collect();
        probes.sort_by_key(|p| p.id);
        probes
    }

    pub fn update_last_notified(
        &self,
        probe_id: u64,
        when: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let probe = inner
            .probes
            .get_mut(&probe_id)
            .ok_or(StoreError::ProbeNotFound(probe_id))?;
        probe.last_notified_at = Some(when);
        Ok(())
    }

    pub fn update_communication_info(
        &self,
        probe_id: u64,
        signal_strength: i32,
        when: DateTime<Utc>,
        rebooted_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let probe = inner
            .probes
            .get_mut(&probe_id)
            .ok_or(StoreError::ProbeNotFound(probe_id))?;
        probe.signal_strength = Some(signal_strength);
        probe.last_communication_at = Some(when);
        if let Some(booted) = rebooted_at {
            probe.last_booted_at = Some(booted);
        }
        Ok(())
    }

    pub fn add_reading(&self, reading: Reading) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if !inner.probes.contains_key(&reading.probe_id) {
            return Err(StoreError::ProbeNotFound(reading.probe_id));
        }
        inner
            .readings
            .entry(reading.probe_id)
            .or_default()
            .push(reading);
        Ok(())
    }

    /// Readings for a probe with `timestamp > since`, oldest first
    pub fn readings_since(
        &self,
        probe_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.read();
        if !inner.probes.contains_key(&probe_id) {
            return Err(StoreError::ProbeNotFound(probe_id));
        }
        Ok(inner
            .readings
            .get(&probe_id)
            .map(|rs| {
                rs.iter()
                    .filter(|r| r.timestamp > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Most recent reading with `timestamp > since`, if any
    pub fn latest_reading_since(
        &self,
        probe_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Option<Reading>, StoreError> {
        let inner = self.inner.read();
        if !inner.probes.contains_key(&probe_id) {
            return Err(StoreError::ProbeNotFound(probe_id));
        }
        Ok(inner.readings.get(&probe_id).and_then(|rs| {
            rs.iter()
                .filter(|r| r.timestamp > since)
                .max_by_key(|r| r.timestamp)
                .cloned()
        }))
    }

    /// Test/ops helper to adjust bounds after a probe was auto-created
    pub fn set_bounds(
        &self,
        probe_id: u64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let probe = inner
            .probes
            .get_mut(&probe_id)
            .ok_or(StoreError::ProbeNotFound(probe_id))?;
        probe.min_temperature = min;
        probe.max_temperature = max;
        Ok(())
    }
}

impl Default for ProbeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Probe {0} not found")]
    ProbeNotFound(u64),
}
