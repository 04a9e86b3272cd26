//! Raw data point store.
//!
//! The store is the read source of the engine. Production deployments put a
//! database behind [`DataPointStore`]; [`MemoryStore`] keeps per-series
//! vectors sorted by `recorded_at` and backs the CLI and the tests.
//!
//! # JSONL layout
//!
//! [`MemoryStore::load_jsonl`] reads one raw record per line:
//!
//! ```text
//! {"device_id": 7, "data_point_type_id": 24, "value": 61.5, "recorded_at": "2024-03-01T12:00:00Z"}
//! ```
//!
//! `value` may be any raw payload accepted by [`ft_common::coerce_value`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use ft_common::{DataPointTypeId, DeviceId, Error, Reading, Result};
use serde::Deserialize;
use tracing::debug;

/// Query interface over raw readings.
///
/// Implementations must be safe to call concurrently. Transport failures are
/// reported as [`Error::Store`] and are never retried by the engine.
pub trait DataPointStore: Send + Sync {
    /// Most recent reading for the series, by `recorded_at`.
    fn find_latest(&self, device: DeviceId, type_id: DataPointTypeId) -> Result<Option<Reading>>;

    /// Readings with `start <= recorded_at <= end`, ascending.
    fn find_in_range(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>>;
}

type SeriesKey = (DeviceId, DataPointTypeId);

/// In-memory append-only store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<SeriesKey, Vec<Reading>>>,
}

/// A raw record as it appears in a JSONL readings file.
#[derive(Debug, Deserialize)]
struct RawRecord {
    device_id: DeviceId,
    data_point_type_id: DataPointTypeId,
    value: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-typed readings.
    pub fn from_readings(readings: impl IntoIterator<Item = Reading>) -> Result<Self> {
        let store = Self::new();
        for reading in readings {
            store.append(reading)?;
        }
        Ok(store)
    }

    /// Load raw records from a JSON Lines file. Blank lines are skipped;
    /// any malformed or non-numeric record fails the whole load.
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let unavailable = |e: std::io::Error| Error::ReadingsUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let reader = BufReader::new(File::open(path).map_err(unavailable)?);
        let store = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(unavailable)?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            let record: RawRecord =
                serde_json::from_str(&line).map_err(|e| Error::MalformedRecord {
                    line: line_no,
                    reason: e.to_string(),
                })?;

            store
                .ingest(
                    record.device_id,
                    record.data_point_type_id,
                    &record.value,
                    record.recorded_at,
                )
                .map_err(|e| Error::MalformedRecord {
                    line: line_no,
                    reason: e.to_string(),
                })?;
        }

        debug!(path = %path.display(), readings = store.len(), "loaded readings file");
        Ok(store)
    }

    /// Coerce a raw payload and append it.
    pub fn ingest(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
        raw: &serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<Reading> {
        let reading = Reading::from_raw(device, type_id, raw, recorded_at)?;
        self.append(reading.clone())?;
        Ok(reading)
    }

    /// Append a reading, keeping the series ordered by `recorded_at`.
    /// Readings sharing a timestamp keep their arrival order.
    pub fn append(&self, reading: Reading) -> Result<()> {
        let mut series = self
            .series
            .write()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))?;

        let readings = series
            .entry((reading.device_id, reading.data_point_type_id))
            .or_default();
        let pos = readings.partition_point(|r| r.recorded_at <= reading.recorded_at);
        readings.insert(pos, reading);
        Ok(())
    }

    /// Total number of readings across all series.
    pub fn len(&self) -> usize {
        self.series
            .read()
            .map(|series| series.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataPointStore for MemoryStore {
    fn find_latest(&self, device: DeviceId, type_id: DataPointTypeId) -> Result<Option<Reading>> {
        let series = self
            .series
            .read()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))?;

        Ok(series
            .get(&(device, type_id))
            .and_then(|readings| readings.last())
            .cloned())
    }

    fn find_in_range(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        if start > end {
            return Ok(Vec::new());
        }

        let series = self
            .series
            .read()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))?;

        let Some(readings) = series.get(&(device, type_id)) else {
            return Ok(Vec::new());
        };

        let lo = readings.partition_point(|r| r.recorded_at < start);
        let hi = readings.partition_point(|r| r.recorded_at <= end);
        Ok(readings[lo..hi].to_vec())
    }
}
