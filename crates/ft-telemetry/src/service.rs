//! Data point resolution engine.
//!
//! [`TelemetryService`] answers three kinds of question for a device:
//!
//! - latest value of a type (atomic: read-through cache; composite: first
//!   source in priority order that has a reading)
//! - raw readings of an atomic type within an inclusive period
//! - an aggregate over such a period, optionally split into time buckets
//!
//! Unknown types and unsupported aggregation keywords are logged at `warn`
//! and produce an empty result. Store and cache failures propagate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ft_common::{DataPointTypeId, DeviceId, Error, Reading, Result};
use ft_config::{DataPointType, EngineSettings, Registry, TypeKind};
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::{
    bucketize, reduce, AggregateValue, Aggregation, Bucket, BucketPoint, MAX_BUCKETS,
};
use crate::cache::{CacheKey, MemoryCache, NoopCache, ReadingCache};
use crate::store::DataPointStore;

/// A catalogue type together with its latest reading for one device.
#[derive(Debug, Clone, Serialize)]
pub struct DataPointSnapshot {
    pub data_point_type: DataPointType,
    pub latest: Option<Reading>,
}

pub struct TelemetryService {
    registry: Arc<Registry>,
    store: Arc<dyn DataPointStore>,
    cache: Arc<dyn ReadingCache>,
    cache_ttl: Duration,
    hourly_bucket_max_hours: u32,
}

impl std::fmt::Debug for TelemetryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryService")
            .field("types", &self.registry.len())
            .field("cache_ttl", &self.cache_ttl)
            .field("hourly_bucket_max_hours", &self.hourly_bucket_max_hours)
            .finish_non_exhaustive()
    }
}

impl TelemetryService {
    /// Service with default settings over the given collaborators.
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn DataPointStore>,
        cache: Arc<dyn ReadingCache>,
    ) -> Self {
        let defaults = EngineSettings::default();
        TelemetryService {
            registry,
            store,
            cache,
            cache_ttl: defaults.cache_ttl(),
            hourly_bucket_max_hours: defaults.hourly_bucket_max_hours,
        }
    }

    /// Service configured from settings. A [`MemoryCache`] is used when
    /// caching is enabled and a [`NoopCache`] otherwise.
    pub fn from_settings(
        registry: Arc<Registry>,
        store: Arc<dyn DataPointStore>,
        settings: &EngineSettings,
    ) -> Self {
        let cache: Arc<dyn ReadingCache> = if settings.cache_enabled {
            Arc::new(MemoryCache::new())
        } else {
            Arc::new(NoopCache)
        };
        Self::new(registry, store, cache)
            .with_cache_ttl(settings.cache_ttl())
            .with_hourly_bucket_max_hours(settings.hourly_bucket_max_hours)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_hourly_bucket_max_hours(mut self, hours: u32) -> Self {
        self.hourly_bucket_max_hours = hours;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    fn lookup(&self, device: DeviceId, type_id: DataPointTypeId) -> Option<&DataPointType> {
        match self.registry.lookup(type_id) {
            Ok(ty) => Some(ty),
            Err(err) => {
                warn!(device_id = %device, type_id = %type_id, error = %err, "data point type not found");
                None
            }
        }
    }

    /// Latest reading for `type_id` on `device`.
    ///
    /// For composite types the returned reading carries the id of the source
    /// type that supplied it. Composite results are not cached under the
    /// composite id; only the underlying atomic lookups are.
    pub fn latest_reading(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
    ) -> Result<Option<Reading>> {
        let Some(ty) = self.lookup(device, type_id) else {
            return Ok(None);
        };

        match &ty.kind {
            TypeKind::Atomic => self.latest_atomic(device, type_id),
            TypeKind::Composite { sources } => {
                for source in sources {
                    if let Some(reading) = self.latest_reading(device, source.source_type_id)? {
                        debug!(
                            device_id = %device,
                            composite = %type_id,
                            source = %source.source_type_id,
                            priority = source.priority,
                            "composite resolved"
                        );
                        return Ok(Some(reading));
                    }
                }
                debug!(device_id = %device, composite = %type_id, "no source has a reading");
                Ok(None)
            }
        }
    }

    fn latest_atomic(&self, device: DeviceId, type_id: DataPointTypeId) -> Result<Option<Reading>> {
        let key = CacheKey::latest(device, type_id);

        if let Some(hit) = self.cache.get(&key)? {
            debug!(key = %key, "latest reading cache hit");
            return Ok(Some(hit));
        }

        debug!(key = %key, "latest reading cache miss");
        let found = self.store.find_latest(device, type_id)?;
        if let Some(reading) = &found {
            self.cache.put(key, reading.clone(), self.cache_ttl)?;
        }
        Ok(found)
    }

    /// Drop the cached latest reading for an atomic series, so the next
    /// lookup goes to the store. Called after ingesting a newer reading.
    pub fn forget_latest(&self, device: DeviceId, type_id: DataPointTypeId) -> Result<()> {
        self.cache.forget(&CacheKey::latest(device, type_id))
    }

    /// Readings of an atomic type with `start <= recorded_at <= end`,
    /// ascending. Composite types are not supported here and yield nothing.
    pub fn readings_for_period(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        let Some(ty) = self.lookup(device, type_id) else {
            return Ok(Vec::new());
        };

        if !ty.is_atomic() {
            let err = Error::CompositePeriodQuery { type_id };
            warn!(device_id = %device, type_id = %type_id, error = %err, "period query on composite type");
            return Ok(Vec::new());
        }

        if start > end {
            debug!(device_id = %device, type_id = %type_id, %start, %end, "inverted period");
            return Ok(Vec::new());
        }

        self.store.find_in_range(device, type_id, start, end)
    }

    /// Aggregate over a period using a keyword such as `"AVG"`.
    /// Unsupported keywords are logged and yield `None`.
    pub fn aggregated_reading(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        aggregation: &str,
    ) -> Result<Option<AggregateValue>> {
        match parse_aggregation(aggregation) {
            Some(agg) => self.aggregate(device, type_id, start, end, agg),
            None => Ok(None),
        }
    }

    /// Aggregate over a period with a typed aggregation.
    pub fn aggregate(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        aggregation: Aggregation,
    ) -> Result<Option<AggregateValue>> {
        let readings = self.readings_for_period(device, type_id, start, end)?;
        let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
        Ok(reduce(aggregation, &values))
    }

    /// Aggregate per time bucket. Pass `None` to pick the bucket width from
    /// the range length. Ranges needing more than
    /// [`MAX_BUCKETS`](crate::aggregate::MAX_BUCKETS) buckets are rejected
    /// before the store is queried.
    pub fn aggregated_buckets(
        &self,
        device: DeviceId,
        type_id: DataPointTypeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        aggregation: &str,
        bucket: Option<Bucket>,
    ) -> Result<Vec<BucketPoint>> {
        let Some(agg) = parse_aggregation(aggregation) else {
            return Ok(Vec::new());
        };

        let bucket = bucket.unwrap_or_else(|| self.bucket_for_range(start, end));
        let requested = bucket.count(start, end);
        if requested > MAX_BUCKETS {
            return Err(Error::TooManyBuckets {
                requested,
                max: MAX_BUCKETS,
            });
        }

        let readings = self.readings_for_period(device, type_id, start, end)?;
        if readings.is_empty() && !self.is_atomic(type_id) {
            return Ok(Vec::new());
        }

        bucketize(&readings, start, end, bucket, agg)
    }

    /// Bucket width chosen for a range under the configured threshold.
    pub fn bucket_for_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Bucket {
        Bucket::for_range_with_limit(start, end, self.hourly_bucket_max_hours)
    }

    /// Latest reading for every catalogue type, in id order.
    pub fn dashboard(&self, device: DeviceId) -> Result<Vec<DataPointSnapshot>> {
        self.registry
            .iter()
            .map(|ty| {
                Ok(DataPointSnapshot {
                    data_point_type: ty.clone(),
                    latest: self.latest_reading(device, ty.id)?,
                })
            })
            .collect()
    }

    fn is_atomic(&self, type_id: DataPointTypeId) -> bool {
        self.registry
            .lookup(type_id)
            .map(DataPointType::is_atomic)
            .unwrap_or(false)
    }
}

fn parse_aggregation(keyword: &str) -> Option<Aggregation> {
    match keyword.parse::<Aggregation>() {
        Ok(agg) => Some(agg),
        Err(err) => {
            warn!(aggregation = keyword, error = %err, "unsupported aggregation type");
            None
        }
    }
}
