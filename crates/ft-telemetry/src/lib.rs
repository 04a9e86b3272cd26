//! Fleet telemetry resolution and aggregation engine.
//!
//! - [`store`]: raw reading storage behind the [`DataPointStore`] trait
//! - [`cache`]: TTL cache for latest atomic readings
//! - [`aggregate`]: AVG/SUM/MIN/MAX/COUNT and time bucketing
//! - [`service`]: [`TelemetryService`], which ties the registry, store and
//!   cache together

pub mod aggregate;
pub mod cache;
pub mod service;
pub mod store;

pub use aggregate::{
    bucketize, reduce, AggregateValue, Aggregation, Bucket, BucketPoint, MAX_BUCKETS,
};
pub use cache::{CacheKey, MemoryCache, NoopCache, ReadingCache};
pub use service::{DataPointSnapshot, TelemetryService};
pub use store::{DataPointStore, MemoryStore};
