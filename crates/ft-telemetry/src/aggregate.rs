//! Aggregation functions and time bucketing.
//!
//! Aggregation keywords are matched exactly (`AVG`, `SUM`, `MIN`, `MAX`,
//! `COUNT`); lowercase spellings are unsupported. Over an empty set `COUNT`
//! is 0 and every other function has no value.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use ft_common::{Error, Reading, Result as FtResult};
use ft_config::settings::DEFAULT_HOURLY_BUCKET_MAX_HOURS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    Avg,
    Sum,
    Min,
    Max,
    Count,
}

impl Aggregation {
    pub const ALL: [Aggregation; 5] = [
        Aggregation::Avg,
        Aggregation::Sum,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::Count,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Aggregation::Avg => "AVG",
            Aggregation::Sum => "SUM",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
            Aggregation::Count => "COUNT",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aggregation::ALL
            .into_iter()
            .find(|agg| agg.keyword() == s)
            .ok_or_else(|| Error::UnsupportedAggregation(s.to_string()))
    }
}

/// Result of an aggregation. Serializes as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Count(u64),
    Number(f64),
}

impl AggregateValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            AggregateValue::Number(v) => v,
            AggregateValue::Count(n) => n as f64,
        }
    }
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Number(v) => write!(f, "{}", v),
            AggregateValue::Count(n) => write!(f, "{}", n),
        }
    }
}

/// Reduce a value set with `aggregation`.
pub fn reduce(aggregation: Aggregation, values: &[f64]) -> Option<AggregateValue> {
    let value = match aggregation {
        Aggregation::Count => return Some(AggregateValue::Count(values.len() as u64)),
        _ if values.is_empty() => return None,
        Aggregation::Sum => values.iter().sum(),
        Aggregation::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    Some(AggregateValue::Number(value))
}

/// Most buckets a single bucketed aggregation may produce: a bit over a
/// year of hourly buckets, or about 27 years of daily ones.
pub const MAX_BUCKETS: usize = 10_000;

/// Time bucket width for bucketed aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Hour,
    Day,
}

impl Bucket {
    /// Hourly for ranges up to 24 hours, daily beyond.
    pub fn for_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Bucket {
        Self::for_range_with_limit(start, end, DEFAULT_HOURLY_BUCKET_MAX_HOURS)
    }

    pub fn for_range_with_limit(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        hourly_max_hours: u32,
    ) -> Bucket {
        if end - start <= Duration::hours(i64::from(hourly_max_hours)) {
            Bucket::Hour
        } else {
            Bucket::Day
        }
    }

    pub fn step(&self) -> Duration {
        match self {
            Bucket::Hour => Duration::hours(1),
            Bucket::Day => Duration::days(1),
        }
    }

    /// Number of buckets covering `[floor(start), end]`; 0 when `start > end`.
    pub fn count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        if start > end {
            return 0;
        }
        let span = (end - self.floor(start)).num_seconds();
        usize::try_from(span / self.step().num_seconds())
            .map_or(usize::MAX, |n| n.saturating_add(1))
    }

    /// Start of the UTC bucket containing `ts`.
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let width = self.step().num_seconds();
        let secs = ts.timestamp();
        DateTime::from_timestamp(secs - secs.rem_euclid(width), 0).unwrap_or(ts)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Hour => write!(f, "hour"),
            Bucket::Day => write!(f, "day"),
        }
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hourly" => Ok(Bucket::Hour),
            "day" | "daily" => Ok(Bucket::Day),
            other => Err(format!("unknown bucket: {}", other)),
        }
    }
}

/// One aggregated time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketPoint {
    pub bucket_start: DateTime<Utc>,
    /// `None` when the bucket has no readings and the function has no
    /// empty-set value.
    pub value: Option<AggregateValue>,
}

/// Aggregate ascending `readings` into consecutive buckets covering
/// `[floor(start), end]`. Empty buckets are emitted, so the series has no gaps.
///
/// Fails with [`Error::TooManyBuckets`] when the range needs more than
/// [`MAX_BUCKETS`] buckets.
pub fn bucketize(
    readings: &[Reading],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bucket: Bucket,
    aggregation: Aggregation,
) -> FtResult<Vec<BucketPoint>> {
    let requested = bucket.count(start, end);
    if requested > MAX_BUCKETS {
        return Err(Error::TooManyBuckets {
            requested,
            max: MAX_BUCKETS,
        });
    }

    let step = bucket.step();
    let mut points = Vec::with_capacity(requested);
    let mut cursor = bucket.floor(start);
    let mut idx = 0;
    let mut values = Vec::new();

    while cursor <= end {
        let next = cursor + step;
        values.clear();
        while idx < readings.len() && readings[idx].recorded_at < next {
            if readings[idx].recorded_at >= cursor {
                values.push(readings[idx].value);
            }
            idx += 1;
        }
        points.push(BucketPoint {
            bucket_start: cursor,
            value: reduce(aggregation, &values),
        });
        cursor = next;
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ft_common::{DataPointTypeId, DeviceId};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn reading(value: f64, ts: DateTime<Utc>) -> Reading {
        Reading::new(DeviceId(1), DataPointTypeId(24), value, ts)
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!("AVG".parse::<Aggregation>().unwrap(), Aggregation::Avg);
        assert_eq!("COUNT".parse::<Aggregation>().unwrap(), Aggregation::Count);
        assert!(matches!(
            "avg".parse::<Aggregation>(),
            Err(Error::UnsupportedAggregation(s)) if s == "avg"
        ));
        assert!("MEDIAN".parse::<Aggregation>().is_err());
    }

    #[test]
    fn test_reduce_values() {
        let values = [10.0, 20.0, 30.0];
        assert_eq!(reduce(Aggregation::Avg, &values), Some(AggregateValue::Number(20.0)));
        assert_eq!(reduce(Aggregation::Sum, &values), Some(AggregateValue::Number(60.0)));
        assert_eq!(reduce(Aggregation::Min, &values), Some(AggregateValue::Number(10.0)));
        assert_eq!(reduce(Aggregation::Max, &values), Some(AggregateValue::Number(30.0)));
        assert_eq!(reduce(Aggregation::Count, &values), Some(AggregateValue::Count(3)));
    }

    #[test]
    fn test_reduce_empty() {
        assert_eq!(reduce(Aggregation::Count, &[]), Some(AggregateValue::Count(0)));
        for agg in [Aggregation::Avg, Aggregation::Sum, Aggregation::Min, Aggregation::Max] {
            assert_eq!(reduce(agg, &[]), None, "{agg}");
        }
    }

    #[test]
    fn test_value_serializes_as_number() {
        assert_eq!(serde_json::to_string(&AggregateValue::Count(4)).unwrap(), "4");
        assert_eq!(serde_json::to_string(&AggregateValue::Number(2.5)).unwrap(), "2.5");
    }

    #[test]
    fn test_bucket_for_range() {
        assert_eq!(Bucket::for_range(at(0, 0), at(23, 59)), Bucket::Hour);
        assert_eq!(
            Bucket::for_range(at(0, 0), at(0, 0) + Duration::hours(24)),
            Bucket::Hour
        );
        assert_eq!(
            Bucket::for_range(at(0, 0), at(0, 0) + Duration::hours(25)),
            Bucket::Day
        );
        assert_eq!(
            Bucket::for_range_with_limit(at(0, 0), at(6, 0), 2),
            Bucket::Day
        );
    }

    #[test]
    fn test_bucket_floor() {
        assert_eq!(Bucket::Hour.floor(at(13, 47)), at(13, 0));
        assert_eq!(Bucket::Day.floor(at(13, 47)), at(0, 0));
        assert_eq!(Bucket::Hour.floor(at(13, 0)), at(13, 0));
    }

    #[test]
    fn test_bucketize_emits_empty_buckets() {
        let readings = vec![reading(1.0, at(0, 10)), reading(3.0, at(0, 50)), reading(5.0, at(2, 5))];
        let points =
            bucketize(&readings, at(0, 0), at(2, 30), Bucket::Hour, Aggregation::Avg).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].bucket_start, at(0, 0));
        assert_eq!(points[0].value, Some(AggregateValue::Number(2.0)));
        assert_eq!(points[1].value, None);
        assert_eq!(points[2].value, Some(AggregateValue::Number(5.0)));

        let counts =
            bucketize(&readings, at(0, 0), at(2, 30), Bucket::Hour, Aggregation::Count).unwrap();
        assert_eq!(counts[1].value, Some(AggregateValue::Count(0)));
    }

    #[test]
    fn test_bucketize_inverted_range() {
        assert!(bucketize(&[], at(5, 0), at(1, 0), Bucket::Hour, Aggregation::Sum)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_bucket_count() {
        assert_eq!(Bucket::Hour.count(at(0, 0), at(2, 30)), 3);
        assert_eq!(Bucket::Hour.count(at(0, 30), at(0, 45)), 1);
        assert_eq!(Bucket::Day.count(at(0, 0), at(23, 59)), 1);
        assert_eq!(Bucket::Hour.count(at(5, 0), at(1, 0)), 0);
    }

    #[test]
    fn test_bucketize_rejects_oversized_ranges() {
        let start = Utc.with_ymd_and_hms(1824, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let err = bucketize(&[], start, end, Bucket::Hour, Aggregation::Count).unwrap_err();
        match err {
            Error::TooManyBuckets { requested, max } => {
                assert_eq!(requested, 1_753_177);
                assert_eq!(max, MAX_BUCKETS);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Exactly at the limit is still served.
        let end = start + Duration::hours(MAX_BUCKETS as i64 - 1);
        let points = bucketize(&[], start, end, Bucket::Hour, Aggregation::Count).unwrap();
        assert_eq!(points.len(), MAX_BUCKETS);
    }
}
