//! Aggregation engine tests, including warning-log assertions.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use ft_common::{DataPointTypeId, DeviceId, Reading};
use ft_config::Registry;
use ft_telemetry::{
    AggregateValue, Aggregation, Bucket, MemoryCache, MemoryStore, TelemetryService,
};

const DEVICE: DeviceId = DeviceId(7);
// Builtin catalogue: 24 = Speed (atomic), 1000 = Fuel Level (composite).
const SPEED: DataPointTypeId = DataPointTypeId(24);
const FUEL: DataPointTypeId = DataPointTypeId(1000);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn service(readings: Vec<Reading>) -> TelemetryService {
    TelemetryService::new(
        Arc::new(Registry::builtin().unwrap()),
        Arc::new(MemoryStore::from_readings(readings).unwrap()),
        Arc::new(MemoryCache::new()),
    )
}

fn speeds(values: &[(f64, i64)]) -> Vec<Reading> {
    values
        .iter()
        .map(|(v, minutes)| Reading::new(DEVICE, SPEED, *v, t0() + Duration::minutes(*minutes)))
        .collect()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

/// Run `f` with a subscriber that captures formatted events.
fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, buffer.contents())
}

#[test]
fn test_aggregates_over_three_values() {
    let svc = service(speeds(&[(50.0, 10), (60.0, 20), (70.0, 30)]));
    let end = t0() + Duration::hours(1);

    let get = |agg: &str| svc.aggregated_reading(DEVICE, SPEED, t0(), end, agg).unwrap();
    assert_eq!(get("AVG"), Some(AggregateValue::Number(60.0)));
    assert_eq!(get("SUM"), Some(AggregateValue::Number(180.0)));
    assert_eq!(get("MIN"), Some(AggregateValue::Number(50.0)));
    assert_eq!(get("MAX"), Some(AggregateValue::Number(70.0)));
    assert_eq!(get("COUNT"), Some(AggregateValue::Count(3)));
}

#[test]
fn test_empty_period_aggregation() {
    let svc = service(speeds(&[(50.0, 600)]));
    let end = t0() + Duration::hours(1);

    for agg in ["AVG", "SUM", "MIN", "MAX"] {
        assert_eq!(
            svc.aggregated_reading(DEVICE, SPEED, t0(), end, agg).unwrap(),
            None,
            "{agg} over an empty period"
        );
    }
    assert_eq!(
        svc.aggregated_reading(DEVICE, SPEED, t0(), end, "COUNT").unwrap(),
        Some(AggregateValue::Count(0))
    );
}

#[test]
fn test_typed_aggregate_matches_keyword() {
    let svc = service(speeds(&[(5.0, 1), (15.0, 2)]));
    let end = t0() + Duration::hours(1);
    for agg in Aggregation::ALL {
        assert_eq!(
            svc.aggregate(DEVICE, SPEED, t0(), end, agg).unwrap(),
            svc.aggregated_reading(DEVICE, SPEED, t0(), end, agg.keyword()).unwrap()
        );
    }
}

#[test]
fn test_unsupported_aggregation_logs_warning() {
    let svc = service(speeds(&[(50.0, 10)]));
    let end = t0() + Duration::hours(1);

    let (result, logs) =
        capture_logs(|| svc.aggregated_reading(DEVICE, SPEED, t0(), end, "MEDIAN").unwrap());
    assert_eq!(result, None);
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("unsupported aggregation type"), "logs: {logs}");
    assert!(logs.contains("MEDIAN"), "logs: {logs}");
}

#[test]
fn test_lowercase_keyword_is_unsupported() {
    let svc = service(speeds(&[(50.0, 10)]));
    let end = t0() + Duration::hours(1);

    let (result, logs) =
        capture_logs(|| svc.aggregated_reading(DEVICE, SPEED, t0(), end, "avg").unwrap());
    assert_eq!(result, None);
    assert!(logs.contains("unsupported aggregation type"));
}

#[test]
fn test_unknown_type_logs_warning() {
    let svc = service(speeds(&[(50.0, 10)]));
    let unknown = DataPointTypeId(4242);
    let end = t0() + Duration::hours(1);

    let (result, logs) = capture_logs(|| svc.latest_reading(DEVICE, unknown).unwrap());
    assert!(result.is_none());
    assert!(logs.contains("WARN"));
    assert!(logs.contains("data point type not found"));
    assert!(logs.contains("4242"));

    let (readings, logs) =
        capture_logs(|| svc.readings_for_period(DEVICE, unknown, t0(), end).unwrap());
    assert!(readings.is_empty());
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("data point type not found"), "logs: {logs}");
    assert!(logs.contains("4242"), "logs: {logs}");

    let (avg, logs) =
        capture_logs(|| svc.aggregated_reading(DEVICE, unknown, t0(), end, "AVG").unwrap());
    assert_eq!(avg, None);
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("data point type not found"), "logs: {logs}");
    assert!(logs.contains("4242"), "logs: {logs}");
}

#[test]
fn test_composite_period_query_logs_warning() {
    let svc = service(vec![]);
    let end = t0() + Duration::hours(1);
    let (result, logs) =
        capture_logs(|| svc.aggregated_reading(DEVICE, FUEL, t0(), end, "COUNT").unwrap());
    assert_eq!(result, Some(AggregateValue::Count(0)));
    assert!(logs.contains("period query on composite type"));
}

// ============================================================================
// Bucketed aggregation
// ============================================================================

#[test]
fn test_hourly_buckets_share_reduction() {
    let svc = service(speeds(&[(10.0, 5), (20.0, 50), (40.0, 130), (60.0, 170)]));
    let end = t0() + Duration::hours(3);

    let points = svc
        .aggregated_buckets(DEVICE, SPEED, t0(), end, "AVG", Some(Bucket::Hour))
        .unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(points[0].bucket_start, t0());
    assert_eq!(points[0].value, Some(AggregateValue::Number(15.0)));
    assert_eq!(points[1].value, None);
    assert_eq!(points[2].value, Some(AggregateValue::Number(50.0)));
    assert_eq!(points[3].bucket_start, end);
    assert_eq!(points[3].value, None);

    // Single-window result equals the reduction over the same readings.
    let total = svc.aggregated_reading(DEVICE, SPEED, t0(), end, "SUM").unwrap();
    let bucket_sum: f64 = svc
        .aggregated_buckets(DEVICE, SPEED, t0(), end, "SUM", Some(Bucket::Hour))
        .unwrap()
        .iter()
        .filter_map(|p| p.value.map(|v| v.as_f64()))
        .sum();
    assert_eq!(total.map(|v| v.as_f64()), Some(bucket_sum));
}

#[test]
fn test_bucket_chosen_from_range_length() {
    let svc = service(speeds(&[(10.0, 5), (20.0, 60 * 30)]));

    let short = svc
        .aggregated_buckets(DEVICE, SPEED, t0(), t0() + Duration::hours(2), "COUNT", None)
        .unwrap();
    assert_eq!(short.len(), 3);
    assert_eq!(short[1].bucket_start - short[0].bucket_start, Duration::hours(1));

    let long = svc
        .aggregated_buckets(DEVICE, SPEED, t0(), t0() + Duration::hours(48), "COUNT", None)
        .unwrap();
    assert_eq!(long.len(), 3);
    assert_eq!(long[0].value, Some(AggregateValue::Count(1)));
    assert_eq!(long[1].value, Some(AggregateValue::Count(1)));
    assert_eq!(long[2].value, Some(AggregateValue::Count(0)));
}

#[test]
fn test_buckets_unsupported_or_composite_are_empty() {
    let svc = service(speeds(&[(10.0, 5)]));
    let end = t0() + Duration::hours(2);
    assert!(svc
        .aggregated_buckets(DEVICE, SPEED, t0(), end, "P95", Some(Bucket::Hour))
        .unwrap()
        .is_empty());
    assert!(svc
        .aggregated_buckets(DEVICE, FUEL, t0(), end, "AVG", Some(Bucket::Hour))
        .unwrap()
        .is_empty());
}

#[test]
fn test_oversized_bucket_range_is_rejected() {
    let svc = service(speeds(&[(10.0, 5)]));
    let two_centuries_ago = Utc.with_ymd_and_hms(1824, 1, 1, 0, 0, 0).unwrap();

    let err = svc
        .aggregated_buckets(DEVICE, SPEED, two_centuries_ago, t0(), "COUNT", Some(Bucket::Hour))
        .unwrap_err();
    assert_eq!(err.code(), 31);
    assert!(err.to_string().contains("at most 10000"), "{err}");

    let decade = svc
        .aggregated_buckets(
            DEVICE,
            SPEED,
            t0() - Duration::days(3650),
            t0(),
            "COUNT",
            Some(Bucket::Day),
        )
        .unwrap();
    assert_eq!(decade.len(), 3651);
}

#[test]
fn test_configured_hourly_threshold() {
    let svc = service(vec![]).with_hourly_bucket_max_hours(6);
    assert_eq!(svc.bucket_for_range(t0(), t0() + Duration::hours(6)), Bucket::Hour);
    assert_eq!(svc.bucket_for_range(t0(), t0() + Duration::hours(7)), Bucket::Day);
}
