// Time helpers for the summary panel and the recency visualization.
//
// Instants are carried as milliseconds since the Unix epoch (`i64`), which is
// what the interval math works on. `DateTime<Utc>` is only used at the edges
// (parsing API timestamps, formatting for display).
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Closed time span `[start_ms, end_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeInterval {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        TimeInterval { start_ms, end_ms }
    }

    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeInterval::new(start.timestamp_millis(), end.timestamp_millis())
    }

    pub fn is_inverted(&self) -> bool {
        self.start_ms > self.end_ms
    }
}

/// Merge overlapping intervals into a sorted list of disjoint spans.
///
/// - Intervals are sorted by start and swept once.
/// - An interval whose start is `<=` the current span's end is folded into
///   it, so spans that merely touch (`next.start == current.end`) merge.
/// - Inverted intervals (`start > end`) cover nothing and are dropped.
pub fn merge_intervals(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut sorted: Vec<TimeInterval> = intervals
        .iter()
        .copied()
        .filter(|i| {
            if i.is_inverted() {
                debug!(start = i.start_ms, end = i.end_ms, "dropping inverted interval");
                false
            } else {
                true
            }
        })
        .collect();
    sorted.sort_unstable_by_key(|i| i.start_ms);

    let mut merged: Vec<TimeInterval> = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };
    for interval in iter {
        if interval.start_ms <= current.end_ms {
            current.end_ms = current.end_ms.max(interval.end_ms);
        } else {
            merged.push(current);
            current = interval;
        }
    }
    merged.push(current);
    merged
}

/// Total seconds covered by the union of `intervals`; overlaps count once.
pub fn sum_non_overlapping_duration(intervals: &[TimeInterval]) -> f64 {
    let total_ms: i64 = merge_intervals(intervals)
        .iter()
        .map(|i| i.end_ms - i.start_ms)
        .sum();
    total_ms as f64 / 1000.0
}

/// `YYYY-MM-DD HH:MM:SS`, computed in UTC, no zone suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `"{h}h {m}min"` when at least an hour, else `"{m}min"`. Seconds are
/// dropped (floor division), never rounded up.
pub fn format_duration(duration_seconds: f64) -> String {
    let total = duration_seconds.max(0.0).floor() as i64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{}h {}min", hours, minutes)
    } else {
        format!("{}min", minutes)
    }
}

/// Approximate whole days between two instants: absolute difference over
/// 86_400_000 ms, rounded to nearest (half rounds up). Calendar effects such
/// as DST are ignored.
pub fn days_between(from_ms: i64, to_ms: i64) -> i64 {
    let diff = (from_ms - to_ms).abs() as f64;
    (diff / MS_PER_DAY as f64).round() as i64
}

/// Parse an API timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive ISO datetime
/// (`2024-11-18T01:04:00` with optional fraction) which is read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
