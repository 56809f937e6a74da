//! Time-window selection and aggregation of temperature/humidity history for
//! the dashboard charts and the data export.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::HistoryReading;

// ---------------------------------------------------------------------------
// TimeRange
// ---------------------------------------------------------------------------

/// Window selectable from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Day,
    Week,
    Month,
}

impl TimeRange {
    /// Unknown or missing values fall back to the last 24 hours.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("7d") => Self::Week,
            Some("30d") => Self::Month,
            _ => Self::Day,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            TimeRange::Day => Duration::hours(24),
            TimeRange::Week => Duration::days(7),
            TimeRange::Month => Duration::days(30),
        }
    }

    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }

    /// Chart label for an hour bucket.
    fn label(self, hour: DateTime<Utc>) -> String {
        match self {
            TimeRange::Day => hour.format("%H:00").to_string(),
            TimeRange::Week | TimeRange::Month => hour.format("%d/%m %Hh").to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// One hour of averaged readings.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HourlyPoint {
    pub time: String,
    /// Start of the hour (UTC).
    pub timestamp: DateTime<Utc>,
    /// Average over every temperature sensor, two decimals. Absent when the
    /// hour holds no temperature reading.
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub temperature_count: usize,
    pub humidity_count: usize,
}

/// One exported row: every reading sharing an exact timestamp, averaged.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExportRow {
    pub timestamp: DateTime<Utc>,
    pub time: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Default)]
struct Bucket {
    temperature_sum: f64,
    temperature_count: usize,
    humidity_sum: f64,
    humidity_count: usize,
}

impl Bucket {
    fn temperature(&self) -> Option<f64> {
        average(self.temperature_sum, self.temperature_count)
    }

    fn humidity(&self) -> Option<f64> {
        average(self.humidity_sum, self.humidity_count)
    }
}

fn average(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| round2(sum / count as f64))
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::hours(1)).unwrap_or(t)
}

/// Group readings by `key`, accumulating sums and counts per group.
/// `BTreeMap` keeps the groups in chronological order.
fn group_by(
    temperatures: &[HistoryReading],
    humidities: &[HistoryReading],
    key: impl Fn(DateTime<Utc>) -> DateTime<Utc>,
) -> BTreeMap<DateTime<Utc>, Bucket> {
    let mut buckets: BTreeMap<DateTime<Utc>, Bucket> = BTreeMap::new();

    for r in temperatures {
        let b = buckets.entry(key(r.recorded_at)).or_default();
        b.temperature_sum += r.value;
        b.temperature_count += 1;
    }
    for r in humidities {
        let b = buckets.entry(key(r.recorded_at)).or_default();
        b.humidity_sum += r.value;
        b.humidity_count += 1;
    }

    buckets
}

/// Average readings per UTC hour, ascending.
pub fn hourly_averages(
    range: TimeRange,
    temperatures: &[HistoryReading],
    humidities: &[HistoryReading],
) -> Vec<HourlyPoint> {
    group_by(temperatures, humidities, truncate_to_hour)
        .into_iter()
        .map(|(hour, b)| HourlyPoint {
            time: range.label(hour),
            timestamp: hour,
            temperature: b.temperature(),
            humidity: b.humidity(),
            temperature_count: b.temperature_count,
            humidity_count: b.humidity_count,
        })
        .collect()
}

/// Merge both series on exact timestamps, ascending.
pub fn combine_by_timestamp(
    temperatures: &[HistoryReading],
    humidities: &[HistoryReading],
) -> Vec<ExportRow> {
    group_by(temperatures, humidities, |t| t)
        .into_iter()
        .map(|(ts, b)| ExportRow {
            timestamp: ts,
            time: ts.format("%d/%m/%Y %H:%M:%S").to_string(),
            temperature: b.temperature(),
            humidity: b.humidity(),
        })
        .collect()
}

pub const CSV_HEADER: &str = "Date,Time,Temperature (°C),Humidity (%)";

/// Render export rows as CSV. Absent values become empty cells.
pub fn to_csv(rows: &[ExportRow]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + rows.len() * 32);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{}\n",
            row.timestamp.format("%d/%m/%Y"),
            row.timestamp.format("%H:%M:%S"),
            cell(row.temperature),
            cell(row.humidity),
        ));
    }
    out
}

fn cell(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}
