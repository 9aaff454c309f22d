//! Chart series preparation.
//!
//! Turns a patient's measurements into two plot-ready series (weight and BMI
//! over time) with auto-scaled axis ranges. The projection is pure: rows that
//! cannot be plotted are dropped, and empty series fall back to fixed default
//! ranges so the chart is never left without a usable window.

use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::models::{self, Measurement};

/// One day in milliseconds.
const DAY_MS: i64 = 86_400_000;

/// Share of the data span added on each side of an axis.
const MARGIN_RATIO: f64 = 0.05;

/// Value axis used for an empty weight series (kg).
pub const DEFAULT_WEIGHT_RANGE: (f64, f64) = (0.0, 100.0);

/// Value axis used for an empty BMI series.
pub const DEFAULT_BMI_RANGE: (f64, f64) = (0.0, 40.0);

/// Anything that can be placed on the weight and BMI charts.
pub trait ChartSample {
    /// Calendar date of the sample, `None` if it cannot be determined.
    fn sample_date(&self) -> Option<NaiveDate>;
    fn weight_kg(&self) -> f64;
    fn bmi(&self) -> f64;
}

impl ChartSample for Measurement {
    fn sample_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    fn bmi(&self) -> f64 {
        self.bmi
    }
}

/// A sample whose date is still text, e.g. a row from an import or a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSample {
    /// ISO-8601 date (`YYYY-MM-DD`); a date-time is truncated to its date
    pub date: String,
    pub weight_kg: f64,
    pub bmi: f64,
}

impl ChartSample for RawSample {
    fn sample_date(&self) -> Option<NaiveDate> {
        models::parse_date(&self.date)
    }

    fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    fn bmi(&self) -> f64 {
        self.bmi
    }
}

/// A plotted point: milliseconds since the epoch and a value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Time and value bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub time_min_ms: i64,
    pub time_max_ms: i64,
    pub value_min: f64,
    pub value_max: f64,
}

/// A single chart series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    /// Points sorted by timestamp
    pub points: Vec<ChartPoint>,
    /// Observed extremes of `points`, `None` when empty
    pub extent: Option<Bounds>,
    /// Axis window to display
    pub range: Bounds,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Weight and BMI series of one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartProjection {
    pub weight: ChartSeries,
    pub bmi: ChartSeries,
}

impl ChartProjection {
    /// Serialize for the UI layer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Project samples using the local wall clock for the empty-series window.
pub fn project<S: ChartSample>(samples: &[S]) -> ChartProjection {
    project_at(samples, chrono::Local::now().naive_local())
}

/// Project samples; `now` anchors the default window of empty series.
pub fn project_at<S: ChartSample>(samples: &[S], now: NaiveDateTime) -> ChartProjection {
    let mut weight_points = Vec::with_capacity(samples.len());
    let mut bmi_points = Vec::with_capacity(samples.len());
    let mut skipped = 0usize;

    for sample in samples {
        let weight = sample.weight_kg();
        let bmi = sample.bmi();
        let date = match sample.sample_date() {
            Some(date) if is_plottable(weight) && is_plottable(bmi) => date,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let timestamp_ms = midnight_ms(date);
        weight_points.push(ChartPoint { timestamp_ms, value: weight });
        bmi_points.push(ChartPoint { timestamp_ms, value: bmi });
    }

    if skipped > 0 {
        tracing::debug!(skipped, plotted = weight_points.len(), "unplottable samples excluded");
    }

    ChartProjection {
        weight: build_series(weight_points, DEFAULT_WEIGHT_RANGE, now),
        bmi: build_series(bmi_points, DEFAULT_BMI_RANGE, now),
    }
}

/// Epoch milliseconds of midnight on `date`, read as UTC.
pub fn midnight_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

fn is_plottable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn build_series(
    mut points: Vec<ChartPoint>,
    default_values: (f64, f64),
    now: NaiveDateTime,
) -> ChartSeries {
    points.sort_by_key(|p| p.timestamp_ms);

    let Some(extent) = extent_of(&points) else {
        return ChartSeries {
            points,
            extent: None,
            range: default_range(default_values, now),
        };
    };

    let (time_min_ms, time_max_ms) = if extent.time_min_ms == extent.time_max_ms {
        (extent.time_min_ms - DAY_MS, extent.time_max_ms + DAY_MS)
    } else {
        let margin = ((extent.time_max_ms - extent.time_min_ms) as f64 * MARGIN_RATIO) as i64;
        (extent.time_min_ms - margin, extent.time_max_ms + margin)
    };

    ChartSeries {
        points,
        extent: Some(extent),
        range: Bounds {
            time_min_ms,
            time_max_ms,
            value_min: extent.value_min * (1.0 - MARGIN_RATIO),
            value_max: extent.value_max * (1.0 + MARGIN_RATIO),
        },
    }
}

/// Bounds of sorted points.
fn extent_of(points: &[ChartPoint]) -> Option<Bounds> {
    let first = points.first()?;
    let last = points.last()?;
    let (value_min, value_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.value), hi.max(p.value))
        });

    Some(Bounds {
        time_min_ms: first.timestamp_ms,
        time_max_ms: last.timestamp_ms,
        value_min,
        value_max,
    })
}

/// One month back to one day forward from `now`.
fn default_range((value_min, value_max): (f64, f64), now: NaiveDateTime) -> Bounds {
    let start = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let end = now.checked_add_signed(TimeDelta::days(1)).unwrap_or(now);
    Bounds {
        time_min_ms: start.and_utc().timestamp_millis(),
        time_max_ms: end.and_utc().timestamp_millis(),
        value_min,
        value_max,
    }
}
