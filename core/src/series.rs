//! Chart-ready series built from an [`Aggregation`].

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::aggregate::Aggregation;

pub const WEEKDAY_LABELS: &[&str] = &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// One point on a chart: an axis label plus named numeric channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    #[serde(flatten)]
    pub channels: BTreeMap<String, f64>,
}

impl SeriesPoint {
    #[must_use]
    pub fn value(&self, channel: &str) -> f64 {
        self.channels.get(channel).copied().unwrap_or(0.0)
    }
}

/// Lay an aggregation out along `labels`, one point per label.
///
/// Labels missing from the aggregation get a point with every channel at 0,
/// so the output always has `labels.len()` points. Aggregated labels that
/// are not in `labels` are left out.
pub fn to_series<S: AsRef<str>>(aggregation: &Aggregation, labels: &[S]) -> Vec<SeriesPoint> {
    let channels = aggregation.channels();
    labels
        .iter()
        .map(|label| {
            let label = label.as_ref();
            let period = aggregation.get(label);
            let values = channels
                .iter()
                .map(|c| (c.clone(), period.map_or(0.0, |p| p.total(c))))
                .collect();
            SeriesPoint {
                label: label.to_string(),
                channels: values,
            }
        })
        .collect()
}

/// The `days` calendar dates ending at `end`, oldest first, as `YYYY-MM-DD`.
#[must_use]
pub fn day_labels(end: NaiveDate, days: u32) -> Vec<String> {
    (0..days)
        .rev()
        .map(|i| end - Duration::days(i64::from(i)))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect()
}

/// Axis label styles used by the dashboard charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisFormat {
    /// `Jun 01 07:30`
    MonthDayTime,
    /// `Jun 01`
    MonthDay,
    /// `7:30 AM`
    Time12h,
    /// `Mon`
    Weekday,
}

impl AxisFormat {
    fn pattern(self) -> &'static str {
        match self {
            AxisFormat::MonthDayTime => "%b %d %H:%M",
            AxisFormat::MonthDay => "%b %d",
            AxisFormat::Time12h => "%-I:%M %p",
            AxisFormat::Weekday => "%a",
        }
    }
}

#[must_use]
pub fn format_axis_label(ts: NaiveDateTime, format: AxisFormat) -> String {
    ts.format(format.pattern()).to_string()
}
