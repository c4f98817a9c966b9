//! Folding entries into per-period totals.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::Datelike;
use serde::Serialize;

use crate::models::{AggregatedPeriod, Category, Entry, normalize_meal_type};
use crate::series::{AxisFormat, format_axis_label};

/// Group key used when a `tag:<key>` grouping meets an entry without that tag.
pub const UNTAGGED: &str = "untagged";

/// Per-label totals in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Aggregation {
    periods: Vec<AggregatedPeriod>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Aggregation {
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&AggregatedPeriod> {
        self.index.get(label).map(|&i| &self.periods[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregatedPeriod> {
        self.periods.iter()
    }

    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.periods
            .iter()
            .map(|p| p.period_label.as_str())
            .collect()
    }

    /// Every field name seen across all periods, in first-seen order.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = Vec::new();
        for period in &self.periods {
            for field in period.totals.keys() {
                if !channels.contains(field) {
                    channels.push(field.clone());
                }
            }
        }
        channels
    }

    /// Sum of one field across every period.
    #[must_use]
    pub fn total(&self, field: &str) -> f64 {
        self.periods.iter().map(|p| p.total(field)).sum()
    }

    /// Number of entries folded into the aggregation.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.periods.iter().map(|p| p.count).sum()
    }

    #[must_use]
    pub fn into_periods(self) -> Vec<AggregatedPeriod> {
        self.periods
    }

    fn period_mut(&mut self, label: String) -> &mut AggregatedPeriod {
        let next = self.periods.len();
        let i = *self.index.entry(label.clone()).or_insert(next);
        if i == next {
            self.periods.push(AggregatedPeriod::new(label));
        }
        &mut self.periods[i]
    }
}

impl<'a> IntoIterator for &'a Aggregation {
    type Item = &'a AggregatedPeriod;
    type IntoIter = std::slice::Iter<'a, AggregatedPeriod>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}

/// Sum every numeric field of `entries`, grouped by the key `group_by`
/// returns for each entry.
///
/// Groups keep the order in which their first entry appeared. Fields an
/// entry does not carry contribute nothing, so they read as 0.
pub fn aggregate<'a, I, F>(entries: I, group_by: F) -> Aggregation
where
    I: IntoIterator<Item = &'a Entry>,
    F: Fn(&Entry) -> String,
{
    let mut aggregation = Aggregation::default();
    for entry in entries {
        aggregation.period_mut(group_by(entry)).absorb(entry);
    }
    tracing::debug!(
        periods = aggregation.len(),
        entries = aggregation.entry_count(),
        "aggregated entries"
    );
    aggregation
}

/// [`aggregate`] restricted to entries of one category.
pub fn aggregate_category<'a, I, F>(entries: I, category: Category, group_by: F) -> Aggregation
where
    I: IntoIterator<Item = &'a Entry>,
    F: Fn(&Entry) -> String,
{
    aggregate(
        entries.into_iter().filter(|e| e.category() == category),
        group_by,
    )
}

/// Built-in grouping keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBy {
    /// Calendar date, `YYYY-MM-DD`.
    Day,
    /// Short weekday name, `Mon`..`Sun`.
    Weekday,
    /// ISO week, `YYYY-Www`.
    Week,
    /// `YYYY-MM`.
    Month,
    /// One group per distinct timestamp, labelled `MMM dd HH:mm`.
    Reading,
    Category,
    /// The `meal` tag, normalized to a meal type.
    Meal,
    Tag(String),
}

impl GroupBy {
    #[must_use]
    pub fn key(&self, entry: &Entry) -> String {
        let ts = entry.timestamp();
        match self {
            GroupBy::Day => ts.format("%Y-%m-%d").to_string(),
            GroupBy::Weekday => format_axis_label(ts, AxisFormat::Weekday),
            GroupBy::Week => {
                let week = ts.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            GroupBy::Month => ts.format("%Y-%m").to_string(),
            GroupBy::Reading => format_axis_label(ts, AxisFormat::MonthDayTime),
            GroupBy::Category => entry.category().to_string(),
            GroupBy::Meal => normalize_meal_type(entry.tag("meal").unwrap_or_default()).to_string(),
            GroupBy::Tag(key) => entry.tag(key).unwrap_or(UNTAGGED).to_string(),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::Day => f.write_str("day"),
            GroupBy::Weekday => f.write_str("weekday"),
            GroupBy::Week => f.write_str("week"),
            GroupBy::Month => f.write_str("month"),
            GroupBy::Reading => f.write_str("reading"),
            GroupBy::Category => f.write_str("category"),
            GroupBy::Meal => f.write_str("meal"),
            GroupBy::Tag(key) => write!(f, "tag:{key}"),
        }
    }
}

impl FromStr for GroupBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(key) = s.strip_prefix("tag:") {
            if key.is_empty() {
                bail!("Tag grouping needs a key, e.g. 'tag:notes'");
            }
            return Ok(GroupBy::Tag(key.to_string()));
        }
        match s.to_lowercase().as_str() {
            "day" | "date" => Ok(GroupBy::Day),
            "weekday" | "dow" => Ok(GroupBy::Weekday),
            "week" => Ok(GroupBy::Week),
            "month" => Ok(GroupBy::Month),
            "reading" => Ok(GroupBy::Reading),
            "category" => Ok(GroupBy::Category),
            "meal" => Ok(GroupBy::Meal),
            _ => bail!(
                "Invalid grouping '{s}'. Use day, weekday, week, month, reading, category, meal or tag:<key>"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;

    fn entry(ts: &str, category: Category, values: &[(&str, f64)]) -> Entry {
        values.iter().fold(
            Entry::new(parse_timestamp(ts).unwrap(), category),
            |e, (field, v)| e.with_value(*field, *v),
        )
    }

    fn day_tagged(day: &str, steps: f64) -> Entry {
        entry("2024-03-11", Category::Workout, &[("steps", steps)]).with_tag("day", day)
    }

    #[test]
    fn test_aggregate_by_day_tag_example() {
        let entries = vec![
            day_tagged("Mon", 100.0),
            day_tagged("Mon", 50.0),
            day_tagged("Tue", 200.0),
        ];
        let agg = aggregate(&entries, |e| GroupBy::Tag("day".into()).key(e));

        assert_eq!(agg.labels(), vec!["Mon", "Tue"]);
        assert!((agg.get("Mon").unwrap().total("steps") - 150.0).abs() < f64::EPSILON);
        assert!((agg.get("Tue").unwrap().total("steps") - 200.0).abs() < f64::EPSILON);
        assert_eq!(agg.get("Mon").unwrap().count, 2);
    }

    #[test]
    fn test_aggregate_empty() {
        let entries: Vec<Entry> = Vec::new();
        let agg = aggregate(&entries, |e| GroupBy::Day.key(e));
        assert!(agg.is_empty());
        assert_eq!(agg.entry_count(), 0);
        assert!(agg.channels().is_empty());
    }

    #[test]
    fn test_aggregate_keeps_first_seen_order() {
        let entries = vec![
            entry("2024-03-17", Category::Workout, &[("duration", 40.0)]),
            entry("2024-03-11", Category::Workout, &[("duration", 32.0)]),
            entry("2024-03-17", Category::Workout, &[("duration", 10.0)]),
        ];
        let agg = aggregate(&entries, |e| GroupBy::Weekday.key(e));
        assert_eq!(agg.labels(), vec!["Sun", "Mon"]);
        assert!((agg.get("Sun").unwrap().total("duration") - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_missing_fields_default_to_zero() {
        let entries = vec![
            entry(
                "2024-06-01 07:30",
                Category::Glucose,
                &[("level", 110.0), ("insulin", 4.0)],
            ),
            entry("2024-06-01 12:00", Category::Glucose, &[("level", 145.0)]),
        ];
        let agg = aggregate(&entries, |e| GroupBy::Day.key(e));
        let day = agg.get("2024-06-01").unwrap();
        assert!((day.total("level") - 255.0).abs() < f64::EPSILON);
        assert!((day.total("insulin") - 4.0).abs() < f64::EPSILON);
        assert!(day.total("carbs").abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_duplicate_timestamps_both_summed() {
        let entries = vec![
            entry("2024-06-01 07:30", Category::Meal, &[("calories", 300.0)]),
            entry("2024-06-01 07:30", Category::Meal, &[("calories", 105.0)]),
        ];
        let agg = aggregate(&entries, |e| GroupBy::Reading.key(e));
        assert_eq!(agg.len(), 1);
        let reading = agg.get("Jun 01 07:30").unwrap();
        assert_eq!(reading.count, 2);
        assert!((reading.total("calories") - 405.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let entries = vec![
            entry("2024-03-11", Category::Workout, &[("steps", 8293.0)]),
            entry("2024-03-12", Category::Workout, &[("steps", 7105.0)]),
        ];
        let first = aggregate(&entries, |e| GroupBy::Day.key(e));
        let second = aggregate(&entries, |e| GroupBy::Day.key(e));
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_category_filters() {
        let entries = vec![
            entry("2024-03-11", Category::Workout, &[("duration", 32.0)]),
            entry("2024-03-11", Category::Meal, &[("calories", 555.0)]),
            entry("2024-03-12", Category::Workout, &[("duration", 65.0)]),
        ];
        let agg = aggregate_category(&entries, Category::Workout, |e| GroupBy::Day.key(e));
        assert_eq!(agg.entry_count(), 2);
        assert!((agg.total("duration") - 97.0).abs() < f64::EPSILON);
        assert!(agg.total("calories").abs() < f64::EPSILON);
    }

    #[test]
    fn test_channels_first_seen() {
        let entries = vec![
            entry("2024-03-11", Category::Workout, &[("steps", 1.0)]),
            entry(
                "2024-03-12",
                Category::Workout,
                &[("distance", 2.0), ("steps", 3.0)],
            ),
        ];
        let agg = aggregate(&entries, |e| GroupBy::Day.key(e));
        assert_eq!(agg.channels(), ["steps", "distance"]);
    }

    #[test]
    fn test_group_by_keys() {
        let e = entry("2024-03-11 06:30", Category::Meal, &[("calories", 1.0)])
            .with_tag("meal", "Lunch");
        assert_eq!(GroupBy::Day.key(&e), "2024-03-11");
        assert_eq!(GroupBy::Weekday.key(&e), "Mon");
        assert_eq!(GroupBy::Week.key(&e), "2024-W11");
        assert_eq!(GroupBy::Month.key(&e), "2024-03");
        assert_eq!(GroupBy::Reading.key(&e), "Mar 11 06:30");
        assert_eq!(GroupBy::Category.key(&e), "meal");
        assert_eq!(GroupBy::Meal.key(&e), "lunch");
        assert_eq!(GroupBy::Tag("notes".into()).key(&e), UNTAGGED);
    }

    #[test]
    fn test_group_by_meal_without_tag_is_snack() {
        let e = entry("2024-03-11", Category::Meal, &[("calories", 80.0)]);
        assert_eq!(GroupBy::Meal.key(&e), "snack");
    }

    #[test]
    fn test_group_by_parse() {
        assert_eq!("day".parse::<GroupBy>().unwrap(), GroupBy::Day);
        assert_eq!("Weekday".parse::<GroupBy>().unwrap(), GroupBy::Weekday);
        assert_eq!(
            "tag:notes".parse::<GroupBy>().unwrap(),
            GroupBy::Tag("notes".into())
        );
        assert!("tag:".parse::<GroupBy>().is_err());
        assert!("fortnight".parse::<GroupBy>().is_err());
    }

    #[test]
    fn test_group_by_display_round_trips_through_parse() {
        for g in [GroupBy::Week, GroupBy::Meal, GroupBy::Tag("day".into())] {
            assert_eq!(g.to_string().parse::<GroupBy>().unwrap(), g);
        }
    }

    #[test]
    fn test_aggregation_serializes_as_list() {
        let entries = vec![entry("2024-03-11", Category::Weight, &[("weight", 78.4)])];
        let agg = aggregate(&entries, |e| GroupBy::Day.key(e));
        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json[0]["period_label"], "2024-03-11");
        assert_eq!(json[0]["count"], 1);
        assert!((json[0]["totals"]["weight"].as_f64().unwrap() - 78.4).abs() < f64::EPSILON);
    }
}
