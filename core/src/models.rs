use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// What kind of fact an [`Entry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Glucose,
    Meal,
    Workout,
    Weight,
    BloodPressure,
    Medication,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Glucose,
        Category::Meal,
        Category::Workout,
        Category::Weight,
        Category::BloodPressure,
        Category::Medication,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Glucose => "glucose",
            Category::Meal => "meal",
            Category::Workout => "workout",
            Category::Weight => "weight",
            Category::BloodPressure => "bloodPressure",
            Category::Medication => "medication",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "glucose" => Ok(Category::Glucose),
            "meal" | "meals" | "nutrition" => Ok(Category::Meal),
            "workout" | "workouts" => Ok(Category::Workout),
            "weight" => Ok(Category::Weight),
            "bloodpressure" | "blood-pressure" | "blood_pressure" | "bp" => {
                Ok(Category::BloodPressure)
            }
            "medication" | "medications" | "pills" => Ok(Category::Medication),
            _ => bail!(
                "Invalid category '{s}'. Must be one of: {}",
                Category::ALL.map(Category::as_str).join(", ")
            ),
        }
    }
}

/// A single logged health or fitness fact.
///
/// Entries are immutable: once built, only read accessors are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default = "new_entry_id")]
    id: String,
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    timestamp: NaiveDateTime,
    category: Category,
    #[serde(default, deserialize_with = "deserialize_values")]
    values: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
}

impl Entry {
    #[must_use]
    pub fn new(timestamp: NaiveDateTime, category: Category) -> Self {
        Self {
            id: new_entry_id(),
            timestamp,
            category,
            values: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a numeric field. Non-finite values are stored as 0.
    #[must_use]
    pub fn with_value(mut self, field: impl Into<String>, value: f64) -> Self {
        let field = field.into();
        let value = finite_or_zero(&field, value);
        self.values.insert(field, value);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    /// Value of a numeric field, 0 when the entry does not carry it.
    #[must_use]
    pub fn value(&self, field: &str) -> f64 {
        self.values.get(field).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn has_value(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Summed numeric fields for one group of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedPeriod {
    pub period_label: String,
    pub totals: BTreeMap<String, f64>,
    pub count: usize,
}

impl AggregatedPeriod {
    #[must_use]
    pub fn new(period_label: impl Into<String>) -> Self {
        Self {
            period_label: period_label.into(),
            totals: BTreeMap::new(),
            count: 0,
        }
    }

    /// Total for a field, 0 when no entry in the period carried it.
    #[must_use]
    pub fn total(&self, field: &str) -> f64 {
        self.totals.get(field).copied().unwrap_or(0.0)
    }

    pub(crate) fn absorb(&mut self, entry: &Entry) {
        for (field, value) in entry.values() {
            *self.totals.entry(field.clone()).or_insert(0.0) += value;
        }
        self.count += 1;
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a timestamp as written by a user or an export.
///
/// Accepts RFC 3339 (the wall-clock time of the given offset is kept),
/// `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD HH:MM[:SS]` and a bare `YYYY-MM-DD`
/// (midnight).
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_local());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight);
    }
    bail!("Invalid timestamp '{s}'. Use YYYY-MM-DD, YYYY-MM-DD HH:MM or RFC 3339")
}

fn serialize_timestamp<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_values<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, f64>, D::Error> {
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(field, value)| {
            let number = coerce_json_number(&field, &value);
            (field, number)
        })
        .collect())
}

/// Read a JSON value as a number. Numeric strings are parsed; anything else
/// is coerced to 0.
#[must_use]
pub fn coerce_json_number(field: &str, value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map_or(0.0, |v| finite_or_zero(field, v)),
        serde_json::Value::String(s) => coerce_str_number(field, s),
        other => {
            tracing::warn!(field, value = %other, "non-numeric value coerced to 0");
            0.0
        }
    }
}

/// Parse a text cell as a number, coercing anything malformed to 0.
#[must_use]
pub fn coerce_str_number(field: &str, raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) => finite_or_zero(field, v),
        Err(_) => {
            tracing::warn!(field, value = raw, "non-numeric value coerced to 0");
            0.0
        }
    }
}

fn finite_or_zero(field: &str, value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        tracing::warn!(field, value, "non-finite value coerced to 0");
        0.0
    }
}

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

/// Map a free-form meal name onto one of [`MEAL_TYPES`]; anything
/// unrecognised counts as a snack.
#[must_use]
pub fn normalize_meal_type(meal: &str) -> &'static str {
    match meal.trim().to_lowercase().as_str() {
        "breakfast" => "breakfast",
        "lunch" => "lunch",
        "dinner" => "dinner",
        _ => "snack",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_category_parse_aliases() {
        assert_eq!("glucose".parse::<Category>().unwrap(), Category::Glucose);
        assert_eq!("Meals".parse::<Category>().unwrap(), Category::Meal);
        assert_eq!(
            "bloodPressure".parse::<Category>().unwrap(),
            Category::BloodPressure
        );
        assert_eq!(
            "blood-pressure".parse::<Category>().unwrap(),
            Category::BloodPressure
        );
        assert_eq!("pills".parse::<Category>().unwrap(), Category::Medication);
    }

    #[test]
    fn test_category_parse_invalid() {
        let err = "sleep".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("bloodPressure"));
    }

    #[test]
    fn test_category_serializes_camel_case() {
        let json = serde_json::to_string(&Category::BloodPressure).unwrap();
        assert_eq!(json, "\"bloodPressure\"");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap();
        assert_eq!(ts("2024-06-01 07:30"), expected);
        assert_eq!(ts("2024-06-01T07:30"), expected);
        assert_eq!(ts("2024-06-01T07:30:00"), expected);
        assert_eq!(ts("2024-06-01T07:30:00+02:00"), expected);
        assert_eq!(
            ts("2024-06-01").time(),
            chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("June 1st").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_entry_builder_and_accessors() {
        let entry = Entry::new(ts("2024-06-01 07:30"), Category::Glucose)
            .with_id("r1")
            .with_value("level", 110.0)
            .with_value("insulin", 4.0)
            .with_tag("notes", "Before breakfast");

        assert_eq!(entry.id(), "r1");
        assert_eq!(entry.category(), Category::Glucose);
        assert_eq!(entry.date(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!((entry.value("level") - 110.0).abs() < f64::EPSILON);
        assert!(entry.value("carbs").abs() < f64::EPSILON);
        assert!(!entry.has_value("carbs"));
        assert_eq!(entry.tag("notes"), Some("Before breakfast"));
    }

    #[test]
    fn test_entry_generates_distinct_ids() {
        let a = Entry::new(ts("2024-06-01"), Category::Weight);
        let b = Entry::new(ts("2024-06-01"), Category::Weight);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_with_value_non_finite_stored_as_zero() {
        let entry = Entry::new(ts("2024-06-01"), Category::Workout)
            .with_value("duration", f64::NAN)
            .with_value("distance", f64::INFINITY);
        assert!(entry.value("duration").abs() < f64::EPSILON);
        assert!(entry.value("distance").abs() < f64::EPSILON);
    }

    #[test]
    fn test_entry_json_coerces_bad_values() {
        let json = r#"{
            "id": "bp-1",
            "timestamp": "2024-06-01 08:00",
            "category": "bloodPressure",
            "values": {"systolic": "120", "diastolic": "eighty", "pulse": null, "spo2": 97}
        }"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.category(), Category::BloodPressure);
        assert!((entry.value("systolic") - 120.0).abs() < f64::EPSILON);
        assert!(entry.value("diastolic").abs() < f64::EPSILON);
        assert!(entry.has_value("pulse"));
        assert!(entry.value("pulse").abs() < f64::EPSILON);
        assert!((entry.value("spo2") - 97.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_entry_json_defaults() {
        let json = r#"{"timestamp": "2024-03-11", "category": "workout"}"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert!(!entry.id().is_empty());
        assert!(entry.values().is_empty());
        assert!(entry.tags().is_empty());
    }

    #[test]
    fn test_entry_json_rejects_bad_timestamp() {
        let json = r#"{"timestamp": "yesterday-ish", "category": "meal"}"#;
        assert!(serde_json::from_str::<Entry>(json).is_err());
    }

    #[test]
    fn test_entry_serializes_timestamp_and_skips_empty_tags() {
        let entry = Entry::new(ts("2024-03-11 06:30"), Category::Workout)
            .with_id("w1")
            .with_value("duration", 32.0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], "2024-03-11T06:30:00");
        assert_eq!(json["category"], "workout");
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn test_aggregated_period_absorb() {
        let mut period = AggregatedPeriod::new("Mon");
        let e1 = Entry::new(ts("2024-03-11"), Category::Workout).with_value("steps", 100.0);
        let e2 = Entry::new(ts("2024-03-11"), Category::Workout)
            .with_value("steps", 50.0)
            .with_value("duration", 30.0);
        period.absorb(&e1);
        period.absorb(&e2);
        assert_eq!(period.count, 2);
        assert!((period.total("steps") - 150.0).abs() < f64::EPSILON);
        assert!((period.total("duration") - 30.0).abs() < f64::EPSILON);
        assert!(period.total("distance").abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_meal_type() {
        assert_eq!(normalize_meal_type("Breakfast"), "breakfast");
        assert_eq!(normalize_meal_type(" LUNCH "), "lunch");
        assert_eq!(normalize_meal_type("Snacks"), "snack");
        assert_eq!(normalize_meal_type("Morning Snack"), "snack");
    }

    #[test]
    fn test_coerce_str_number() {
        assert!((coerce_str_number("steps", " 8293 ") - 8293.0).abs() < f64::EPSILON);
        assert!(coerce_str_number("steps", "n/a").abs() < f64::EPSILON);
        assert!(coerce_str_number("steps", "NaN").abs() < f64::EPSILON);
    }
}
