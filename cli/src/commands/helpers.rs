use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};

use vitals_core::models::{Category, Entry, MEAL_TYPES};
use vitals_core::series::{WEEKDAY_LABELS, day_labels};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Keep the entries matching an optional category and an optional day.
pub(crate) fn select_entries<'a>(
    entries: &'a [Entry],
    category: Option<Category>,
    date: Option<NaiveDate>,
) -> Vec<&'a Entry> {
    entries
        .iter()
        .filter(|e| category.is_none_or(|c| e.category() == c))
        .filter(|e| date.is_none_or(|d| e.date() == d))
        .collect()
}

pub(crate) fn parse_category(category: Option<&str>) -> Result<Option<Category>> {
    category.map(str::parse::<Category>).transpose()
}

/// Resolve a label list for a chart axis.
///
/// Accepts `weekdays`, `meals`, `last:N` (the N days ending at `today`) or a
/// comma-separated list.
pub(crate) fn parse_labels(input: &str, today: NaiveDate) -> Result<Vec<String>> {
    let input = input.trim();
    if let Some(days) = input.strip_prefix("last:") {
        let days: u32 = days
            .parse()
            .with_context(|| format!("Invalid day count in '{input}'"))?;
        if days == 0 {
            bail!("Day count must be greater than 0");
        }
        return Ok(day_labels(today, days));
    }
    match input.to_lowercase().as_str() {
        "weekdays" | "week" => Ok(WEEKDAY_LABELS.iter().map(ToString::to_string).collect()),
        "meals" => Ok(MEAL_TYPES.iter().map(ToString::to_string).collect()),
        "" => bail!("Label list must not be empty"),
        _ => Ok(input
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect()),
    }
}

/// Render a number for a table cell: whole numbers without decimals,
/// anything else with one.
pub(crate) fn format_value(v: f64) -> String {
    let v = no_neg_zero(v);
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
