use anyhow::{Result, bail};
use chrono::NaiveDate;
use tabled::{
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Columns},
};

use vitals_core::aggregate::{Aggregation, GroupBy, aggregate};
use vitals_core::models::{Category, Entry};
use vitals_core::series::{SeriesPoint, to_series};

use super::helpers::{format_value, select_entries};

pub(crate) fn cmd_series(
    entries: &[Entry],
    category: Option<Category>,
    group_by: &GroupBy,
    labels: &[String],
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    if labels.is_empty() {
        bail!("No labels to lay the series out on");
    }
    if category.is_none() && *group_by != GroupBy::Category {
        bail!("A series needs --category unless it is grouped by category");
    }

    let selected = select_entries(entries, category, date);
    let aggregation = aggregate(selected, |e| group_by.key(e));
    let series = to_series(&aggregation, labels);

    let dropped = dropped_periods(&aggregation, labels);
    if dropped > 0 {
        tracing::warn!(dropped, "periods outside the label list were left out");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        println!("{}", series_table(&series));
    }

    Ok(())
}

/// Number of aggregated periods whose label is not on the axis.
pub(crate) fn dropped_periods(aggregation: &Aggregation, labels: &[String]) -> usize {
    aggregation
        .labels()
        .into_iter()
        .filter(|l| !labels.iter().any(|x| x == l))
        .count()
}

pub(crate) fn series_table(series: &[SeriesPoint]) -> String {
    let channels: Vec<&String> = series
        .first()
        .map(|p| p.channels.keys().collect())
        .unwrap_or_default();

    let mut builder = Builder::default();
    let mut header = vec!["Label".to_string()];
    header.extend(channels.iter().map(|c| (*c).clone()));
    builder.push_record(header);

    for point in series {
        let mut row = vec![point.label.clone()];
        row.extend(channels.iter().map(|c| format_value(point.value(c))));
        builder.push_record(row);
    }

    builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string()
}
