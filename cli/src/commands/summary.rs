use anyhow::Result;
use chrono::NaiveDate;
use std::process;
use tabled::{
    Table, Tabled,
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Columns},
};

use vitals_core::aggregate::{Aggregation, GroupBy, aggregate};
use vitals_core::models::{Category, Entry};

use super::helpers::{format_value, select_entries, truncate};

pub(crate) fn cmd_summary(
    entries: &[Entry],
    category: Option<Category>,
    group_by: &GroupBy,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let selected = select_entries(entries, category, date);
    let aggregation = aggregate(selected, |e| summary_key(category, group_by, e));

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregation)?);
        return Ok(());
    }

    if aggregation.is_empty() {
        eprintln!("No entries to summarize");
        process::exit(2);
    }

    let scope = category.map_or_else(|| "all categories".to_string(), |c| c.to_string());
    println!("=== {scope} by {group_by} ===\n");
    println!("{}", aggregation_table(&aggregation));

    Ok(())
}

/// Group key for `summary`. Without a category filter the category is part
/// of the key, so fields never sum across categories.
pub(crate) fn summary_key(category: Option<Category>, group_by: &GroupBy, e: &Entry) -> String {
    match (category, group_by) {
        (Some(_), _) | (None, GroupBy::Category) => group_by.key(e),
        (None, _) => format!("{}/{}", e.category(), group_by.key(e)),
    }
}

/// One row per period, one column per channel, plus the entry count.
pub(crate) fn aggregation_table(aggregation: &Aggregation) -> String {
    let channels = aggregation.channels();

    let mut builder = Builder::default();
    let mut header = vec!["Period".to_string(), "Entries".to_string()];
    header.extend(channels.iter().cloned());
    builder.push_record(header);

    for period in aggregation {
        let mut row = vec![period.period_label.clone(), period.count.to_string()];
        row.extend(channels.iter().map(|c| format_value(period.total(c))));
        builder.push_record(row);
    }

    builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string()
}

pub(crate) fn cmd_entries(
    entries: &[Entry],
    category: Option<Category>,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "Timestamp")]
        timestamp: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Values")]
        values: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let selected = select_entries(entries, category, date);

    if json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    if selected.is_empty() {
        eprintln!("No entries found");
        process::exit(2);
    }

    let rows: Vec<EntryRow> = selected
        .iter()
        .map(|e| EntryRow {
            timestamp: e.timestamp().format("%Y-%m-%d %H:%M").to_string(),
            category: e.category().to_string(),
            values: e
                .values()
                .iter()
                .map(|(k, v)| format!("{k}={}", format_value(*v)))
                .collect::<Vec<_>>()
                .join(" "),
            tags: truncate(
                &e.tags()
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(" "),
                40,
            ),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!("{} entries", selected.len());

    Ok(())
}
