use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use vitals_core::aggregate::aggregate;
use vitals_core::derived::macro_split;
use vitals_core::goal::{GoalPeriod, GoalProgress, GoalStatus, GoalTarget, Reduction};
use vitals_core::models::{Category, Entry};

use super::helpers::{format_value, select_entries};

const BAR_WIDTH: usize = 20;

#[derive(Serialize)]
struct TargetProgress<'a> {
    category: Category,
    period: GoalPeriod,
    reduce: Reduction,
    #[serde(flatten)]
    progress: &'a GoalProgress,
}

/// Measure every target over its window ending on `anchor`.
pub(crate) fn measure_targets<'t>(
    entries: &[Entry],
    targets: &'t [GoalTarget],
    anchor: NaiveDate,
) -> Vec<(&'t GoalTarget, GoalProgress)> {
    targets
        .iter()
        .map(|t| (t, t.measure(entries, anchor).progress()))
        .collect()
}

fn window_label(target: &GoalTarget) -> String {
    match target.reduce {
        Reduction::Sum => target.period.to_string(),
        Reduction::DailyMean => format!("{} (daily avg)", target.period),
    }
}

pub(crate) fn cmd_progress(
    entries: &[Entry],
    configured: &[GoalTarget],
    single: Option<GoalTarget>,
    anchor: NaiveDate,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct ProgressRow {
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Metric")]
        metric: String,
        #[tabled(rename = "Window")]
        window: String,
        #[tabled(rename = "Current")]
        current: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "%")]
        percentage: String,
        #[tabled(rename = "Progress")]
        bar: String,
    }

    let targets = match single {
        Some(t) => vec![t],
        None => configured.to_vec(),
    };
    if targets.is_empty() {
        bail!("No goals configured");
    }

    let measured = measure_targets(entries, &targets, anchor);

    if json {
        let out: Vec<TargetProgress> = measured
            .iter()
            .map(|(target, progress)| TargetProgress {
                category: target.category,
                period: target.period,
                reduce: target.reduce,
                progress,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let rows: Vec<ProgressRow> = measured
        .iter()
        .map(|(target, p)| ProgressRow {
            category: target.category.to_string(),
            metric: p.metric.clone(),
            window: window_label(target),
            current: format_value(p.current),
            target: format_value(p.target),
            percentage: match p.status {
                GoalStatus::Over => format!("{}% (over)", p.raw_percentage),
                _ => format!("{}%", p.percentage),
            },
            bar: progress_bar(p.percentage),
        })
        .collect();

    println!("=== Goals for {anchor} ===\n");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

/// Fixed-width text progress bar for a clamped percentage.
pub(crate) fn progress_bar(pct: u8) -> String {
    let filled = usize::from(pct.min(100)) * BAR_WIDTH / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub(crate) fn cmd_macros(entries: &[Entry], date: NaiveDate, json: bool) -> Result<()> {
    let selected = select_entries(entries, Some(Category::Meal), Some(date));
    let aggregation = aggregate(selected, |_| "total".to_string());

    let Some(period) = aggregation.get("total") else {
        eprintln!("No meal entries found for {date}");
        process::exit(2);
    };
    let split = macro_split(&period.totals);

    if json {
        println!("{}", serde_json::to_string_pretty(&split)?);
        return Ok(());
    }

    let calories = period.total("calories");
    let count = period.count;
    let kcal = format_value(calories);
    println!("  CALORIES: {kcal} kcal from {count} entries");
    let pk = format_value(split.protein_kcal);
    let ck = format_value(split.carbs_kcal);
    let fk = format_value(split.fat_kcal);
    println!("  PROTEIN:  {pk} kcal ({}%)", split.protein_pct);
    println!("  CARBS:    {ck} kcal ({}%)", split.carbs_pct);
    println!("  FAT:      {fk} kcal ({}%)", split.fat_pct);

    Ok(())
}
