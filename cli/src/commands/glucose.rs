use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use std::process;

use vitals_core::derived::{
    MetricStats, RangeBreakdown, TargetRange, metric_stats, range_breakdown,
};
use vitals_core::models::{Category, Entry};

use super::helpers::{format_value, select_entries};

const LEVEL: &str = "level";

#[derive(Debug, Serialize)]
struct GlucoseReport {
    range: TargetRange,
    breakdown: RangeBreakdown,
    stats: MetricStats,
}

/// Apply `--low`/`--high` overrides on top of the configured range.
pub(crate) fn resolve_range(
    configured: TargetRange,
    low: Option<f64>,
    high: Option<f64>,
) -> Result<TargetRange> {
    let range = TargetRange {
        low: low.unwrap_or(configured.low),
        high: high.unwrap_or(configured.high),
    };
    if !range.low.is_finite() || !range.high.is_finite() {
        bail!("Range bounds must be finite numbers");
    }
    if range.low > range.high {
        bail!(
            "Low bound ({}) must not exceed high bound ({})",
            format_value(range.low),
            format_value(range.high)
        );
    }
    Ok(range)
}

pub(crate) fn cmd_glucose(
    entries: &[Entry],
    range: TargetRange,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let readings = select_entries(entries, Some(Category::Glucose), date);

    let Some(stats) = metric_stats(readings.iter().copied(), LEVEL) else {
        eprintln!("No glucose readings found");
        process::exit(2);
    };
    let breakdown = range_breakdown(
        readings
            .iter()
            .filter(|e| e.has_value(LEVEL))
            .map(|e| e.value(LEVEL)),
        range,
    );

    if json {
        let report = GlucoseReport {
            range,
            breakdown,
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let low = format_value(range.low);
    let high = format_value(range.high);
    let count = stats.count;
    println!("=== Glucose ({count} readings, target {low}-{high}) ===\n");
    let min = format_value(stats.min);
    let max = format_value(stats.max);
    let mean = format_value(stats.mean);
    println!("  Min {min}  Max {max}  Mean {mean}");
    println!();
    let b = &breakdown;
    println!("  Below range: {:>4} ({}%)", b.below, b.below_pct);
    println!("  In range:    {:>4} ({}%)", b.in_range, b.in_range_pct);
    println!("  Above range: {:>4} ({}%)", b.above, b.above_pct);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_range_defaults() {
        let range = resolve_range(TargetRange::GLUCOSE_MG_DL, None, None).unwrap();
        assert_eq!(range, TargetRange::GLUCOSE_MG_DL);
    }

    #[test]
    fn test_resolve_range_partial_override() {
        let range = resolve_range(TargetRange::GLUCOSE_MG_DL, Some(80.0), None).unwrap();
        assert!((range.low - 80.0).abs() < f64::EPSILON);
        assert!((range.high - 140.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_range_rejects_inverted_bounds() {
        let err = resolve_range(TargetRange::GLUCOSE_MG_DL, Some(150.0), None).unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
        assert!(resolve_range(TargetRange::GLUCOSE_MG_DL, Some(f64::NAN), None).is_err());
    }
}
