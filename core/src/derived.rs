//! Ratios and statistics derived from totals: macro calorie split, time in
//! target range, and simple per-metric stats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::goal::percentage;
use crate::models::Entry;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSplit {
    pub protein_kcal: f64,
    pub carbs_kcal: f64,
    pub fat_kcal: f64,
    pub protein_pct: u8,
    pub carbs_pct: u8,
    pub fat_pct: u8,
}

/// Calories contributed by each macro in `totals` (`protein`, `carbs`,
/// `fat` grams) and each one's share of the macro calories.
#[must_use]
pub fn macro_split(totals: &BTreeMap<String, f64>) -> MacroSplit {
    let grams = |field: &str| totals.get(field).copied().unwrap_or(0.0).max(0.0);
    let protein_kcal = grams("protein") * KCAL_PER_G_PROTEIN;
    let carbs_kcal = grams("carbs") * KCAL_PER_G_CARBS;
    let fat_kcal = grams("fat") * KCAL_PER_G_FAT;
    let total = protein_kcal + carbs_kcal + fat_kcal;
    MacroSplit {
        protein_kcal,
        carbs_kcal,
        fat_kcal,
        protein_pct: percentage(protein_kcal, total),
        carbs_pct: percentage(carbs_kcal, total),
        fat_pct: percentage(fat_kcal, total),
    }
}

/// Inclusive target band for a reading, e.g. blood glucose in mg/dL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRange {
    pub low: f64,
    pub high: f64,
}

impl TargetRange {
    pub const GLUCOSE_MG_DL: TargetRange = TargetRange {
        low: 70.0,
        high: 140.0,
    };
}

impl Default for TargetRange {
    fn default() -> Self {
        Self::GLUCOSE_MG_DL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeBreakdown {
    pub count: usize,
    pub below: usize,
    pub in_range: usize,
    pub above: usize,
    pub below_pct: u8,
    pub in_range_pct: u8,
    pub above_pct: u8,
}

/// Classify readings against `range` and report each band's share.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn range_breakdown<I>(readings: I, range: TargetRange) -> RangeBreakdown
where
    I: IntoIterator<Item = f64>,
{
    let (mut below, mut in_range, mut above) = (0usize, 0usize, 0usize);
    for value in readings {
        if value < range.low {
            below += 1;
        } else if value > range.high {
            above += 1;
        } else {
            in_range += 1;
        }
    }
    let count = below + in_range + above;
    let share = |n: usize| percentage(n as f64, count as f64);
    RangeBreakdown {
        count,
        below,
        in_range,
        above,
        below_pct: share(below),
        in_range_pct: share(in_range),
        above_pct: share(above),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub metric: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Count, min, max and mean of `metric` over the entries that carry it.
/// Returns `None` when no entry has the field.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn metric_stats<'a, I>(entries: I, metric: &str) -> Option<MetricStats>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let values: Vec<f64> = entries
        .into_iter()
        .filter(|e| e.has_value(metric))
        .map(|e| e.value(metric))
        .collect();
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(MetricStats {
        metric: metric.to_string(),
        count: values.len(),
        min,
        max,
        mean,
    })
}
