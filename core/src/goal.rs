use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregation, GroupBy, aggregate_category};
use crate::models::{Category, Entry};

/// Progress-bar percentage of `current` against `target`, in `0..=100`.
///
/// A target of zero or below has no meaningful progress and yields 0.
#[must_use]
pub fn percentage(current: f64, target: f64) -> u8 {
    raw_percentage(current, target).min(100) as u8
}

/// Rounded percentage of `current` against `target` without the upper
/// clamp, so callers can tell how far past the goal a value is.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn raw_percentage(current: f64, target: f64) -> u32 {
    if !target.is_finite() || target <= 0.0 || !current.is_finite() {
        return 0;
    }
    let pct = (current / target * 100.0).round();
    if pct <= 0.0 {
        0
    } else if pct >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        pct as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Under,
    Reached,
    Over,
}

impl GoalStatus {
    #[must_use]
    pub fn classify(current: f64, target: f64) -> Self {
        match raw_percentage(current, target) {
            0..=99 => GoalStatus::Under,
            100 => GoalStatus::Reached,
            _ => GoalStatus::Over,
        }
    }
}

/// A target for one metric, with `current` derived from an aggregation.
/// `current` is only ever set by the `measure*` constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    metric: String,
    target: f64,
    current: f64,
}

impl Goal {
    /// Measure `metric` against `target`, summing it across every period of
    /// `aggregation`.
    #[must_use]
    pub fn measure(metric: impl Into<String>, target: f64, aggregation: &Aggregation) -> Self {
        let metric = metric.into();
        let current = aggregation.total(&metric);
        Self {
            metric,
            target,
            current,
        }
    }

    /// Measure `metric` in a single period; a missing period counts as 0.
    #[must_use]
    pub fn measure_period(
        metric: impl Into<String>,
        target: f64,
        aggregation: &Aggregation,
        label: &str,
    ) -> Self {
        let metric = metric.into();
        let current = aggregation.get(label).map_or(0.0, |p| p.total(&metric));
        Self {
            metric,
            target,
            current,
        }
    }

    /// Measure the mean of `metric` per period of `aggregation`. An empty
    /// aggregation counts as 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn measure_mean(
        metric: impl Into<String>,
        target: f64,
        aggregation: &Aggregation,
    ) -> Self {
        let metric = metric.into();
        let current = if aggregation.is_empty() {
            0.0
        } else {
            aggregation.total(&metric) / aggregation.len() as f64
        };
        Self {
            metric,
            target,
            current,
        }
    }

    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    #[must_use]
    pub fn current(&self) -> f64 {
        self.current
    }

    #[must_use]
    pub fn progress(&self) -> GoalProgress {
        GoalProgress {
            metric: self.metric.clone(),
            target: self.target,
            current: self.current,
            percentage: percentage(self.current, self.target),
            raw_percentage: raw_percentage(self.current, self.target),
            status: GoalStatus::classify(self.current, self.target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub metric: String,
    pub target: f64,
    pub current: f64,
    pub percentage: u8,
    pub raw_percentage: u32,
    pub status: GoalStatus,
}

/// The window of days a target is measured over, ending on an anchor date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    /// The anchor date alone.
    #[default]
    Day,
    /// The seven days ending on the anchor date.
    Week,
}

impl GoalPeriod {
    #[must_use]
    pub fn days(self) -> u32 {
        match self {
            GoalPeriod::Day => 1,
            GoalPeriod::Week => 7,
        }
    }

    /// First day of the window ending on `anchor`.
    #[must_use]
    pub fn start(self, anchor: NaiveDate) -> NaiveDate {
        anchor - Duration::days(i64::from(self.days()) - 1)
    }

    #[must_use]
    pub fn contains(self, anchor: NaiveDate, date: NaiveDate) -> bool {
        (self.start(anchor)..=anchor).contains(&date)
    }
}

impl fmt::Display for GoalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalPeriod::Day => f.write_str("day"),
            GoalPeriod::Week => f.write_str("week"),
        }
    }
}

impl FromStr for GoalPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(GoalPeriod::Day),
            "week" | "weekly" => Ok(GoalPeriod::Week),
            _ => bail!("Invalid goal period '{s}'. Use day or week"),
        }
    }
}

/// How a target folds the days of its window into one number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Total over the whole window.
    #[default]
    Sum,
    /// Total divided by the number of days that have entries.
    DailyMean,
}

/// A configured target: which category's metric to measure, over which
/// window and against what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalTarget {
    pub category: Category,
    pub metric: String,
    pub target: f64,
    #[serde(default)]
    pub period: GoalPeriod,
    #[serde(default)]
    pub reduce: Reduction,
}

impl GoalTarget {
    /// A daily total target.
    #[must_use]
    pub fn new(category: Category, metric: &str, target: f64) -> Self {
        Self {
            category,
            metric: metric.to_string(),
            target,
            period: GoalPeriod::Day,
            reduce: Reduction::Sum,
        }
    }

    #[must_use]
    pub fn over(mut self, period: GoalPeriod, reduce: Reduction) -> Self {
        self.period = period;
        self.reduce = reduce;
        self
    }

    /// Measure this target over the window ending on `anchor`, using only
    /// entries of the target's category.
    #[must_use]
    pub fn measure<'a, I>(&self, entries: I, anchor: NaiveDate) -> Goal
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let in_window = entries
            .into_iter()
            .filter(|e| self.period.contains(anchor, e.date()));
        let by_day = aggregate_category(in_window, self.category, |e| GroupBy::Day.key(e));
        match self.reduce {
            Reduction::Sum => Goal::measure(self.metric.as_str(), self.target, &by_day),
            Reduction::DailyMean => Goal::measure_mean(self.metric.as_str(), self.target, &by_day),
        }
    }
}

/// Daily nutrition and weekly activity targets used by the dashboard when
/// nothing else is configured.
#[must_use]
pub fn default_goal_targets() -> Vec<GoalTarget> {
    vec![
        GoalTarget::new(Category::Meal, "calories", 2200.0),
        GoalTarget::new(Category::Meal, "protein", 140.0),
        GoalTarget::new(Category::Meal, "carbs", 220.0),
        GoalTarget::new(Category::Meal, "fat", 70.0),
        GoalTarget::new(Category::Meal, "water", 3000.0),
        GoalTarget::new(Category::Workout, "steps", 10000.0)
            .over(GoalPeriod::Week, Reduction::DailyMean),
        GoalTarget::new(Category::Workout, "active_minutes", 1050.0)
            .over(GoalPeriod::Week, Reduction::Sum),
        GoalTarget::new(Category::Workout, "calories_burned", 15000.0)
            .over(GoalPeriod::Week, Reduction::Sum),
    ]
}
