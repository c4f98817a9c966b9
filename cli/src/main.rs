mod commands;
mod config;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_entries, cmd_glucose, cmd_macros, cmd_progress, cmd_series, cmd_summary, parse_category,
    parse_date, parse_labels, resolve_range,
};
use crate::config::Config;
use vitals_core::aggregate::GroupBy;
use vitals_core::goal::{GoalPeriod, GoalTarget, Reduction};
use vitals_core::models::Entry;
use vitals_core::source::load_entries;

#[derive(Parser)]
#[command(
    name = "vitals",
    version,
    about = "Summaries, charts and goal progress for a personal health log"
)]
struct Cli {
    /// Entry file to read (.json or .csv, default: entries.json in the data directory)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Total every numeric field per period
    Summary {
        /// Only include one category: glucose, meal, workout, weight, bloodPressure, medication
        #[arg(short, long)]
        category: Option<String>,
        /// Grouping: day, weekday, week, month, reading, category, meal, tag:<key>
        #[arg(short, long, default_value = "day")]
        group_by: String,
        /// Only include one day (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Lay totals out on a fixed label axis, filling gaps with zeros
    Series {
        /// Grouping: day, weekday, week, month, reading, category, meal, tag:<key>
        #[arg(short, long)]
        group_by: String,
        /// Only include one category
        #[arg(short, long)]
        category: Option<String>,
        /// Axis labels: weekdays, meals, last:N or a comma-separated list
        #[arg(short, long, default_value = "weekdays")]
        labels: String,
        /// Only include one day (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show progress against goals (configured goals unless one is given)
    Progress {
        /// Category of a one-off goal
        #[arg(short, long, requires_all = ["metric", "target"])]
        category: Option<String>,
        /// Metric of a one-off goal (e.g. calories, steps)
        #[arg(short, long, requires_all = ["category", "target"])]
        metric: Option<String>,
        /// Target of a one-off goal
        #[arg(short, long, requires_all = ["category", "metric"])]
        target: Option<f64>,
        /// Window of a one-off goal: day or week
        #[arg(short, long, requires = "metric", default_value = "day")]
        period: String,
        /// Compare the per-day average over the window instead of its total
        #[arg(long, requires = "metric")]
        average: bool,
        /// Last day of the goal window (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Calorie split across protein, carbs and fat
    Macros {
        /// Day to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Glucose readings against the target range
    Glucose {
        /// Lower bound of the target range (default from config, 70)
        #[arg(long)]
        low: Option<f64>,
        /// Upper bound of the target range (default from config, 140)
        #[arg(long)]
        high: Option<f64>,
        /// Only include one day (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List raw entries
    Entries {
        /// Only include one category
        #[arg(short, long)]
        category: Option<String>,
        /// Only include one day (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr so table and JSON output stay clean on stdout.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("VITALS_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.file)?;
    let entries = read_entries(&config)?;

    match cli.command {
        Commands::Summary {
            category,
            group_by,
            date,
            json,
        } => {
            let group_by: GroupBy = group_by.parse()?;
            let category = parse_category(category.as_deref())?;
            cmd_summary(&entries, category, &group_by, day_filter(date)?, json)
        }
        Commands::Series {
            group_by,
            category,
            labels,
            date,
            json,
        } => {
            let group_by: GroupBy = group_by.parse()?;
            let category = parse_category(category.as_deref())?;
            let labels = parse_labels(&labels, Local::now().date_naive())?;
            let date = day_filter(date)?;
            cmd_series(&entries, category, &group_by, &labels, date, json)
        }
        Commands::Progress {
            category,
            metric,
            target,
            period,
            average,
            date,
            json,
        } => {
            let single = match (parse_category(category.as_deref())?, metric, target) {
                (Some(category), Some(metric), Some(target)) => {
                    let reduce = if average {
                        Reduction::DailyMean
                    } else {
                        Reduction::Sum
                    };
                    let period: GoalPeriod = period.parse()?;
                    Some(GoalTarget::new(category, &metric, target).over(period, reduce))
                }
                (None, None, None) => None,
                _ => bail!("A one-off goal needs --category, --metric and --target together"),
            };
            let goals = &config.settings.goals;
            cmd_progress(&entries, goals, single, parse_date(date)?, json)
        }
        Commands::Macros { date, json } => cmd_macros(&entries, parse_date(date)?, json),
        Commands::Glucose {
            low,
            high,
            date,
            json,
        } => {
            let range = resolve_range(config.settings.glucose_range, low, high)?;
            cmd_glucose(&entries, range, day_filter(date)?, json)
        }
        Commands::Entries {
            category,
            date,
            json,
        } => {
            let category = parse_category(category.as_deref())?;
            cmd_entries(&entries, category, day_filter(date)?, json)
        }
    }
}

fn read_entries(config: &Config) -> Result<Vec<Entry>> {
    if !config.entries_path.exists() {
        bail!(
            "Entry file not found: {}\nPass --file or place entries.json in {}",
            config.entries_path.display(),
            config.data_dir.display()
        );
    }
    load_entries(&config.entries_path)
}

/// `--date` is optional here: absent means every day.
fn day_filter(date: Option<String>) -> Result<Option<NaiveDate>> {
    date.map(|d| parse_date(Some(d))).transpose()
}
