mod glucose;
mod helpers;
mod progress;
mod series;
mod summary;

pub(crate) use glucose::{cmd_glucose, resolve_range};
pub(crate) use helpers::{parse_category, parse_date, parse_labels};
pub(crate) use progress::{cmd_macros, cmd_progress};
pub(crate) use series::cmd_series;
pub(crate) use summary::{cmd_entries, cmd_summary};
