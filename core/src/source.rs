//! Loading entries from JSON or CSV exports.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::models::{Category, Entry, coerce_str_number, parse_timestamp};

/// Columns with fixed meaning in a CSV export. Every other column is a
/// numeric value.
const RESERVED_COLUMNS: &[&str] = &["id", "timestamp", "category"];

/// Text columns kept as entry tags rather than numbers.
const TAG_COLUMNS: &[&str] = &["meal", "notes"];

/// Parse a JSON array of entries.
pub fn parse_json_entries<R: Read>(reader: R) -> Result<Vec<Entry>> {
    let entries: Vec<Entry> =
        serde_json::from_reader(reader).context("Failed to parse entries JSON")?;
    Ok(entries)
}

/// Parse a CSV export of entries.
///
/// Expected header: `timestamp,category,...` plus any numeric columns. `id`,
/// `meal` and `notes` are optional text columns. Blank numeric cells are
/// skipped; malformed ones count as 0.
pub fn parse_csv_entries<R: Read>(reader: R) -> Result<Vec<Entry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    for name in ["timestamp", "category"] {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            bail!("Missing required column: {name}");
        }
    }

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_timestamp = col("timestamp").context("Missing 'timestamp' column")?;
    let idx_category = col("category").context("Missing 'category' column")?;
    let idx_id = col("id");
    let tag_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| TAG_COLUMNS.iter().any(|t| h.eq_ignore_ascii_case(t)))
        .map(|(i, h)| (i, h.to_lowercase()))
        .collect();
    let value_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            !h.is_empty()
                && !RESERVED_COLUMNS
                    .iter()
                    .chain(TAG_COLUMNS)
                    .any(|r| h.eq_ignore_ascii_case(r))
        })
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut entries = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let row = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {row}"))?;

        let timestamp = record.get(idx_timestamp).unwrap_or("");
        let category = record.get(idx_category).unwrap_or("");
        if timestamp.is_empty() && category.is_empty() {
            continue; // skip blank rows
        }

        let timestamp = parse_timestamp(timestamp).with_context(|| format!("CSV row {row}"))?;
        let category: Category = category.parse().with_context(|| format!("CSV row {row}"))?;

        let mut entry = Entry::new(timestamp, category);
        let id = idx_id.and_then(|i| record.get(i));
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            entry = entry.with_id(id);
        }
        for (i, key) in &tag_columns {
            if let Some(text) = record.get(*i).filter(|t| !t.is_empty()) {
                entry = entry.with_tag(key.clone(), text);
            }
        }
        for (i, field) in &value_columns {
            if let Some(raw) = record.get(*i).filter(|v| !v.is_empty()) {
                entry = entry.with_value(field.clone(), coerce_str_number(field, raw));
            }
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// Load entries from a file, choosing the format by extension: `.csv` is
/// read as CSV, anything else as JSON.
pub fn load_entries(path: &Path) -> Result<Vec<Entry>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open entries file: {}", path.display()))?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let parsed = if is_csv {
        parse_csv_entries(file)
    } else {
        parse_json_entries(std::io::BufReader::new(file))
    };
    let entries =
        parsed.with_context(|| format!("Failed to load entries from {}", path.display()))?;
    tracing::debug!(path = %path.display(), count = entries.len(), "loaded entries");
    Ok(entries)
}
