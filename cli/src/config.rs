use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vitals_core::derived::TargetRange;
use vitals_core::goal::{GoalTarget, default_goal_targets};

pub struct Config {
    pub entries_path: PathBuf,
    pub data_dir: PathBuf,
    pub settings: Settings,
}

/// User-tunable targets, read from `config.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_goal_targets")]
    pub goals: Vec<GoalTarget>,
    #[serde(default)]
    pub glucose_range: TargetRange,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            goals: default_goal_targets(),
            glucose_range: TargetRange::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

impl Config {
    pub fn load(entries_override: Option<PathBuf>) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "vitals").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Self::from_dir(data_dir, entries_override)
    }

    fn from_dir(data_dir: PathBuf, entries_override: Option<PathBuf>) -> Result<Self> {
        let entries_path = entries_override.unwrap_or_else(|| data_dir.join("entries.json"));
        let settings = Settings::load(&data_dir.join("config.json"))?;
        tracing::debug!(
            entries = %entries_path.display(),
            goals = settings.goals.len(),
            "loaded config"
        );

        Ok(Config {
            entries_path,
            data_dir,
            settings,
        })
    }
}
