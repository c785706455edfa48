use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{InventoryError, Result};
use crate::model::DEFAULT_REORDER_THRESHOLD;

const APP_NAME: &str = "stocktake";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub current_snapshot: PathBuf,
    pub reference_snapshot: PathBuf,
    pub history_dir: PathBuf,
    pub default_reorder_threshold: u32,
}

/// Optional overrides read from `config.toml`. Relative paths resolve
/// against the data directory.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub current_snapshot: Option<PathBuf>,
    pub reference_snapshot: Option<PathBuf>,
    pub history_dir: Option<PathBuf>,
    pub default_reorder_threshold: Option<u32>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| InventoryError::Config(e.to_string()))
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| InventoryError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&text)
    }
}

impl Config {
    /// Everything under `data_dir` with default file names.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Config {
            database_path: data_dir.join("inventory.db"),
            current_snapshot: data_dir.join("inventory.csv"),
            reference_snapshot: data_dir.join("last_inventory.csv"),
            history_dir: data_dir.join("exports"),
            default_reorder_threshold: DEFAULT_REORDER_THRESHOLD,
            data_dir,
        }
    }

    /// Defaults, then the config file, then the `--data-dir` flag.
    ///
    /// An explicitly named config file must exist; the default one is optional.
    pub fn load(config_path: Option<&Path>, data_dir_flag: Option<&Path>) -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", APP_NAME);

        let file = match config_path {
            Some(path) => FileConfig::read(path)?,
            None => match dirs.as_ref().map(|d| d.config_dir().join("config.toml")) {
                Some(path) if path.is_file() => FileConfig::read(&path)?,
                _ => FileConfig::default(),
            },
        };

        let data_dir = match (data_dir_flag, &file.data_dir) {
            (Some(flag), _) => flag.to_path_buf(),
            (None, Some(from_file)) => from_file.clone(),
            (None, None) => dirs.map(|d| d.data_dir().to_path_buf()).ok_or_else(|| {
                InventoryError::Config("could not determine data directory".into())
            })?,
        };

        let config = Config::with_data_dir(data_dir).overlay(file);
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn overlay(mut self, file: FileConfig) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { self.data_dir.join(p) };
        if let Some(p) = file.database {
            self.database_path = resolve(p);
        }
        if let Some(p) = file.current_snapshot {
            self.current_snapshot = resolve(p);
        }
        if let Some(p) = file.reference_snapshot {
            self.reference_snapshot = resolve(p);
        }
        if let Some(p) = file.history_dir {
            self.history_dir = resolve(p);
        }
        if let Some(t) = file.default_reorder_threshold {
            self.default_reorder_threshold = t;
        }
        self
    }
}
