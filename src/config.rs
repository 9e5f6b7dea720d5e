// src/config.rs

use crate::app_dirs;
use crate::constants::{PAGE_SIZE_DEFAULT, WEAK_THRESHOLD_DEFAULT};
use crate::error::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub seed_sample_data: bool,
    pub page_size: u32,
    pub weak_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            seed_sample_data: true,
            page_size: PAGE_SIZE_DEFAULT,
            weak_threshold: WEAK_THRESHOLD_DEFAULT,
        }
    }
}

impl Config {
    /// Explicit override, then the configured path, then the default location.
    pub fn resolve_db_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.database_path.clone())
            .or_else(app_dirs::default_db_path)
            .unwrap_or_else(|| PathBuf::from("concepts.db"))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: app_dirs::default_config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Ignoring unreadable config {:?}: {}", self.path, e);
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
