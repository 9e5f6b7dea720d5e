// src/app_dirs.rs

use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_NAME: &str = "study-mastery";
const DB_FILE: &str = "concepts.db";

/// Default database location: `$HOME/.local/state/study-mastery`, else the platform data dir.
pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let state_dir = PathBuf::from(home)
            .join(".local")
            .join("state")
            .join(APP_NAME);
        Some(state_dir.join(DB_FILE))
    } else {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().join(DB_FILE))
    }
}

pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join("config.json"))
        .unwrap_or_else(|| PathBuf::from("study_mastery_config.json"))
}
