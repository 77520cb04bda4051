use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PocketbookError, Result};

pub const DB_FILE_NAME: &str = "pocketbook.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_account")]
    pub default_account: String,
    #[serde(default = "default_category")]
    pub default_category: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_account() -> String {
    crate::ledger::DEFAULT_ACCOUNT.to_string()
}

fn default_category() -> String {
    crate::ledger::DEFAULT_CATEGORY.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            log_level: default_log_level(),
            default_currency: default_currency(),
            default_account: default_account(),
            default_category: default_category(),
        }
    }
}

impl Settings {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.data_dir))
    }

    /// Database location: an explicit path wins over `<data_dir>/pocketbook.db`.
    pub fn db_path(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => self.data_path().join(DB_FILE_NAME),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("pocketbook")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pocketbook")
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path())
}

/// Missing file means defaults; a file that does not parse is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| PocketbookError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
