use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "insight-beam";
pub const API_KEY_ENV: &str = "INSIGHT_BEAM_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Load the bundled demo dataset into an empty database.
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,

    /// Maximum number of items taken from a feed per pull.
    #[serde(default = "default_pull_limit")]
    pub pull_limit: usize,

    /// Width of the sources drawer, in columns.
    #[serde(default = "default_drawer_width")]
    pub drawer_width: u16,

    pub log_path: Option<String>,
}

fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
}

fn default_db_path() -> String {
    data_dir().join("insight-beam.db").to_string_lossy().to_string()
}

fn default_model() -> String {
    crate::ai::DEFAULT_MODEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_pull_limit() -> usize {
    20
}

fn default_drawer_width() -> u16 {
    32
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            api_key: None,
            model: default_model(),
            seed_demo_data: default_true(),
            pull_limit: default_pull_limit(),
            drawer_width: default_drawer_width(),
            log_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Reads the config at `path`, writing the defaults there first when the
    /// file does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// A non-empty environment key takes precedence over the file.
    pub fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("insight-beam.log"))
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.model, crate::ai::DEFAULT_MODEL);
        assert!(config.seed_demo_data);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "db_path = \"/tmp/beam.db\"\npull_limit = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.db_path, "/tmp/beam.db");
        assert_eq!(config.pull_limit, 5);
        assert_eq!(config.drawer_width, 32);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pull_limit = \"many\"").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(AppError::ConfigParse(_))
        ));
    }

    #[test]
    fn environment_key_overrides_file() {
        let mut config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        config.apply_env(Some("  ".to_string()));
        assert_eq!(config.api_key(), Some("from-file"));

        config.apply_env(Some("from-env".to_string()));
        assert_eq!(config.api_key(), Some("from-env"));
    }
}
