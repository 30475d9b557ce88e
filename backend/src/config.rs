//! Runtime configuration.
//!
//! Every field can be overridden by a `DAYBOOK_`-prefixed environment
//! variable (`DAYBOOK_PORT`, `DAYBOOK_DATA_DIR`, `DAYBOOK_SOURCES=a,b`,
//! `DAYBOOK_LOG_POLL_MILLIS`, ...); anything unset keeps its default.

use crate::error::{StoreError, StoreResult};
use config::{ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Data sources, one SQLite file each.
    pub sources: Vec<String>,
    /// File stem of the user database.
    pub auth_db: String,
    pub backup_interval_secs: u64,
    pub log_poll_millis: u64,
    pub refresh_millis: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("."),
            sources: ["test1", "test2", "test3", "test4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            auth_db: "user_management".to_string(),
            backup_interval_secs: 24 * 60 * 60,
            log_poll_millis: 1000,
            refresh_millis: 2000,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Environment::with_prefix("DAYBOOK"))
    }

    fn load_from(env: Environment) -> Result<Self, ConfigError> {
        let config: Config = config::Config::builder()
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sources"),
            )
            .build()?
            .try_deserialize()?;
        config.validated()
    }

    /// Trims the source list and rejects settings the background tasks
    /// cannot run with.
    fn validated(mut self) -> Result<Self, ConfigError> {
        self.sources = self
            .sources
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.sources.is_empty() {
            return Err(ConfigError::Message("at least one data source is required".into()));
        }
        for (name, value) in [
            ("backup_interval_secs", self.backup_interval_secs),
            ("log_poll_millis", self.log_poll_millis),
            ("refresh_millis", self.refresh_millis),
        ] {
            if value == 0 {
                return Err(ConfigError::Message(format!("{} must be greater than zero", name)));
            }
        }
        Ok(self)
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs)
    }

    pub fn log_poll_interval(&self) -> Duration {
        Duration::from_millis(self.log_poll_millis)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_millis)
    }

    /// Database file for a configured source. Unknown names are rejected so
    /// request paths can never point outside the data directory.
    pub fn source_path(&self, source: &str) -> StoreResult<PathBuf> {
        if !self.sources.iter().any(|s| s == source) {
            return Err(StoreError::NotFound(format!("data source '{}'", source)));
        }
        Ok(self.data_dir.join(format!("{}.db", source)))
    }

    pub fn auth_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.auth_db))
    }
}
