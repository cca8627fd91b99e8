//! Application configuration
//!
//! Read from `$GESTOR_CONFIG` or `<config dir>/gestor.toml`. A missing file
//! means defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use gestor_core::{Error, Page, Result};
use serde::Deserialize;

pub const CONFIG_ENV: &str = "GESTOR_CONFIG";
pub const CONFIG_FILE: &str = "gestor.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    pub session_ttl_hours: i64,
    /// Countdown refresh period
    pub timer_interval_secs: u64,
    /// Used when `RUST_LOG` is unset
    pub log_filter: String,
    pub bootstrap: Option<BootstrapConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            session_ttl_hours: 8,
            timer_interval_secs: 60,
            log_filter: "info".to_string(),
            bootstrap: None,
        }
    }
}

/// Data seeded on startup
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BootstrapConfig {
    pub admin: Option<AdminAccount>,
    #[serde(default)]
    pub pages: Vec<PageSeed>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageSeed {
    pub name: String,
    pub route: String,
    pub description: Option<String>,
}

impl PageSeed {
    pub fn to_page(&self) -> Page {
        Page::new(&self.name, &self.route, self.description.clone())
    }
}

impl AppConfig {
    /// Load from the environment override or the platform config directory
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => match ProjectDirs::from("dev", "gestor", "gestor") {
                Some(dirs) => dirs.config_dir().join(CONFIG_FILE),
                None => return Ok(Self::default()),
            },
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.session_ttl_hours <= 0 {
            return Err(Error::Validation(
                "session_ttl_hours must be positive".to_string(),
            ));
        }
        if self.timer_interval_secs == 0 {
            return Err(Error::Validation(
                "timer_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn timer_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timer_interval_secs)
    }
}
