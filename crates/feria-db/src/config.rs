//! # Configuration
//!
//! Database and fair defaults for a Feria installation.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FERIA_DATABASE_PATH=/var/lib/feria/feria.db                        │
//! │     FERIA_MAX_CONNECTIONS=8                                            │
//! │     FERIA_DEFAULT_ASSOCIATION_BPS=1000                                 │
//! │     FERIA_DEFAULT_SELLER_BPS=500                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/feria/feria.toml (Linux)                                 │
//! │     ~/Library/Application Support/org.feria.feria/feria.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "feria.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [fair]
//! default_association_bps = 1000  # 10%
//! default_seller_bps = 500        # 5%
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use feria_core::CommissionRate;

use crate::pool::DbConfig;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long SQLite waits on a locked database before failing.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("feria.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_busy_timeout() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_secs: default_busy_timeout(),
            run_migrations: default_true(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration.
    pub fn to_db_config(&self) -> DbConfig {
        if self.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory().run_migrations(self.run_migrations);
        }
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
            .run_migrations(self.run_migrations)
    }
}

// =============================================================================
// Fair Settings
// =============================================================================

/// Defaults applied when an event is created without explicit rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairSettings {
    #[serde(default = "default_association_bps")]
    pub default_association_bps: u32,

    #[serde(default = "default_seller_bps")]
    pub default_seller_bps: u32,
}

fn default_association_bps() -> u32 {
    1000
}
fn default_seller_bps() -> u32 {
    500
}

impl Default for FairSettings {
    fn default() -> Self {
        FairSettings {
            default_association_bps: default_association_bps(),
            default_seller_bps: default_seller_bps(),
        }
    }
}

// =============================================================================
// Feria Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeriaConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub fair: FairSettings,
}

impl FeriaConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (feria.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading feria config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load feria config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections exceeds max_connections".into(),
            ));
        }

        for (field, bps) in [
            ("fair.default_association_bps", self.fair.default_association_bps),
            ("fair.default_seller_bps", self.fair.default_seller_bps),
        ] {
            if bps > CommissionRate::MAX_BPS {
                return Err(ConfigError::Invalid(format!(
                    "{} must be at most {}",
                    field,
                    CommissionRate::MAX_BPS
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FERIA_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("FERIA_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid FERIA_MAX_CONNECTIONS"),
            }
        }

        if let Ok(bps) = std::env::var("FERIA_DEFAULT_ASSOCIATION_BPS") {
            match bps.parse::<u32>() {
                Ok(n) => self.fair.default_association_bps = n,
                Err(_) => warn!(value = %bps, "Ignoring invalid FERIA_DEFAULT_ASSOCIATION_BPS"),
            }
        }

        if let Ok(bps) = std::env::var("FERIA_DEFAULT_SELLER_BPS") {
            match bps.parse::<u32>() {
                Ok(n) => self.fair.default_seller_bps = n,
                Err(_) => warn!(value = %bps, "Ignoring invalid FERIA_DEFAULT_SELLER_BPS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "feria", "feria")
            .map(|dirs| dirs.config_dir().join("feria.toml"))
    }
}
