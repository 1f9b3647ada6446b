//! # Register Configuration
//!
//! Settings for a register installation: where the database lives and how
//! receipts render money.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TILL_DB_PATH=/var/lib/till/till.db                                  │
//! │     TILL_STORE_NAME="Bar do Centro"                                     │
//! │     TILL_MAX_CONNECTIONS=8                                              │
//! │                                                                         │
//! │  2. TOML Config File (till.toml)                                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./data/till.db"
//! max_connections = 5
//!
//! [register]
//! store_name = "Bar do Centro"
//! currency_symbol = "R$"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;
use till_core::Money;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Pool size. Default: 5
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("till.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[register]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSettings {
    /// Store name (printed on receipts)
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Currency symbol (for display)
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "Till Dev Store".to_string()
}

fn default_currency_symbol() -> String {
    "R$".to_string()
}

impl Default for RegisterSettings {
    fn default() -> Self {
        RegisterSettings {
            store_name: default_store_name(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

// =============================================================================
// Register Configuration
// =============================================================================

/// Complete register configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub register: RegisterSettings,
}

impl RegisterConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file, when `config_path` is given and exists
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                info!(?path, "Loading register config from file");
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| DbError::Config(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing sections take their defaults.
    pub fn from_toml_str(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> DbResult<String> {
        toml::to_string_pretty(self).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::Config("database path is required".into()));
        }

        Ok(())
    }

    /// Applies `TILL_*` overrides read through `lookup`.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(name) = lookup("TILL_STORE_NAME") {
            self.register.store_name = name;
        }

        if let Some(max) = lookup("TILL_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TILL_MAX_CONNECTIONS"),
            }
        }
    }

    /// Pool settings for this installation.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }

    /// Formats an amount with the configured symbol.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::Money;
    /// use till_db::RegisterConfig;
    ///
    /// let config = RegisterConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(1234)), "R$12.34");
    /// assert_eq!(config.format_currency(Money::from_cents(-500)), "-R$5.00");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        format!(
            "{}{}{}.{:02}",
            if amount.is_negative() { "-" } else { "" },
            self.register.currency_symbol,
            amount.major().abs(),
            amount.cents_part()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RegisterConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.register.currency_symbol, "R$");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_sections() {
        let config = RegisterConfig::from_toml_str(
            r#"
            [register]
            store_name = "Bar do Centro"
            "#,
        )
        .unwrap();

        assert_eq!(config.register.store_name, "Bar do Centro");
        assert_eq!(config.register.currency_symbol, "R$");
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = RegisterConfig::default();
        config.database.path = PathBuf::from("/var/lib/till/till.db");

        let text = config.to_toml_string().unwrap();
        assert_eq!(RegisterConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            RegisterConfig::from_toml_str("[database\npath ="),
            Err(DbError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TILL_DB_PATH", "/tmp/other.db"),
            ("TILL_STORE_NAME", "Quiosque"),
            ("TILL_MAX_CONNECTIONS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = RegisterConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.register.store_name, "Quiosque");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation() {
        let mut config = RegisterConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_db_config() {
        let mut config = RegisterConfig::default();
        config.database.max_connections = 3;

        let db = config.db_config();
        assert_eq!(db.max_connections, 3);
        assert_eq!(db.database_path, PathBuf::from("till.db"));
    }

    #[test]
    fn test_format_currency() {
        let config = RegisterConfig::default();
        assert_eq!(config.format_currency(Money::from_cents(1)), "R$0.01");
        assert_eq!(config.format_currency(Money::zero()), "R$0.00");
        assert_eq!(config.format_currency(Money::from_cents(123456789)), "R$1234567.89");
    }
}
