//! Server configuration.
//!
//! Loaded from `BILLBOOK_*` environment variables with fallback to defaults.
//!
//! | Variable                   | Default                    |
//! |----------------------------|----------------------------|
//! | `BILLBOOK_ACCOUNT_ID`      | `default`                  |
//! | `BILLBOOK_ACCOUNT_NAME`    | `Billbook`                 |
//! | `BILLBOOK_HOST`            | `127.0.0.1`                |
//! | `BILLBOOK_PORT`            | `3000`                     |
//! | `BILLBOOK_DATABASE_PATH`   | `./data/<account>.db`      |
//! | `BILLBOOK_STATIC_DIR`      | `./static`                 |
//! | `BILLBOOK_STORAGE_PREFIX`  | `billbook:<account>:`      |
//! | `BILLBOOK_TOLERANCE`       | `30`                       |
//! | `BILLBOOK_MAX_ATTEMPTS`    | `200`                      |
//! | `BILLBOOK_BUSINESS_ADDRESS`| unset                      |
//! | `BILLBOOK_TAX_ID`          | unset                      |

use std::env;
use std::path::PathBuf;

use billbook_core::money::Money;
use billbook_core::validation::validate_account_id;
use billbook_core::{
    ComposeOptions, DEFAULT_ACCOUNT_ID, DEFAULT_MAX_ATTEMPTS, DEFAULT_TOLERANCE, MAX_AMOUNT_CENTS,
};

/// Per-account server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Account this process serves.
    pub account_id: String,

    /// Display name, also the default letterhead.
    pub account_name: String,

    pub host: String,
    pub port: u16,

    /// SQLite file for this account.
    pub database_path: PathBuf,

    /// Browser client assets, served for any unmatched path.
    pub static_dir: PathBuf,

    /// Prefix the browser client puts on its local storage keys.
    pub storage_prefix: String,

    /// Composer tolerance above the target.
    pub tolerance: Money,

    /// Composer trials per bill.
    pub max_attempts: usize,

    pub business_address: Option<String>,
    pub tax_id: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig::for_account(DEFAULT_ACCOUNT_ID)
    }
}

impl ServerConfig {
    /// Defaults for `account_id`.
    pub fn for_account(account_id: &str) -> Self {
        ServerConfig {
            account_id: account_id.to_string(),
            account_name: "Billbook".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_path: PathBuf::from(format!("./data/{account_id}.db")),
            static_dir: PathBuf::from("./static"),
            storage_prefix: format!("billbook:{account_id}:"),
            tolerance: DEFAULT_TOLERANCE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            business_address: None,
            tax_id: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. `from_env` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let account_id = get("BILLBOOK_ACCOUNT_ID").unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string());
        validate_account_id(&account_id)
            .map_err(|e| ConfigError::InvalidValue("BILLBOOK_ACCOUNT_ID".to_string(), e.to_string()))?;

        let mut config = ServerConfig::for_account(&account_id);

        if let Some(name) = get("BILLBOOK_ACCOUNT_NAME") {
            config.account_name = name;
        }
        if let Some(host) = get("BILLBOOK_HOST") {
            config.host = host;
        }
        if let Some(port) = get("BILLBOOK_PORT") {
            config.port = parse_value("BILLBOOK_PORT", &port)?;
        }
        if let Some(path) = get("BILLBOOK_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = get("BILLBOOK_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = get("BILLBOOK_STORAGE_PREFIX") {
            config.storage_prefix = prefix;
        }
        if let Some(tolerance) = get("BILLBOOK_TOLERANCE") {
            config.tolerance = Money::parse(&tolerance)
                .filter(|m| (0..=MAX_AMOUNT_CENTS).contains(&m.cents()))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "BILLBOOK_TOLERANCE".to_string(),
                        format!(
                            "'{tolerance}' is not an amount between 0 and {}",
                            Money::from_cents(MAX_AMOUNT_CENTS)
                        ),
                    )
                })?;
        }
        if let Some(attempts) = get("BILLBOOK_MAX_ATTEMPTS") {
            config.max_attempts = parse_value("BILLBOOK_MAX_ATTEMPTS", &attempts)?;
            if config.max_attempts == 0 {
                return Err(ConfigError::InvalidValue(
                    "BILLBOOK_MAX_ATTEMPTS".to_string(),
                    "must be at least 1".to_string(),
                ));
            }
        }
        config.business_address = get("BILLBOOK_BUSINESS_ADDRESS");
        config.tax_id = get("BILLBOOK_TAX_ID");

        Ok(config)
    }

    /// Composer options derived from this configuration.
    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            tolerance: self.tolerance,
            max_attempts: self.max_attempts,
            ..ComposeOptions::default()
        }
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), format!("cannot parse '{raw}'")))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.account_id, "default");
        assert_eq!(config.port, 3000);
        assert_eq!(config.storage_prefix, "billbook:default:");
        assert_eq!(config.database_path, PathBuf::from("./data/default.db"));
        assert_eq!(config.tolerance, Money::from_units(30));
        assert_eq!(config.max_attempts, 200);
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_account_drives_derived_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BILLBOOK_ACCOUNT_ID", "shop-2"),
            ("BILLBOOK_PORT", "3002"),
            ("BILLBOOK_TOLERANCE", "12.50"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("./data/shop-2.db"));
        assert_eq!(config.storage_prefix, "billbook:shop-2:");
        assert_eq!(config.port, 3002);
        assert_eq!(config.compose_options().tolerance, Money::from_cents(1250));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("BILLBOOK_PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("BILLBOOK_TOLERANCE", "-5")])).is_err());
        assert!(
            ServerConfig::from_lookup(lookup(&[("BILLBOOK_TOLERANCE", "99999999999999")])).is_err()
        );
        assert!(ServerConfig::from_lookup(lookup(&[("BILLBOOK_ACCOUNT_ID", "../etc")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("BILLBOOK_MAX_ATTEMPTS", "0")])).is_err());
    }
}
