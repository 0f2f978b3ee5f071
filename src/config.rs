// ⚙️ Application configuration from the environment (.env supported)

use crate::synth::DEFAULT_QUANTITY;
use crate::template::{DEFAULT_CARD_LEN, MAX_CARD_LEN, MIN_CARD_LEN};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub server_addr: String,
    /// Opaque user id for local (CLI/TUI) history
    pub user: String,
    pub target_length: usize,
    pub quantity: usize,
    pub max_quantity: usize,
    pub history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: PathBuf::from("card_history.db"),
            server_addr: "0.0.0.0:3000".to_string(),
            user: "local".to_string(),
            target_length: DEFAULT_CARD_LEN,
            quantity: DEFAULT_QUANTITY,
            max_quantity: 1000,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e).context(format!("Failed to read env: {key}")),
    }
}

impl AppConfig {
    /// Load `.env` (if present) then read `CARD_*` variables over the defaults
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = AppConfig::default();

        let config = AppConfig {
            db_path: env_or("CARD_DB_PATH", defaults.db_path)?,
            server_addr: env_or("CARD_SERVER_ADDR", defaults.server_addr)?,
            user: env_or("CARD_USER", defaults.user)?,
            target_length: env_or("CARD_TARGET_LENGTH", defaults.target_length)?,
            quantity: env_or("CARD_QUANTITY", defaults.quantity)?,
            max_quantity: env_or("CARD_MAX_QUANTITY", defaults.max_quantity)?,
            history_limit: env_or("CARD_HISTORY_LIMIT", defaults.history_limit)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_CARD_LEN..=MAX_CARD_LEN).contains(&self.target_length) {
            return Err(anyhow!(
                "CARD_TARGET_LENGTH must be {MIN_CARD_LEN}-{MAX_CARD_LEN}, got {}",
                self.target_length
            ));
        }
        if self.quantity == 0 || self.quantity > self.max_quantity {
            return Err(anyhow!(
                "CARD_QUANTITY must be 1-{}, got {}",
                self.max_quantity,
                self.quantity
            ));
        }
        if self.user.trim().is_empty() {
            return Err(anyhow!("CARD_USER must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_length, 16);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            target_length: 12,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            quantity: 5000,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_parses_and_defaults() {
        std::env::set_var("CARD_TEST_ENV_OR_LIMIT", "75");
        assert_eq!(env_or("CARD_TEST_ENV_OR_LIMIT", 50usize).unwrap(), 75);
        assert_eq!(env_or("CARD_TEST_ENV_OR_MISSING", 50usize).unwrap(), 50);

        std::env::set_var("CARD_TEST_ENV_OR_BAD", "lots");
        assert!(env_or("CARD_TEST_ENV_OR_BAD", 50usize).is_err());
    }
}
