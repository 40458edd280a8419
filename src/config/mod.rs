//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `EVENTI_GARE_` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use eventi_gare::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod checkout;
mod error;
mod payment;
mod server;
mod sponsor;
mod storage;

pub use checkout::CheckoutConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};
pub use sponsor::SponsorConfig;
pub use storage::StorageConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Payment configuration (Stripe, pricing)
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Checkout redirect urls and allowed origins
    #[serde(default)]
    pub checkout: CheckoutConfig,

    /// Sponsor module pricing
    #[serde(default)]
    pub sponsor: SponsorConfig,

    /// Snapshot and event catalog locations
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `EVENTI_GARE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `EVENTI_GARE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `EVENTI_GARE__PAYMENT__STRIPE_SECRET_KEY=...` -> `payment.stripe_secret_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("EVENTI_GARE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.payment.validate(self.server.environment)?;
        self.checkout.validate()?;
        self.sponsor.validate()?;
        self.storage.validate()?;
        Ok(())
    }

    /// Load and validate in one step.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.environment.is_production()
    }
}

/// Splits a comma-separated setting, dropping blank entries.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "EVENTI_GARE__PAYMENT__STRIPE_SECRET_KEY",
        "EVENTI_GARE__PAYMENT__USE_MOCK_GATEWAY",
        "EVENTI_GARE__PAYMENT__COMMISSION_RATE",
        "EVENTI_GARE__SERVER__PORT",
        "EVENTI_GARE__SERVER__ENVIRONMENT",
        "EVENTI_GARE__CHECKOUT__SPONSOR_SUCCESS_URL",
        "EVENTI_GARE__STORAGE__SNAPSHOT_PATH",
    ];

    fn set_minimal_env() {
        env::set_var("EVENTI_GARE__PAYMENT__STRIPE_SECRET_KEY", "sk_test_xxx");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.payment.is_test_mode());
        assert_eq!(
            config.checkout.participant_success_url,
            "https://eventigare.app/participant/payment/success"
        );
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_stripe_key_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_SECRET_KEY"))
        );
    }

    #[test]
    fn test_mock_gateway_without_key() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("EVENTI_GARE__PAYMENT__USE_MOCK_GATEWAY", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.payment.use_mock_gateway);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("EVENTI_GARE__SERVER__PORT", "3000");
        env::set_var("EVENTI_GARE__PAYMENT__COMMISSION_RATE", "0.05");
        env::set_var("EVENTI_GARE__STORAGE__SNAPSHOT_PATH", "/var/lib/eventi/payments.json");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.payment.commission_rate, dec!(0.05));
        assert_eq!(
            config.storage.snapshot_path,
            std::path::PathBuf::from("/var/lib/eventi/payments.json")
        );
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("EVENTI_GARE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }
}
