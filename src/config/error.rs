//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid socket address: {0}")]
    InvalidAddress(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid Stripe secret key format")]
    InvalidStripeKey,

    #[error("Mock checkout gateway is not allowed in production")]
    MockGatewayInProduction,

    #[error("Payment session length must be between 1 and 1440 minutes")]
    InvalidSessionLength,

    #[error("Rate {0} must be between 0 and 1")]
    InvalidRate(&'static str),

    #[error("Amount {0} must not be negative")]
    NegativeAmount(&'static str),

    #[error("Invalid redirect URL for {0}")]
    InvalidRedirectUrl(&'static str),

    #[error("Storage path {0} must not be empty")]
    EmptyPath(&'static str),
}
