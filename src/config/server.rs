//! HTTP listener, logging and deployment settings

use serde::Deserialize;
use std::net::SocketAddr;

use super::error::ValidationError;
use super::split_list;

const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Listener and logging settings, read from `EVENTI_GARE__SERVER__*`.
///
/// Every field is optional in the environment; missing ones take the
/// values of [`ServerConfig::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// JSON log lines for log shippers.
    pub log_json: bool,
    pub request_timeout_secs: u64,
    /// Comma-separated browser origins for CORS.
    pub cors_origins: Option<String>,
}

/// Deployment the server runs in.
///
/// Production refuses the mock checkout gateway.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ValidationError::InvalidAddress(raw))
    }

    /// Origins allowed by the CORS layer; empty means no cross-origin access.
    pub fn allowed_origins(&self) -> Vec<String> {
        split_list(self.cors_origins.as_deref())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        self.socket_addr().map(|_| ())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::Development,
            log_level: "info,eventi_gare=debug,tower_http=info".to_string(),
            log_json: false,
            request_timeout_secs: 30,
            cors_origins: None,
        }
    }
}
