//! Runtime server configuration
//!
//! AppConfig is built once at startup from environment variables and is
//! immutable for the lifetime of the process.
//!
//! | Variable               | Default                 |
//! |------------------------|-------------------------|
//! | `COTION_DATABASE_PATH` | `./data/cotion.db`      |
//! | `PORT`                 | `3000`                  |
//! | `CORS_ORIGIN`          | `http://localhost:5173` |

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_DATABASE_PATH: &str = "./data/cotion.db";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Runtime configuration for the page server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite database file, created with its parent directories if missing
    pub database_path: PathBuf,

    /// TCP port the HTTP server listens on
    pub port: u16,

    /// The single browser origin allowed by CORS
    pub cors_origin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            port: DEFAULT_PORT,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
        }
    }
}

impl AppConfig {
    /// Build the config from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup
    ///
    /// Unset and empty variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let database_path = get("COTION_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("PORT", &raw, e.to_string()))?,
            None => defaults.port,
        };

        let cors_origin = match get("CORS_ORIGIN") {
            Some(origin) => {
                let origin = origin.trim().trim_end_matches('/').to_string();
                if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                    return Err(ConfigError::invalid(
                        "CORS_ORIGIN",
                        &origin,
                        "expected an http(s) origin",
                    ));
                }
                origin
            }
            None => defaults.cors_origin,
        };

        Ok(Self {
            database_path,
            port,
            cors_origin,
        })
    }

    /// Address the server binds to (all interfaces)
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
