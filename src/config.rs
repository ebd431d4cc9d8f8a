//! Runtime configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, `TRADENET_*` environment variables, and finally CLI
//! flags applied by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin. `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "tradenet.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of a login session
    pub session_hours: i64,
    /// bcrypt work factor for stored passwords
    pub bcrypt_cost: u32,
    pub password: PasswordPolicyConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            password: PasswordPolicyConfig::default(),
        }
    }
}

/// Which password complexity checks run on signup and password change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub reject_numeric: bool,
    pub reject_common: bool,
    pub reject_similar_to_user: bool,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            reject_numeric: true,
            reject_common: true,
            reject_similar_to_user: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override values from `TRADENET_*` variables returned by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TRADENET_DATABASE") {
            self.database.path = path;
        }
        if let Some(port) = lookup("TRADENET_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("TRADENET_PORT is not a valid port: {}", port))?;
        }
        if let Some(origin) = lookup("TRADENET_CORS_ORIGIN") {
            self.server.cors_origin = Some(origin);
        }
        if let Some(hours) = lookup("TRADENET_SESSION_HOURS") {
            self.auth.session_hours = hours
                .parse()
                .with_context(|| format!("TRADENET_SESSION_HOURS is not a number: {}", hours))?;
        }
        Ok(())
    }
}
