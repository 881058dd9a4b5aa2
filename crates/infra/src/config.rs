//! Configuration loading and representation.
//!
//! Everything comes from the environment and is read once at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// Credentials of the first administrator, created when the directory has no
/// users yet.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    /// In-memory directory when absent.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("token_ttl_minutes", &self.token_ttl.num_minutes())
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Automation Hub".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            jwt_secret: DEV_SECRET.to_string(),
            token_ttl: Duration::minutes(60),
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        let token_ttl = match get("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(raw) => {
                let minutes: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                if !(1..=60 * 24 * 30).contains(&minutes) {
                    return Err(ConfigError::Invalid {
                        key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                        value: raw,
                        reason: "must be between 1 and 43200".to_string(),
                    });
                }
                Duration::minutes(minutes)
            }
            None => defaults.token_ttl,
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.bind_addr,
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Incomplete(
                    "BOOTSTRAP_ADMIN_EMAIL",
                    "BOOTSTRAP_ADMIN_PASSWORD",
                ));
            }
        };

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or(defaults.app_name),
            bind_addr,
            database_url: get("DATABASE_URL"),
            jwt_secret,
            token_ttl,
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.app_name, "Automation Hub");
        assert_eq!(cfg.token_ttl, Duration::minutes(60));
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert!(cfg.database_url.is_none());
        assert!(cfg.bootstrap_admin.is_none());
        assert_eq!(cfg.jwt_secret, DEV_SECRET);
    }

    #[test]
    fn reads_overrides() {
        let cfg = load(&[
            ("JWT_SECRET", "prod-secret"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "15"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://hub@localhost/hub"),
            ("APP_NAME", "Hub"),
            ("BOOTSTRAP_ADMIN_EMAIL", "admin@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "admin"),
        ])
        .unwrap();

        assert_eq!(cfg.jwt_secret, "prod-secret");
        assert_eq!(cfg.token_ttl, Duration::minutes(15));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://hub@localhost/hub"));
        assert_eq!(cfg.app_name, "Hub");
        assert_eq!(cfg.bootstrap_admin.unwrap().email, "admin@example.com");
    }

    #[test]
    fn bad_ttl_is_an_error() {
        for bad in ["abc", "0", "-5"] {
            assert!(matches!(
                load(&[("ACCESS_TOKEN_EXPIRE_MINUTES", bad)]),
                Err(ConfigError::Invalid { key: "ACCESS_TOKEN_EXPIRE_MINUTES", .. })
            ));
        }
    }

    #[test]
    fn half_configured_bootstrap_admin_is_an_error() {
        assert!(matches!(
            load(&[("BOOTSTRAP_ADMIN_EMAIL", "admin@example.com")]),
            Err(ConfigError::Incomplete(..))
        ));
    }

    #[test]
    fn debug_hides_secrets() {
        let cfg = load(&[
            ("JWT_SECRET", "super-secret-value"),
            ("DATABASE_URL", "postgres://u:pw@h/db"),
            ("BOOTSTRAP_ADMIN_EMAIL", "admin@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "hunter2"),
        ])
        .unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("super-secret-value"));
        assert!(!shown.contains("pw@"));
        assert!(!shown.contains("hunter2"));
    }
}
