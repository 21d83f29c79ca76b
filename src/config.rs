// config.rs
// Environment configuration (loaded after dotenvy has read .env).

use std::{env, net::SocketAddr, time::Duration};
use thiserror::Error;

use crate::secrets::{DEFAULT_METADATA_HOST, DEFAULT_SECRET_MANAGER_ENDPOINT};
use crate::signature::DEFAULT_TOLERANCE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretBackend {
    /// Google Secret Manager, scoped to `project_id`.
    Gcp,
    /// Environment variables named by the secret ids.
    Env,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub signing_secret_id: String,
    pub totp_secret_id: String,
    pub project_id: Option<String>,
    pub secret_backend: SecretBackend,
    pub secret_cache_ttl: Duration,
    pub timestamp_tolerance: Duration,
    pub metadata_host: String,
    pub secret_manager_endpoint: String,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reading through `lookup`, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_backend = match get("SECRET_BACKEND").as_deref().map(str::trim) {
            None | Some("gcp") => SecretBackend::Gcp,
            Some("env") => SecretBackend::Env,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "SECRET_BACKEND",
                    value: other.to_string(),
                    reason: "expected gcp or env".into(),
                });
            }
        };

        let bind_addr = match (get("BIND_ADDR"), get("PORT")) {
            (Some(addr), _) => parse_var("BIND_ADDR", &addr)?,
            (None, Some(port)) => SocketAddr::from(([0, 0, 0, 0], parse_var("PORT", &port)?)),
            (None, None) => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        Ok(Config {
            signing_secret_id: get("SLACK_SIGNING_SECRET_SECRET_ID")
                .ok_or(ConfigError::Missing("SLACK_SIGNING_SECRET_SECRET_ID"))?,
            totp_secret_id: get("TOTP_SECRET_SECRET_ID")
                .ok_or(ConfigError::Missing("TOTP_SECRET_SECRET_ID"))?,
            project_id: get("GOOGLE_CLOUD_PROJECT"),
            secret_backend,
            secret_cache_ttl: match get("SECRET_CACHE_TTL_SECONDS") {
                Some(v) => Duration::from_secs(parse_var("SECRET_CACHE_TTL_SECONDS", &v)?),
                None => Duration::ZERO,
            },
            timestamp_tolerance: match get("SLACK_TIMESTAMP_TOLERANCE_SECONDS") {
                Some(v) => Duration::from_secs(parse_var("SLACK_TIMESTAMP_TOLERANCE_SECONDS", &v)?),
                None => DEFAULT_TOLERANCE,
            },
            metadata_host: get("GCE_METADATA_HOST")
                .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string()),
            secret_manager_endpoint: get("SECRET_MANAGER_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_SECRET_MANAGER_ENDPOINT.to_string()),
            mongodb_uri: get("MONGODB_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            mongodb_db: get("MONGODB_DB").unwrap_or_else(|| "totp".to_string()),
            bind_addr,
        })
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
