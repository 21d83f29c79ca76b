// secrets module: the SecretStore seam plus its implementations.

use futures::future::BoxFuture;
use std::{collections::HashMap, env};
use thiserror::Error;

mod cache;
mod gcp;
#[cfg(test)]
pub(crate) mod mock;

pub use cache::CachedSecretStore;
pub use gcp::{
    DEFAULT_METADATA_HOST, DEFAULT_SECRET_MANAGER_ENDPOINT, GcpSecretManager, MetadataClient,
};

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {0} not found")]
    NotFound(String),
    #[error("access to secret {0} denied")]
    AccessDenied(String),
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
    #[error("secret store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid secret payload: {0}")]
    InvalidPayload(String),
}

/// Resolves a secret identifier to the latest value of that secret.
pub trait SecretStore: Send + Sync {
    fn resolve<'a>(&'a self, secret_id: &'a str) -> BoxFuture<'a, Result<String, SecretError>>;
}

/// Fixed in-memory secrets, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    values: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(secret_id.into(), value.into());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn resolve<'a>(&'a self, secret_id: &'a str) -> BoxFuture<'a, Result<String, SecretError>> {
        let found = self
            .values
            .get(secret_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_id.to_string()));
        Box::pin(async move { found })
    }
}

/// Reads the environment variable named by the identifier on every call.
/// Meant for local development (SECRET_BACKEND=env).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn resolve<'a>(&'a self, secret_id: &'a str) -> BoxFuture<'a, Result<String, SecretError>> {
        let found = env::var(secret_id).map_err(|e| match e {
            env::VarError::NotPresent => SecretError::NotFound(secret_id.to_string()),
            env::VarError::NotUnicode(_) => {
                SecretError::InvalidPayload(format!("{secret_id} is not valid UTF-8"))
            }
        });
        Box::pin(async move { found })
    }
}
