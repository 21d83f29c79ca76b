use futures::future::BoxFuture;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, time::Instant};

use super::{SecretError, SecretStore};

/// Keeps resolved values for `ttl`, so a rotated secret is picked up at most
/// `ttl` after rotation. Failures are not cached.
pub struct CachedSecretStore {
    inner: Arc<dyn SecretStore>,
    ttl: Duration,
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl CachedSecretStore {
    pub fn new(inner: Arc<dyn SecretStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn cached(&self, secret_id: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(secret_id)
            .filter(|(_, fetched_at)| fetched_at.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }
}

impl SecretStore for CachedSecretStore {
    fn resolve<'a>(&'a self, secret_id: &'a str) -> BoxFuture<'a, Result<String, SecretError>> {
        Box::pin(async move {
            if let Some(value) = self.cached(secret_id).await {
                return Ok(value);
            }
            let value = self.inner.resolve(secret_id).await?;
            self.entries
                .write()
                .await
                .insert(secret_id.to_string(), (value.clone(), Instant::now()));
            Ok(value)
        })
    }
}
