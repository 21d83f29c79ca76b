// state module: AppState, initialization, and the audit log store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mongodb::Client;
use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::config::{Config, SecretBackend};
use crate::secrets::{
    CachedSecretStore, EnvSecretStore, GcpSecretManager, MetadataClient, SecretStore,
};
use crate::signature::DEFAULT_TOLERANCE;

mod audit;

pub use audit::*;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Everything a request needs, built once at startup and shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pub secrets: Arc<dyn SecretStore>,
    pub audit: Arc<dyn AuditLogStore>,
    pub signing_secret_id: String,
    pub totp_secret_id: String,
    pub timestamp_tolerance: Duration,
    pub clock: Clock,
}

impl AppState {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        audit: Arc<dyn AuditLogStore>,
        signing_secret_id: impl Into<String>,
        totp_secret_id: impl Into<String>,
    ) -> Self {
        Self {
            secrets,
            audit,
            signing_secret_id: signing_secret_id.into(),
            totp_secret_id: totp_secret_id.into(),
            timestamp_tolerance: DEFAULT_TOLERANCE,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_timestamp_tolerance(mut self, tolerance: Duration) -> Self {
        self.timestamp_tolerance = tolerance;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub async fn init_state(config: &Config) -> Result<AppState> {
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .context("invalid MONGODB_URI")?;
    let db = client.database(&config.mongodb_db);
    let audit: Arc<dyn AuditLogStore> = Arc::new(MongoAuditLog::new(&db));

    let mut secrets: Arc<dyn SecretStore> = match config.secret_backend {
        SecretBackend::Gcp => {
            let project_id = resolve_project_id(config).await?;
            info!(%project_id, "using Secret Manager");
            Arc::new(
                GcpSecretManager::new(
                    project_id,
                    &config.metadata_host,
                    &config.secret_manager_endpoint,
                )
                .context("new secret manager client")?,
            )
        }
        SecretBackend::Env => Arc::new(EnvSecretStore),
    };
    if !config.secret_cache_ttl.is_zero() {
        secrets = Arc::new(CachedSecretStore::new(secrets, config.secret_cache_ttl));
    }

    Ok(AppState::new(
        secrets,
        audit,
        config.signing_secret_id.clone(),
        config.totp_secret_id.clone(),
    )
    .with_timestamp_tolerance(config.timestamp_tolerance))
}

/// GOOGLE_CLOUD_PROJECT when set, otherwise whatever the metadata server reports.
async fn resolve_project_id(config: &Config) -> Result<String> {
    match &config.project_id {
        Some(id) => Ok(id.clone()),
        None => MetadataClient::new(reqwest::Client::new(), &config.metadata_host)
            .project_id()
            .await
            .context("get project ID from metadata server"),
    }
}
