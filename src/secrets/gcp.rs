// Google Secret Manager over REST, authenticated with the metadata server's
// default service account token.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::{sync::Mutex, time::Instant};

use super::{SecretError, SecretStore};

pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
pub const DEFAULT_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
// refresh a little before Google says the token expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Deserialize)]
struct SecretPayload {
    #[serde(default)]
    data: String,
}

/// Minimal client for the GCE/Cloud Run metadata server.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new(http: Client, host: &str) -> Self {
        Self {
            http,
            base_url: format!("http://{host}/computeMetadata/v1"),
        }
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, SecretError> {
        let res = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(SecretError::Unavailable(format!(
                "metadata {path}: HTTP {}",
                res.status()
            )));
        }
        Ok(res)
    }

    /// Project the workload runs in.
    pub async fn project_id(&self) -> Result<String, SecretError> {
        let id = self.get("project/project-id").await?.text().await?;
        let id = id.trim();
        if id.is_empty() {
            return Err(SecretError::Unavailable("metadata returned empty project id".into()));
        }
        Ok(id.to_string())
    }

    async fn access_token(&self) -> Result<AccessTokenResponse, SecretError> {
        Ok(self
            .get("instance/service-accounts/default/token")
            .await?
            .json::<AccessTokenResponse>()
            .await?)
    }
}

/// Secret store backed by Google Secret Manager; always reads `versions/latest`
/// unless the identifier names a version itself.
pub struct GcpSecretManager {
    http: Client,
    endpoint: String,
    project_id: String,
    metadata: MetadataClient,
    token: Mutex<Option<(String, Instant)>>,
}

impl GcpSecretManager {
    pub fn new(project_id: String, metadata_host: &str, endpoint: &str) -> Result<Self, SecretError> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            metadata: MetadataClient::new(http.clone(), metadata_host),
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            token: Mutex::new(None),
        })
    }

    async fn bearer_token(&self) -> Result<String, SecretError> {
        let mut token = self.token.lock().await;
        if let Some((value, expires_at)) = token.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(value.clone());
            }
        }
        let fresh = self.metadata.access_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *token = Some((fresh.access_token.clone(), Instant::now() + lifetime));
        Ok(fresh.access_token)
    }

    async fn access(&self, secret_id: &str) -> Result<String, SecretError> {
        let name = version_name(&self.project_id, secret_id);
        let token = self.bearer_token().await?;
        let res = self
            .http
            .get(format!("{}/v1/{name}:access", self.endpoint))
            .bearer_auth(token)
            .send()
            .await?;

        match res.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(SecretError::NotFound(name)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SecretError::AccessDenied(name));
            }
            status => {
                return Err(SecretError::Unavailable(format!("{name}: HTTP {status}")));
            }
        }

        let body = res.json::<AccessSecretVersionResponse>().await?;
        decode_payload(&body.payload.data)
    }
}

impl SecretStore for GcpSecretManager {
    fn resolve<'a>(&'a self, secret_id: &'a str) -> BoxFuture<'a, Result<String, SecretError>> {
        Box::pin(self.access(secret_id))
    }
}

/// Full resource name of the secret version to access.
fn version_name(project_id: &str, secret_id: &str) -> String {
    let base = if secret_id.starts_with("projects/") {
        secret_id.to_string()
    } else {
        format!("projects/{project_id}/secrets/{secret_id}")
    };
    if base.contains("/versions/") {
        base
    } else {
        format!("{base}/versions/latest")
    }
}

fn decode_payload(data: &str) -> Result<String, SecretError> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| SecretError::InvalidPayload(format!("payload is not base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| SecretError::InvalidPayload("payload is not UTF-8".into()))
}
