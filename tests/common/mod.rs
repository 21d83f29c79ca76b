#![allow(dead_code)]

use std::{
    env,
    sync::{Arc, Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use futures::future::BoxFuture;
use mongodb::{Client, Database};
use tower::ServiceExt; // for oneshot

use slacktotp::{
    models::TotpGenerateLog,
    routes,
    secrets::StaticSecretStore,
    signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sign},
    state::{AppState, AuditError, AuditLogStore, MemoryAuditLog, MongoAuditLog},
};

pub const SIGNING_SECRET_ID: &str = "slack-signing-secret";
pub const TOTP_SECRET_ID: &str = "totp-secret";
pub const SIGNING_SECRET: &str = "shhh";
pub const SEED_HEX: &str = "deadbeefcafebabe00112233445566778899aabb";
/// Fixed "now" for every request; the code for SEED_HEX in this step is CODE_AT_NOW.
pub const NOW: i64 = 1_700_000_000;
pub const CODE_AT_NOW: &str = "999310";
pub const BODY: &str = "team_domain=acme&channel_name=general&user_name=alice";

/// Audit store that refuses every append.
pub struct FailingAuditLog;

impl AuditLogStore for FailingAuditLog {
    fn append<'a>(&'a self, _record: &'a TotpGenerateLog) -> BoxFuture<'a, Result<(), AuditError>> {
        Box::pin(async { Err(AuditError::Unavailable("datastore down".into())) })
    }
}

pub fn secrets() -> StaticSecretStore {
    StaticSecretStore::new()
        .with_secret(SIGNING_SECRET_ID, SIGNING_SECRET)
        .with_secret(TOTP_SECRET_ID, SEED_HEX)
}

pub fn state_with(secrets: StaticSecretStore, audit: Arc<dyn AuditLogStore>) -> AppState {
    AppState::new(Arc::new(secrets), audit, SIGNING_SECRET_ID, TOTP_SECRET_ID)
        .with_clock(Arc::new(|| Utc.timestamp_opt(NOW, 0).unwrap()))
}

pub fn build_app(state: AppState) -> Router {
    routes::router(Arc::new(state))
}

/// App over the default secrets and a fresh in-memory audit log.
pub fn memory_app() -> (Router, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::new());
    (build_app(state_with(secrets(), audit.clone())), audit)
}

pub fn signed_request(secret: &str, timestamp: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .header(TIMESTAMP_HEADER, timestamp)
        .header(SIGNATURE_HEADER, sign(secret, timestamp, body.as_bytes()).unwrap())
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
    let res = app.oneshot(req).await.expect("request failed");
    let status = res.status();
    let body_bytes = to_bytes(res.into_body(), 1024 * 1024)
        .await
        .expect("body read failed");
    (status, String::from_utf8_lossy(&body_bytes).to_string())
}

/// Global lock so integration tests that touch MongoDB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct MongoContext {
    pub audit: MongoAuditLog,
    pub db: Database,
    _guard: MutexGuard<'static, ()>,
}

/// Connects to MONGODB_URI with a throwaway database, or returns None to skip.
pub async fn setup_mongo() -> Option<MongoContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("failed to lock test db mutex");

    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| {
        "mongodb://localhost:27017/?serverSelectionTimeoutMS=2000".to_string()
    });
    let db_name = format!(
        "slacktotptest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );

    let client = match Client::with_uri_str(&uri).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            return None;
        }
    };
    let db = client.database(&db_name);
    if let Err(err) = db.drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        return None;
    }

    Some(MongoContext {
        audit: MongoAuditLog::new(&db),
        db,
        _guard: guard,
    })
}

pub async fn teardown(ctx: Option<MongoContext>) {
    if let Some(ctx) = ctx {
        let _ = ctx.db.drop().await;
        drop(ctx);
    }
}
