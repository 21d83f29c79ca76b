use futures::{future::BoxFuture, stream::TryStreamExt};
use mongodb::{Collection, Database, bson::doc};
use std::sync::Mutex;
use thiserror::Error;

use crate::models::{GENERATE_LOG_COLLECTION, TotpGenerateLog};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only sink for TotpGenerateLog records.
pub trait AuditLogStore: Send + Sync {
    fn append<'a>(&'a self, record: &'a TotpGenerateLog) -> BoxFuture<'a, Result<(), AuditError>>;
}

#[derive(Clone)]
pub struct MongoAuditLog {
    logs: Collection<TotpGenerateLog>,
}

impl MongoAuditLog {
    pub fn new(db: &Database) -> Self {
        Self {
            logs: db.collection::<TotpGenerateLog>(GENERATE_LOG_COLLECTION),
        }
    }

    /// All records, oldest first. Not used by the request path.
    pub async fn list(&self) -> Result<Vec<TotpGenerateLog>, AuditError> {
        let mut cursor = self.logs.find(doc! {}).sort(doc! { "created_at": 1 }).await?;
        let mut logs = Vec::new();
        while let Some(log) = cursor.try_next().await? {
            logs.push(log);
        }
        Ok(logs)
    }
}

impl AuditLogStore for MongoAuditLog {
    fn append<'a>(&'a self, record: &'a TotpGenerateLog) -> BoxFuture<'a, Result<(), AuditError>> {
        Box::pin(async move {
            self.logs.insert_one(record).await?;
            Ok(())
        })
    }
}

/// Keeps records in process memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<TotpGenerateLog>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TotpGenerateLog> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AuditLogStore for MemoryAuditLog {
    fn append<'a>(&'a self, record: &'a TotpGenerateLog) -> BoxFuture<'a, Result<(), AuditError>> {
        let result = self
            .records
            .lock()
            .map(|mut records| records.push(record.clone()))
            .map_err(|_| AuditError::Unavailable("memory audit log poisoned".into()));
        Box::pin(async move { result })
    }
}
