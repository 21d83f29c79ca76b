// models.rs
// Slash command payload and the audit document stored in MongoDB.

use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Collection holding one document per accepted slash command.
pub const GENERATE_LOG_COLLECTION: &str = "totp_generate_log";

/// The fields of a Slack slash command this service cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub team_domain: String,
    pub channel_name: String,
    pub user_name: String,
}

/// Audit record: who asked for a code, from where and when.
/// Written once, never updated, so created_at == updated_at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TotpGenerateLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub team_domain: String,
    pub channel_name: String,
    pub user_name: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl TotpGenerateLog {
    pub fn new(command: &SlashCommand, now: ChronoDateTime<Utc>) -> Self {
        let at = DateTime::from_chrono(now);
        Self {
            id: None,
            team_domain: command.team_domain.clone(),
            channel_name: command.channel_name.clone(),
            user_name: command.user_name.clone(),
            created_at: at,
            updated_at: at,
        }
    }
}
