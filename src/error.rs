// error.rs
// Everything that can stop a slash command, and how each maps to an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::command::FormError;
use crate::secrets::SecretError;
use crate::signature::SignatureError;
use crate::state::AuditError;
use crate::totp::SeedError;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("read body: {0}")]
    BodyRead(String),
    #[error("get secret {secret_id}: {source}")]
    SecretAccess {
        secret_id: String,
        #[source]
        source: SecretError,
    },
    #[error("verify signature: {0}")]
    SignatureVerification(#[from] SignatureError),
    #[error("parse body: {0}")]
    BodyParse(#[from] FormError),
    #[error("invalid request body: {0}")]
    Validation(String),
    #[error("put TOTP generate log: {0}")]
    Persistence(#[from] AuditError),
    #[error("decode secret: {0}")]
    SecretFormat(#[from] SeedError),
}

impl GenerateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GenerateError::BodyRead(_)
            | GenerateError::BodyParse(_)
            | GenerateError::Validation(_) => StatusCode::BAD_REQUEST,
            GenerateError::SignatureVerification(_) => StatusCode::UNAUTHORIZED,
            GenerateError::SecretAccess { .. }
            | GenerateError::Persistence(_)
            | GenerateError::SecretFormat(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent back to Slack. Never includes the cause.
    pub fn public_message(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::BAD_REQUEST => "Invalid request",
            _ => "Generate error",
        }
    }
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "generate TOTP failed");
        } else {
            tracing::warn!(error = %self, "generate TOTP rejected");
        }
        (status, self.public_message()).into_response()
    }
}
