// routes/totp.rs
// POST / (Slack slash command, form-encoded) -> current TOTP code as text/plain.

use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::command::generate_totp;
use crate::error::GenerateError;
use crate::state::AppState;

/// Reads the whole body itself so signature checks run over the exact bytes Slack signed.
pub async fn slash_command(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("slash_command", %request_id);

    async move {
        let body = match body {
            Ok(body) => body,
            Err(rejection) => return GenerateError::BodyRead(rejection.body_text()).into_response(),
        };
        match generate_totp(&st, &headers, &body).await {
            Ok(code) => (
                StatusCode::OK,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                code,
            )
                .into_response(),
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}
