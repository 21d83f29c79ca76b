// command.rs
// The slash command use case: verify, parse, audit, derive.

use axum::http::HeaderMap;
use thiserror::Error;
use tracing::info;

use crate::error::GenerateError;
use crate::models::{SlashCommand, TotpGenerateLog};
use crate::signature;
use crate::state::AppState;
use crate::totp;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("invalid percent escape at byte {0}")]
    InvalidEscape(usize),
    #[error("invalid semicolon separator in form body")]
    Semicolon,
}

/// Parses an application/x-www-form-urlencoded body into ordered pairs.
/// Broken `%` escapes and `;` separators are errors rather than passed through.
pub fn parse_form(body: &[u8]) -> Result<Vec<(String, String)>, FormError> {
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b';' => return Err(FormError::Semicolon),
            b'%' => {
                let valid = body
                    .get(i + 1..i + 3)
                    .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
                if !valid {
                    return Err(FormError::InvalidEscape(i));
                }
                i += 3;
            }
            _ => i += 1,
        }
    }
    Ok(url::form_urlencoded::parse(body).into_owned().collect())
}

impl SlashCommand {
    /// Pulls the three required fields out of a form body; first occurrence wins.
    pub fn from_form(body: &[u8]) -> Result<Self, GenerateError> {
        let pairs = parse_form(body)?;
        let field = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let command = SlashCommand {
            team_domain: field("team_domain"),
            channel_name: field("channel_name"),
            user_name: field("user_name"),
        };
        if command.team_domain.is_empty()
            || command.channel_name.is_empty()
            || command.user_name.is_empty()
        {
            return Err(GenerateError::Validation(
                String::from_utf8_lossy(body).into_owned(),
            ));
        }
        Ok(command)
    }
}

async fn resolve_secret(state: &AppState, secret_id: &str) -> Result<String, GenerateError> {
    state
        .secrets
        .resolve(secret_id)
        .await
        .map_err(|source| GenerateError::SecretAccess {
            secret_id: secret_id.to_string(),
            source,
        })
}

/// Runs one slash command end to end and returns the TOTP code.
///
/// The audit record is appended before the seed is fetched, so a record exists
/// for every authenticated, well-formed invocation even if derivation fails later.
pub async fn generate_totp(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<String, GenerateError> {
    let now = state.now();

    let signing_secret = resolve_secret(state, &state.signing_secret_id).await?;
    signature::verify_request(
        &signing_secret,
        headers,
        body,
        now,
        state.timestamp_tolerance,
    )?;

    let command = SlashCommand::from_form(body)?;

    state
        .audit
        .append(&TotpGenerateLog::new(&command, now))
        .await?;

    let seed_hex = resolve_secret(state, &state.totp_secret_id).await?;
    let seed = totp::decode_seed(&seed_hex)?;
    let code = totp::generate_at(seed, now.timestamp().max(0) as u64);

    info!(
        team_domain = %command.team_domain,
        channel_name = %command.channel_name,
        user_name = %command.user_name,
        "TOTP generated"
    );
    Ok(code)
}
