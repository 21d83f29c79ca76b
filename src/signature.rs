// signature.rs
// Slack request signing (v0): https://api.slack.com/authentication/verifying-requests-from-slack

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(5 * 60);
const VERSION: &str = "v0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("{0} header is not visible ASCII")]
    InvalidHeader(&'static str),
    #[error("unparseable timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("timestamp {timestamp} is {skew}s away from local time")]
    Expired { timestamp: i64, skew: i64 },
    #[error("signature is not in v0=<hex> form")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
    #[error("signing secret rejected as HMAC key")]
    InvalidKey,
}

/// Checks the signature and timestamp headers of a Slack request against `body`.
/// Anything that cannot be checked is an error; there is no "skip" outcome.
pub fn verify_request(
    signing_secret: &str,
    headers: &HeaderMap,
    body: &[u8],
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let signature = header_str(headers, SIGNATURE_HEADER)?;
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_string()))?;
    let skew = now.timestamp().saturating_sub(ts).saturating_abs();
    if skew as u64 > tolerance.as_secs() {
        return Err(SignatureError::Expired { timestamp: ts, skew });
    }

    let provided = signature
        .strip_prefix(VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(SignatureError::Malformed)?;
    let provided = hex::decode(provided).map_err(|_| SignatureError::Malformed)?;

    // verify_slice compares in constant time
    signed_mac(signing_secret, timestamp, body)?
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

/// `v0=<hex>` signature Slack would send for this timestamp and body.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
    let digest = signed_mac(signing_secret, timestamp, body)?
        .finalize()
        .into_bytes();
    Ok(format!("{VERSION}={}", hex::encode(digest)))
}

fn signed_mac(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<HmacSha256, SignatureError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| SignatureError::InvalidKey)?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .ok_or(SignatureError::MissingHeader(name))?
        .to_str()
        .map_err(|_| SignatureError::InvalidHeader(name))
}
