// totp.rs
// TOTP utilities: decode the hex seed and derive the current code.

use thiserror::Error;
use totp_rs::{Algorithm, TOTP};

pub const DIGITS: usize = 6;
pub const PERIOD_SECONDS: u64 = 60; // deliberately longer than the usual 30s

#[derive(Debug, Error, PartialEq)]
pub enum SeedError {
    #[error("TOTP seed is empty")]
    Empty,
    #[error("TOTP seed is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Decodes the hex-encoded seed stored in the secret store.
/// Surrounding whitespace (a trailing newline from `gcloud secrets create`) is ignored.
pub fn decode_seed(seed_hex: &str) -> Result<Vec<u8>, SeedError> {
    let trimmed = seed_hex.trim();
    if trimmed.is_empty() {
        return Err(SeedError::Empty);
    }
    Ok(hex::decode(trimmed)?)
}

/// Build a TOTP instance: SHA1, 6 digits, 60 second steps.
/// Seeds shorter than 128 bits are accepted as-is, since the seed is shared with
/// authenticators that were enrolled outside this service.
pub fn build_totp(seed: Vec<u8>) -> TOTP {
    TOTP::new_unchecked(
        Algorithm::SHA1,
        DIGITS,
        1, // skew, unused for generation
        PERIOD_SECONDS,
        seed,
    )
}

/// Code for the step containing `unix_seconds`.
pub fn generate_at(seed: Vec<u8>, unix_seconds: u64) -> String {
    build_totp(seed).generate(unix_seconds)
}
