// lib.rs
// Slack slash command that answers with the current TOTP code.
//
// Request flow (POST /):
// - verify the Slack v0 signature with the signing secret
// - parse the form body and require team_domain, channel_name, user_name
// - append a TotpGenerateLog audit record
// - derive the 60-second TOTP from the hex seed and return it as text/plain

pub mod command;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod secrets;
pub mod signature;
pub mod state;
pub mod totp;

pub use error::GenerateError;
pub use state::AppState;
