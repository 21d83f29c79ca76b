// routes/mod.rs
// Route handlers and the router shared by the binary and the HTTP tests.

use axum::{Router, routing::post};
use std::sync::Arc;

use crate::state::AppState;

pub mod totp;

pub use totp::slash_command;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(slash_command))
        .with_state(state)
}
