pub mod allocator;
pub mod config;
pub mod discord;
pub mod error;
pub mod storage;

use crate::allocator::Allocator;
use crate::config::Config;
use crate::discord::audit::AuditLog;
use crate::discord::client::DiscordInterface;
use crate::discord::interactions::handle_interaction;
use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub allocator: Arc<Allocator>,
    pub discord: Arc<dyn DiscordInterface>,
    pub audit: AuditLog,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "linkdrop",
        "version": VERSION
    }))
}

pub async fn root() -> &'static str {
    "🔗 linkdrop - unique links by DM"
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhooks/discord", post(handle_interaction))
        .with_state(state)
}
