use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::broadcast;

pub mod analysis;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod models;

use auth::rate_limit::RateLimitState;
use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    /// Fan-out for WebSocket pushes. Payloads carry a `user_id` recipient.
    pub ws_tx: broadcast::Sender<String>,
    pub rate_limiter: RateLimitState,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let (ws_tx, _) = broadcast::channel::<String>(256);
        Self {
            db,
            config,
            ws_tx,
            rate_limiter: RateLimitState::default(),
        }
    }
}
