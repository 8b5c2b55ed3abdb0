use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

const AUTH_MAX_REQUESTS: u32 = 5;
const AUTH_WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window counter keyed by arbitrary strings. In-memory, so limits are
/// per process.
#[derive(Clone)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
    max_requests: u32,
    window: Duration,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new(AUTH_MAX_REQUESTS, AUTH_WINDOW)
    }
}

impl RateLimitState {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Ok(remaining) when allowed, Err(retry_after) when limited.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests {
            return Err(self
                .window
                .saturating_sub(now.duration_since(entry.window_start)));
        }

        entry.count += 1;
        Ok(self.max_requests - entry.count)
    }

    /// Drop entries whose window ended more than one window ago.
    pub async fn cleanup(&self) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let keep_for = self.window * 2;
        entries.retain(|_, entry| now.duration_since(entry.window_start) < keep_for);
    }

    pub fn spawn_cleanup_worker(&self) {
        let limiter = self.clone();
        let period = self.window * 2;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }
}

/// Per IP and path, so /login and /register have separate budgets.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = addr.ip().to_string();
    let path = req.uri().path().to_string();
    let key = format!("{}:{}", ip, path);

    match state.rate_limiter.check(&key).await {
        Ok(remaining) => {
            tracing::debug!(ip = %ip, path = %path, remaining, "Rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                ip = %ip,
                path = %path,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}
