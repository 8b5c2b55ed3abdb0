use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;

use moodmate_api::{app::build_router, config::Config, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodmate_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to create database pool")?;
    tracing::info!("Database pool ready");

    let state = AppState::new(pool, config.clone());
    state.rate_limiter.spawn_cleanup_worker();

    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    // Connect info feeds the per-IP auth rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
