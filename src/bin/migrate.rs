//! Apply a SQL file statement by statement.
//!
//! Usage: `migrate [path]` (default `sql/schema.sql`). Needs `DATABASE_URL`.

use std::process::ExitCode;

use anyhow::Context;

use moodmate_api::migration::{run_statements, split_statements, DEFAULT_SQL_PATH};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodmate_api=info,migrate=info".into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Migration aborted: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.is_empty())
        .context("DATABASE_URL must be set")?;

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SQL_PATH.to_string());
    let sql = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;

    let statements = split_statements(&sql);
    tracing::info!(path = %path, statements = statements.len(), "Applying SQL file");

    let pool = moodmate_api::db::create_pool(&database_url, 1)
        .await
        .context("Failed to connect to database")?;

    let report = run_statements(&pool, &statements).await;
    if report.failed > 0 {
        tracing::warn!(
            total = report.total(),
            applied = report.applied,
            failed = report.failed,
            "Migration finished with failures"
        );
    } else {
        tracing::info!(
            total = report.total(),
            applied = report.applied,
            "Migration finished"
        );
    }

    Ok(())
}
