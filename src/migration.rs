//! Best-effort SQL file runner used by the `migrate` binary.
//!
//! The file is split on `;` and each statement is executed on its own, in
//! order, outside any transaction. A failing statement is logged and the run
//! carries on, so a partially applied file is possible and running the same
//! file twice is not idempotent. Splitting is naive: a `;` inside a string
//! literal or a function body splits the statement.

use sqlx::{Executor, PgPool};

pub const DEFAULT_SQL_PATH: &str = "sql/schema.sql";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: usize,
    pub failed: usize,
}

impl MigrationReport {
    pub fn total(&self) -> usize {
        self.applied + self.failed
    }
}

/// True when a chunk holds nothing but whitespace and `--` comments.
fn is_blank(chunk: &str) -> bool {
    chunk
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

pub fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .filter(|chunk| !is_blank(chunk))
        .map(|chunk| chunk.trim().to_string())
        .collect()
}

/// First line of a statement that is not a comment, for log lines.
fn summary(statement: &str) -> &str {
    statement
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("--"))
        .unwrap_or(statement)
}

pub async fn run_statements(pool: &PgPool, statements: &[String]) -> MigrationReport {
    let mut report = MigrationReport::default();

    for (i, statement) in statements.iter().enumerate() {
        let index = i + 1;
        match pool.execute(statement.as_str()).await {
            Ok(_) => {
                report.applied += 1;
                tracing::info!(index, statement = summary(statement), "Statement applied");
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(
                    index,
                    statement = summary(statement),
                    error = %e,
                    "Statement failed, continuing"
                );
            }
        }
    }

    report
}
