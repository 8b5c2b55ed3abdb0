use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::dto::DashboardQuery;
use crate::error::AppResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub window_days: i64,
    pub total_users: i64,
    pub total_mood_logs: i64,
    pub analyzed_mood_logs: i64,
    pub average_mood: Option<f64>,
    pub average_stress: Option<f64>,
    pub high_stress_logs: i64,
    /// Mood level → number of logs, levels with no logs included as 0.
    pub mood_distribution: BTreeMap<i32, i64>,
    pub daily: Vec<DailyAggregate>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailyAggregate {
    pub day: NaiveDate,
    pub logs: i64,
    pub average_mood: Option<f64>,
    pub average_stress: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct Totals {
    total_mood_logs: i64,
    analyzed_mood_logs: i64,
    average_mood: Option<f64>,
    average_stress: Option<f64>,
    high_stress_logs: i64,
}

/// Fill in every level 1..=5 so the chart never has gaps.
fn full_distribution(rows: Vec<(i32, i64)>) -> BTreeMap<i32, i64> {
    let mut dist: BTreeMap<i32, i64> = (1..=5).map(|level| (level, 0)).collect();
    for (level, count) in rows {
        dist.insert(level, count);
    }
    dist
}

/// Aggregates over all users' mood logs within the window. Admin only.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardResponse>> {
    let window_days = query.window_days();
    let since = Utc::now() - Duration::days(window_days);

    let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;

    let totals = sqlx::query_as::<_, Totals>(
        r#"
        SELECT
            COUNT(*) AS total_mood_logs,
            COUNT(analyzed_at) AS analyzed_mood_logs,
            AVG(mood_level)::float8 AS average_mood,
            AVG(stress_level)::float8 AS average_stress,
            COUNT(*) FILTER (WHERE stress_level >= 4) AS high_stress_logs
        FROM mood_logs
        WHERE created_at >= $1
        "#,
    )
    .bind(since)
    .fetch_one(&state.db)
    .await?;

    let distribution = sqlx::query_as::<_, (i32, i64)>(
        r#"
        SELECT mood_level, COUNT(*)
        FROM mood_logs
        WHERE created_at >= $1
        GROUP BY mood_level
        "#,
    )
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    let daily = sqlx::query_as::<_, DailyAggregate>(
        r#"
        SELECT
            (created_at AT TIME ZONE 'UTC')::date AS day,
            COUNT(*) AS logs,
            AVG(mood_level)::float8 AS average_mood,
            AVG(stress_level)::float8 AS average_stress
        FROM mood_logs
        WHERE created_at >= $1
        GROUP BY day
        ORDER BY day ASC
        "#,
    )
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DashboardResponse {
        window_days,
        total_users,
        total_mood_logs: totals.total_mood_logs,
        analyzed_mood_logs: totals.analyzed_mood_logs,
        average_mood: totals.average_mood,
        average_stress: totals.average_stress,
        high_stress_logs: totals.high_stress_logs,
        mood_distribution: full_distribution(distribution),
        daily,
    }))
}
