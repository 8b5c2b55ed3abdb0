use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::CreateMoodLogRequest;
use crate::error::{AppError, AppResult};
use crate::models::mood_log::{MoodInsight, MoodLog, MoodLogQuery};
use crate::models::recommendation::Recommendation;
use crate::AppState;

pub async fn create_mood_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateMoodLogRequest>,
) -> AppResult<(StatusCode, Json<MoodLog>)> {
    body.validate()?;

    let note = body
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let log = sqlx::query_as::<_, MoodLog>(
        r#"
        INSERT INTO mood_logs (id, user_id, mood_level, note)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.mood_level)
    .bind(note)
    .fetch_one(&state.db)
    .await?;

    tracing::debug!(user_id = %auth_user.id, mood_log_id = %log.id, "Mood log created");

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn list_mood_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MoodLogQuery>,
) -> AppResult<Json<Vec<MoodLog>>> {
    let since = Utc::now() - Duration::days(query.range_days());

    let logs = sqlx::query_as::<_, MoodLog>(
        r#"
        SELECT * FROM mood_logs
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}

/// Latest analyzed log plus its recommendations.
pub async fn latest_insight(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<MoodInsight>> {
    let log = sqlx::query_as::<_, MoodLog>(
        r#"
        SELECT * FROM mood_logs
        WHERE user_id = $1 AND analyzed_at IS NOT NULL
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("No analyzed mood log yet".into()))?;

    let recommendations = fetch_recommendations(&state, log.id).await?;

    Ok(Json(MoodInsight {
        log,
        recommendations,
    }))
}

pub async fn list_recommendations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(mood_log_id): Path<Uuid>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let owned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM mood_logs WHERE id = $1 AND user_id = $2",
    )
    .bind(mood_log_id)
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await?;

    if owned == 0 {
        return Err(AppError::NotFound("Mood log not found".into()));
    }

    Ok(Json(fetch_recommendations(&state, mood_log_id).await?))
}

async fn fetch_recommendations(
    state: &AppState,
    mood_log_id: Uuid,
) -> AppResult<Vec<Recommendation>> {
    let recs = sqlx::query_as::<_, Recommendation>(
        r#"
        SELECT * FROM recommendations
        WHERE mood_log_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(mood_log_id)
    .fetch_all(&state.db)
    .await?;
    Ok(recs)
}
