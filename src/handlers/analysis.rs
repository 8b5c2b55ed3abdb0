//! `POST /functions/v1/analyze-mood`
//!
//! Runs the fixed-rule analyzer over a freshly written mood log, stores the
//! sentiment and stress level on the log and inserts its recommendations.
//! Every failure is logged and reported as `400 {"error": "..."}`; the route
//! is served with permissive CORS so any origin can call it.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::analysis::{analyze, generate_recommendations, MoodLevel};
use crate::auth::middleware::AuthUser;
use crate::dto::{AnalyzeMoodRequest, AnalyzeMoodResponse};
use crate::AppState;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct AnalysisError(String);

impl From<sqlx::Error> for AnalysisError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error during mood analysis");
        AnalysisError("Failed to store mood analysis".into())
    }
}

impl From<JsonRejection> for AnalysisError {
    fn from(rejection: JsonRejection) -> Self {
        AnalysisError(rejection.body_text())
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "Mood analysis failed");
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.0 }))).into_response()
    }
}

#[derive(sqlx::FromRow)]
struct PendingLog {
    user_id: Uuid,
    mood_level: i32,
    note: Option<String>,
    analyzed: bool,
}

/// Notes are stored trimmed with blanks as NULL, so compare them that way.
fn normalize_note(note: Option<&str>) -> Option<&str> {
    note.map(str::trim).filter(|n| !n.is_empty())
}

pub async fn analyze_mood(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<AnalyzeMoodRequest>, JsonRejection>,
) -> Result<Json<AnalyzeMoodResponse>, AnalysisError> {
    let Json(body) = payload?;
    let mood = MoodLevel::try_from(body.mood_level).map_err(AnalysisError)?;

    let mut tx = state.db.begin().await?;

    let pending = sqlx::query_as::<_, PendingLog>(
        r#"
        SELECT user_id, mood_level, note, analyzed_at IS NOT NULL AS analyzed
        FROM mood_logs
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(body.mood_log_id)
    .fetch_optional(&mut *tx)
    .await?
    .filter(|log| log.user_id == auth_user.id)
    .ok_or_else(|| AnalysisError("Mood log not found".into()))?;

    if pending.analyzed {
        return Err(AnalysisError("Mood log has already been analyzed".into()));
    }
    if pending.mood_level != i32::from(mood) {
        return Err(AnalysisError(
            "mood_level does not match the stored mood log".into(),
        ));
    }
    if normalize_note(body.note.as_deref()) != normalize_note(pending.note.as_deref()) {
        return Err(AnalysisError("note does not match the stored mood log".into()));
    }

    let analysis = analyze(mood, pending.note.as_deref());
    let recommendations = generate_recommendations(mood, analysis.stress_level);

    sqlx::query(
        r#"
        UPDATE mood_logs
        SET sentiment = $2, stress_level = $3, analyzed_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(body.mood_log_id)
    .bind(&analysis.sentiment)
    .bind(i32::from(analysis.stress_level))
    .execute(&mut *tx)
    .await?;

    for (position, rec) in recommendations.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO recommendations (id, mood_log_id, title, description, content_url, category, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(body.mood_log_id)
        .bind(rec.title)
        .bind(rec.description)
        .bind(rec.content_url)
        .bind(rec.category)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        user_id = %auth_user.id,
        mood_log_id = %body.mood_log_id,
        stress_level = analysis.stress_level.get(),
        recommendations = recommendations.len(),
        "Mood log analyzed"
    );

    Ok(Json(AnalyzeMoodResponse {
        success: true,
        analysis,
        recommendations: recommendations.len(),
    }))
}
