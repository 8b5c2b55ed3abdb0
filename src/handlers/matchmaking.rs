use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::ServerEvent;
use crate::error::{AppError, AppResult};
use crate::models::matchmaking::{
    ChatSession, MatchStatus, QueueEntry, QueueStatus, SessionStatus, SessionView,
};
use crate::AppState;

async fn active_session<'e>(
    db: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Option<ChatSession>, sqlx::Error> {
    sqlx::query_as::<_, ChatSession>(
        r#"
        SELECT * FROM video_chat_sessions
        WHERE status = $2 AND (user_a = $1 OR user_b = $1)
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(SessionStatus::Active)
    .fetch_optional(db)
    .await
}

async fn anonymous_id<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT anonymous_id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
}

async fn session_view(state: &AppState, session: &ChatSession, viewer: Uuid) -> AppResult<SessionView> {
    let partner = session
        .partner_of(viewer)
        .ok_or(AppError::NotFound("Chat session not found".into()))?;

    Ok(SessionView {
        session_id: session.id,
        partner_anonymous_id: anonymous_id(&state.db, partner).await?,
        status: session.status,
        created_at: session.created_at,
    })
}

/// Push an event to connected WebSocket clients. Nobody listening is fine.
pub(crate) fn publish(state: &AppState, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            let _ = state.ws_tx.send(payload);
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode server event"),
    }
}

/// Pair the caller with the longest-waiting peer, or enqueue them.
///
/// Every join locks the caller's `users` row first and only claims a partner
/// whose queue row and `users` row can both be locked without waiting. A user
/// is therefore never part of two pairing transactions at once.
pub async fn join_queue(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<MatchStatus>> {
    let mut tx = state.db.begin().await?;

    // Blocks while another join is pairing this user
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(auth_user.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if let Some(session) = active_session(&mut *tx, auth_user.id).await? {
        tx.commit().await?;
        let session = session_view(&state, &session, auth_user.id).await?;
        return Ok(Json(MatchStatus::Matched { session }));
    }

    let stale = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM matchmaking_queue WHERE user_id = $1 AND status = $2",
    )
    .bind(auth_user.id)
    .bind(QueueStatus::Matched)
    .fetch_one(&mut *tx)
    .await?;
    if stale > 0 {
        tracing::warn!(user_id = %auth_user.id, "Matched queue entry without an active session");
        return Err(AppError::Conflict("Matchmaking state is out of date, retry".into()));
    }

    let partner = sqlx::query_as::<_, QueueEntry>(
        r#"
        SELECT q.* FROM matchmaking_queue q
        JOIN users u ON u.id = q.user_id
        WHERE q.status = $2 AND q.user_id <> $1
        ORDER BY q.created_at ASC
        LIMIT 1
        FOR UPDATE OF q, u SKIP LOCKED
        "#,
    )
    .bind(auth_user.id)
    .bind(QueueStatus::Waiting)
    .fetch_optional(&mut *tx)
    .await?;

    let partner = match partner {
        Some(partner) if active_session(&mut *tx, partner.user_id).await?.is_none() => {
            Some(partner)
        }
        Some(partner) => {
            tracing::warn!(user_id = %partner.user_id, "Dropping waiting entry of a user already in a session");
            sqlx::query("DELETE FROM matchmaking_queue WHERE id = $1")
                .bind(partner.id)
                .execute(&mut *tx)
                .await?;
            None
        }
        None => None,
    };

    let Some(partner) = partner else {
        sqlx::query(
            r#"
            INSERT INTO matchmaking_queue (id, user_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) WHERE status = 'waiting' DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(auth_user.id)
        .bind(QueueStatus::Waiting)
        .execute(&mut *tx)
        .await?;

        let entry = sqlx::query_as::<_, QueueEntry>(
            "SELECT * FROM matchmaking_queue WHERE user_id = $1 AND status = $2",
        )
        .bind(auth_user.id)
        .bind(QueueStatus::Waiting)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(user_id = %auth_user.id, "Queued for peer chat");
        return Ok(Json(MatchStatus::Waiting {
            since: entry.created_at,
        }));
    };

    let claimed =
        sqlx::query("UPDATE matchmaking_queue SET status = $2 WHERE id = $1 AND status = $3")
            .bind(partner.id)
            .bind(QueueStatus::Matched)
            .bind(QueueStatus::Waiting)
            .execute(&mut *tx)
            .await?;
    if claimed.rows_affected() != 1 {
        return Err(AppError::Conflict("Matchmaking state is out of date, retry".into()));
    }

    sqlx::query("DELETE FROM matchmaking_queue WHERE user_id = $1 AND status = $2")
        .bind(auth_user.id)
        .bind(QueueStatus::Waiting)
        .execute(&mut *tx)
        .await?;

    let session = sqlx::query_as::<_, ChatSession>(
        r#"
        INSERT INTO video_chat_sessions (id, user_a, user_b, status)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(partner.user_id)
    .bind(auth_user.id)
    .bind(SessionStatus::Active)
    .fetch_one(&mut *tx)
    .await?;

    let caller_handle = anonymous_id(&mut *tx, auth_user.id).await?;
    let partner_handle = anonymous_id(&mut *tx, partner.user_id).await?;
    tx.commit().await?;

    tracing::info!(session_id = %session.id, "Peer chat session created");

    publish(
        &state,
        &ServerEvent::Matched {
            user_id: partner.user_id,
            session_id: session.id,
            partner: caller_handle,
        },
    );
    publish(
        &state,
        &ServerEvent::Matched {
            user_id: auth_user.id,
            session_id: session.id,
            partner: partner_handle.clone(),
        },
    );

    Ok(Json(MatchStatus::Matched {
        session: SessionView {
            session_id: session.id,
            partner_anonymous_id: partner_handle,
            status: session.status,
            created_at: session.created_at,
        },
    }))
}

pub async fn leave_queue(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM matchmaking_queue WHERE user_id = $1 AND status = $2")
        .bind(auth_user.id)
        .bind(QueueStatus::Waiting)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "left": result.rows_affected() > 0 })))
}

pub async fn queue_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<MatchStatus>> {
    if let Some(session) = active_session(&state.db, auth_user.id).await? {
        let session = session_view(&state, &session, auth_user.id).await?;
        return Ok(Json(MatchStatus::Matched { session }));
    }

    let waiting = sqlx::query_as::<_, QueueEntry>(
        "SELECT * FROM matchmaking_queue WHERE user_id = $1 AND status = $2",
    )
    .bind(auth_user.id)
    .bind(QueueStatus::Waiting)
    .fetch_optional(&state.db)
    .await?;

    Ok(Json(match waiting {
        Some(entry) => MatchStatus::Waiting {
            since: entry.created_at,
        },
        None => MatchStatus::Idle,
    }))
}

pub async fn end_session(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ChatSession>> {
    let mut tx = state.db.begin().await?;

    let session = sqlx::query_as::<_, ChatSession>(
        r#"
        UPDATE video_chat_sessions
        SET status = $3, ended_at = NOW()
        WHERE id = $1 AND status = $4 AND (user_a = $2 OR user_b = $2)
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(auth_user.id)
    .bind(SessionStatus::Ended)
    .bind(SessionStatus::Active)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Active chat session not found".into()))?;

    sqlx::query("DELETE FROM matchmaking_queue WHERE user_id IN ($1, $2) AND status = $3")
        .bind(session.user_a)
        .bind(session.user_b)
        .bind(QueueStatus::Matched)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if let Some(partner) = session.partner_of(auth_user.id) {
        publish(
            &state,
            &ServerEvent::SessionEnded {
                user_id: partner,
                session_id: session.id,
            },
        );
    }

    Ok(Json(session))
}
