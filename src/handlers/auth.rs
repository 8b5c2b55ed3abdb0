use axum::{extract::State, Extension, Json};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    jwt::{create_token_pair, hash_token, verify_token, TokenPair, TokenType},
    middleware::AuthUser,
    password::{hash_password, verify_password},
};
use crate::config::Config;
use crate::dto::{LoginRequest, MessageResponse, RefreshRequest, RegisterRequest};
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::user::{generate_anonymous_id, User, UserProfile, UserRole};
use crate::AppState;

async fn store_refresh_token(
    db: &PgPool,
    user_id: Uuid,
    raw_refresh_token: &str,
    ttl_secs: i64,
    parent_token_id: Option<Uuid>,
) -> AppResult<Uuid> {
    let id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::seconds(ttl_secs);

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, parent_token_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(hash_token(raw_refresh_token))
    .bind(expires_at)
    .bind(parent_token_id)
    .execute(db)
    .await?;

    Ok(id)
}

/// Create a token pair and persist the refresh token hash.
async fn issue_token_pair(
    db: &PgPool,
    user_id: Uuid,
    email: &str,
    config: &Config,
    parent_token_id: Option<Uuid>,
) -> AppResult<TokenPair> {
    let tokens = create_token_pair(user_id, email, config)?;
    store_refresh_token(
        db,
        user_id,
        &tokens.refresh_token,
        config.jwt_refresh_ttl_secs,
        parent_token_id,
    )
    .await?;
    Ok(tokens)
}

async fn revoke_all_user_tokens(db: &PgPool, user_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = true, revoked_at = NOW()
        WHERE user_id = $1 AND revoked = false
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenPair>> {
    body.validate()?;
    let email = body.email.trim().to_lowercase();

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let pwd_hash = hash_password(&body.password)?;
    let user_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, role, anonymous_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&email)
    .bind(&pwd_hash)
    .bind(UserRole::Member)
    .bind(generate_anonymous_id())
    .execute(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Email already registered".into())
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(user_id = %user_id, "User registered");

    let tokens = issue_token_pair(&state.db, user_id, &email, &state.config, None).await?;
    Ok(Json(tokens))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    body.validate()?;
    let email = body.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let tokens = issue_token_pair(&state.db, user.id, &user.email, &state.config, None).await?;
    Ok(Json(tokens))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let token_data = verify_token(&body.refresh_token, &state.config)?;

    if token_data.claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized);
    }

    let (stored_id, stored_user_id, revoked) = sqlx::query_as::<_, (Uuid, Uuid, bool)>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE token_hash = $1
        "#,
    )
    .bind(hash_token(&body.refresh_token))
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Unauthorized)?;

    // A revoked token showing up again means the family leaked
    if revoked {
        tracing::warn!(
            user_id = %stored_user_id,
            token_id = %stored_id,
            "Refresh token reuse detected, revoking all tokens for user"
        );
        revoke_all_user_tokens(&state.db, stored_user_id).await?;
        return Err(AppError::Unauthorized);
    }

    if stored_user_id != token_data.claims.sub {
        return Err(AppError::Unauthorized);
    }

    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = true, revoked_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(stored_id)
    .execute(&state.db)
    .await?;

    let tokens = issue_token_pair(
        &state.db,
        token_data.claims.sub,
        &token_data.claims.email,
        &state.config,
        Some(stored_id),
    )
    .await?;
    Ok(Json(tokens))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<MessageResponse>> {
    revoke_all_user_tokens(&state.db, auth_user.id).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".into(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}
