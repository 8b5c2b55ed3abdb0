use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::auth::jwt::{verify_token, TokenType};
use crate::error::AppError;
use crate::models::user::UserRole;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let token_data = verify_token(token, &state.config)?;

    if token_data.claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized);
    }

    let auth_user = AuthUser {
        id: token_data.claims.sub,
        email: Some(token_data.claims.email).filter(|e| !e.is_empty()),
    };

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

/// Layered inside `require_auth`. The role is read from the database rather
/// than the token so a demotion takes effect immediately.
pub async fn require_admin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if role != UserRole::Admin {
        tracing::warn!(user_id = %auth_user.id, "Non-admin attempted to access admin route");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(req).await)
}
