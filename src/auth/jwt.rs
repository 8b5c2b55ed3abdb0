use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
    #[serde(default)]
    pub jti: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

fn sign(claims: &Claims, config: &Config) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
}

pub fn create_access_token(user_id: Uuid, email: &str, config: &Config) -> AppResult<String> {
    let now = Utc::now();
    sign(
        &Claims {
            sub: user_id,
            email: email.to_string(),
            exp: (now + Duration::seconds(config.jwt_access_ttl_secs)).timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::Access,
            jti: None,
        },
        config,
    )
}

pub fn create_refresh_token(user_id: Uuid, email: &str, config: &Config) -> AppResult<String> {
    let now = Utc::now();
    // jti keeps two refresh tokens minted in the same second distinct
    sign(
        &Claims {
            sub: user_id,
            email: email.to_string(),
            exp: (now + Duration::seconds(config.jwt_refresh_ttl_secs)).timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::Refresh,
            jti: Some(Uuid::new_v4()),
        },
        config,
    )
}

pub fn create_token_pair(user_id: Uuid, email: &str, config: &Config) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access_token: create_access_token(user_id, email, config)?,
        refresh_token: create_refresh_token(user_id, email, config)?,
        expires_in: config.jwt_access_ttl_secs,
    })
}

/// SHA-256 of a raw token string, lowercase hex. Only hashes are stored.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}
