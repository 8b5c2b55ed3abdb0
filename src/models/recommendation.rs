use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recommendation {
    pub id: Uuid,
    pub mood_log_id: Uuid,
    pub title: String,
    pub description: String,
    pub content_url: String,
    pub category: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}
