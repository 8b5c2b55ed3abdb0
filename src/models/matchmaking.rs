use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "queue_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Matched,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl ChatSession {
    /// The other participant, if `user_id` is in this session.
    pub fn partner_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_a == user_id {
            Some(self.user_b)
        } else if self.user_b == user_id {
            Some(self.user_a)
        } else {
            None
        }
    }
}

/// What the client sees: the session plus the partner's anonymous handle.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub partner_anonymous_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MatchStatus {
    Idle,
    Waiting { since: DateTime<Utc> },
    Matched { session: SessionView },
}
