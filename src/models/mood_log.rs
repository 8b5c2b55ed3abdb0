use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::recommendation::Recommendation;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MoodLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_level: i32,
    pub note: Option<String>,
    pub sentiment: Option<String>,
    pub stress_level: Option<i32>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MoodLogQuery {
    /// "7d", "14d", "30d" or "90d". Default: "30d"
    pub range: Option<String>,
}

impl MoodLogQuery {
    pub fn range_days(&self) -> i64 {
        match self.range.as_deref() {
            Some("7d") => 7,
            Some("14d") => 14,
            Some("90d") => 90,
            _ => 30,
        }
    }
}

/// Latest analyzed log with its recommendations, as shown on the insights page.
#[derive(Debug, Serialize)]
pub struct MoodInsight {
    #[serde(flatten)]
    pub log: MoodLog,
    pub recommendations: Vec<Recommendation>,
}
