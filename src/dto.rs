//! # MoodMate — Request/Response DTOs
//!
//! API contract types shared by the handlers.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Field validation is expressed via `validator` derive macros

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::analysis::MoodAnalysis;

// ============================================================================
// Auth
// ============================================================================

/// POST /api/auth/register
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 254, message = "Email too long"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// POST /api/auth/login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// POST /api/auth/refresh
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Mood logs
// ============================================================================

/// POST /api/mood-logs
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMoodLogRequest {
    /// 1 = very bad, 5 = very good
    #[validate(range(min = 1, max = 5, message = "Mood level must be 1-5"))]
    pub mood_level: i32,

    #[validate(length(max = 5000, message = "Note must be under 5000 characters"))]
    pub note: Option<String>,
}

// ============================================================================
// Analysis function
// ============================================================================

/// POST /functions/v1/analyze-mood
#[derive(Debug, Deserialize)]
pub struct AnalyzeMoodRequest {
    pub mood_log_id: Uuid,
    pub mood_level: i32,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeMoodResponse {
    pub success: bool,
    pub analysis: MoodAnalysis,
    /// Number of recommendation rows inserted.
    pub recommendations: usize,
}

// ============================================================================
// Peer chat
// ============================================================================

/// Text frame a client sends over `/ws`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatMessageFrame {
    pub session_id: Uuid,
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

/// Frames the server pushes over `/ws`. `user_id` is the recipient and is
/// used for routing only.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Matched {
        user_id: Uuid,
        session_id: Uuid,
        partner: String,
    },
    ChatMessage {
        user_id: Uuid,
        session_id: Uuid,
        from: String,
        body: String,
    },
    SessionEnded {
        user_id: Uuid,
        session_id: Uuid,
    },
}

// ============================================================================
// Admin
// ============================================================================

/// GET /api/admin/dashboard query params
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub days: Option<i64>,
}

impl DashboardQuery {
    /// Window length in days, default 30, clamped to [1, 365].
    pub fn window_days(&self) -> i64 {
        self.days.unwrap_or(30).clamp(1, 365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mood_log_validation() {
        let ok = CreateMoodLogRequest {
            mood_level: 3,
            note: Some("fine".into()),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateMoodLogRequest {
            mood_level: 7,
            note: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_register_requires_real_email() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "longenough".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_dashboard_window_clamped() {
        assert_eq!(DashboardQuery { days: None }.window_days(), 30);
        assert_eq!(DashboardQuery { days: Some(0) }.window_days(), 1);
        assert_eq!(DashboardQuery { days: Some(9999) }.window_days(), 365);
    }

    #[test]
    fn test_server_event_tagging() {
        let v = serde_json::to_value(ServerEvent::SessionEnded {
            user_id: Uuid::nil(),
            session_id: Uuid::nil(),
        })
        .unwrap();
        assert_eq!(v["type"], "session_ended");
        assert!(v.get("user_id").is_some());
    }
}
