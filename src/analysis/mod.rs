//! Fixed-rule mood analysis.
//!
//! Everything here is pure and deterministic: a mood level plus an optional
//! note always produce the same sentiment, stress level and recommendations.
//! There is no learned state and no I/O; the HTTP function in
//! `handlers::analysis` persists the results.

pub mod analyzer;
pub mod recommender;

use serde::{Deserialize, Serialize};

pub use analyzer::{analyze, MoodAnalysis};
pub use recommender::{generate_recommendations, RecommendationTemplate, MAX_RECOMMENDATIONS};

/// Self-reported mood, 1 (worst) to 5 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct MoodLevel(u8);

impl MoodLevel {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for MoodLevel {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(format!("mood_level must be between 1 and 5, got {}", value))
        }
    }
}

impl From<MoodLevel> for i32 {
    fn from(level: MoodLevel) -> Self {
        level.0 as i32
    }
}

/// Derived stress score. Always within [1, 5].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i32")]
pub struct StressLevel(u8);

impl StressLevel {
    const MIN: u8 = 1;
    const MAX: u8 = 5;

    /// Build a stress level, clamping into [1, 5].
    pub fn clamped(value: i32) -> Self {
        Self(value.clamp(Self::MIN as i32, Self::MAX as i32) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// One step higher, saturating at 5.
    pub fn raised(self) -> Self {
        Self(self.0.saturating_add(1).min(Self::MAX))
    }
}

impl From<StressLevel> for i32 {
    fn from(level: StressLevel) -> Self {
        level.0 as i32
    }
}
