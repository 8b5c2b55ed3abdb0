use serde::Serialize;

use super::{MoodLevel, StressLevel};

pub const MAX_RECOMMENDATIONS: usize = 3;

/// A canned recommendation before it is attached to a mood log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecommendationTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub content_url: &'static str,
    pub category: &'static str,
}

const STRESS_RELIEF: &[RecommendationTemplate] = &[
    RecommendationTemplate {
        title: "Box Breathing Exercise",
        description: "Inhale for 4 seconds, hold for 4, exhale for 4, hold for 4. Repeat for five minutes to calm your nervous system.",
        content_url: "/resources/box-breathing",
        category: "stress-relief",
    },
    RecommendationTemplate {
        title: "Progressive Muscle Relaxation",
        description: "Tense and release each muscle group from your toes to your head to let go of physical tension.",
        content_url: "/resources/muscle-relaxation",
        category: "stress-relief",
    },
];

const MINDFULNESS: &[RecommendationTemplate] = &[RecommendationTemplate {
    title: "5-Minute Mindfulness Meditation",
    description: "A short guided meditation to bring your attention back to the present moment.",
    content_url: "/resources/mindfulness-5min",
    category: "mindfulness",
}];

const LOW_MOOD: &[RecommendationTemplate] = &[
    RecommendationTemplate {
        title: "Talk to a Peer",
        description: "Join an anonymous peer chat. Sharing how you feel with another student can lighten the load.",
        content_url: "/peer-chat",
        category: "support",
    },
    RecommendationTemplate {
        title: "Campus Counseling Services",
        description: "Professional counselors are available to talk confidentially. You do not have to go through this alone.",
        content_url: "/resources/counseling",
        category: "support",
    },
];

const NEUTRAL_MOOD: &[RecommendationTemplate] = &[
    RecommendationTemplate {
        title: "Take a Mindful Walk",
        description: "A 15-minute walk outside can lift your energy and clear your head.",
        content_url: "/resources/mindful-walk",
        category: "activity",
    },
    RecommendationTemplate {
        title: "Reflective Journaling",
        description: "Write down three things on your mind today and one small thing you are looking forward to.",
        content_url: "/resources/journaling",
        category: "activity",
    },
];

const GOOD_MOOD: &[RecommendationTemplate] = &[
    RecommendationTemplate {
        title: "Gratitude Journal",
        description: "Capture what went well today so you can come back to it on harder days.",
        content_url: "/resources/gratitude-journal",
        category: "positivity",
    },
    RecommendationTemplate {
        title: "Share the Good Vibes",
        description: "Reach out to a friend or a peer and pass some of your positive energy along.",
        content_url: "/peer-chat",
        category: "positivity",
    },
];

fn mood_tier(mood: MoodLevel) -> &'static [RecommendationTemplate] {
    match mood.get() {
        0..=2 => LOW_MOOD,
        3 => NEUTRAL_MOOD,
        _ => GOOD_MOOD,
    }
}

/// Stress relief first, then mindfulness, then items for the mood bucket.
/// Never returns more than [`MAX_RECOMMENDATIONS`] items.
pub fn generate_recommendations(
    mood: MoodLevel,
    stress: StressLevel,
) -> Vec<RecommendationTemplate> {
    let mut picks = Vec::with_capacity(MAX_RECOMMENDATIONS + 2);

    if stress.get() >= 4 {
        picks.extend_from_slice(STRESS_RELIEF);
    }
    if stress.get() >= 3 {
        picks.extend_from_slice(MINDFULNESS);
    }
    picks.extend_from_slice(mood_tier(mood));

    picks.truncate(MAX_RECOMMENDATIONS);
    picks
}
