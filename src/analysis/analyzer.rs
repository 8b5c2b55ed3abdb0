use serde::Serialize;

use super::{MoodLevel, StressLevel};

const STRESS_KEYWORDS: &[&str] = &[
    "stress", "stressed", "anxious", "anxiety", "overwhelmed", "pressure", "exam", "deadline",
    "worried", "panic", "nervous", "burnout",
];

const POSITIVE_KEYWORDS: &[&str] = &[
    "happy", "grateful", "excited", "good", "great", "calm", "relaxed", "proud", "joy", "hopeful",
];

const SAD_KEYWORDS: &[&str] = &[
    "sad", "lonely", "depressed", "down", "hopeless", "cry", "crying", "empty", "tired",
    "miserable",
];

pub const STRESS_ADDENDUM: &str =
    " Your note mentions stress or pressure. Remember to take breaks and breathe.";
pub const POSITIVE_ADDENDUM: &str =
    " Your note reflects positive feelings. Keep nurturing what is working for you.";
pub const SAD_ADDENDUM: &str =
    " Your note suggests you may be feeling down. Reaching out to someone you trust can help.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoodAnalysis {
    pub sentiment: String,
    pub stress_level: StressLevel,
}

/// Base sentence and stress score for a mood level.
pub fn baseline(mood: MoodLevel) -> (&'static str, StressLevel) {
    match mood.get() {
        1 => (
            "Very low mood detected. You seem to be struggling today.",
            StressLevel::clamped(5),
        ),
        2 => (
            "Low mood detected. Today seems difficult.",
            StressLevel::clamped(4),
        ),
        3 => (
            "Neutral mood detected. You seem to be doing okay.",
            StressLevel::clamped(3),
        ),
        4 => (
            "Positive mood detected. You seem to be doing well.",
            StressLevel::clamped(2),
        ),
        _ => (
            "Very positive mood detected. You seem to be thriving!",
            StressLevel::clamped(1),
        ),
    }
}

fn mentions_any(note: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| note.contains(k))
}

pub fn analyze(mood: MoodLevel, note: Option<&str>) -> MoodAnalysis {
    let (base, mut stress_level) = baseline(mood);
    let mut sentiment = base.to_string();

    let note = note.map(str::trim).filter(|n| !n.is_empty());
    if let Some(note) = note {
        let note = note.to_lowercase();

        if mentions_any(&note, STRESS_KEYWORDS) {
            sentiment.push_str(STRESS_ADDENDUM);
            stress_level = stress_level.raised();
        }
        if mood.get() >= 3 && mentions_any(&note, POSITIVE_KEYWORDS) {
            sentiment.push_str(POSITIVE_ADDENDUM);
        }
        if mood.get() <= 3 && mentions_any(&note, SAD_KEYWORDS) {
            sentiment.push_str(SAD_ADDENDUM);
        }
    }

    MoodAnalysis {
        sentiment,
        stress_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(n: i32) -> MoodLevel {
        MoodLevel::try_from(n).unwrap()
    }

    #[test]
    fn test_empty_note_uses_baseline_table() {
        let expected = [(1, 5), (2, 4), (3, 3), (4, 2), (5, 1)];
        for (mood, stress) in expected {
            let a = analyze(level(mood), None);
            assert_eq!(a.stress_level.get(), stress, "mood {}", mood);
            assert_eq!(a.sentiment, baseline(level(mood)).0);

            let blank = analyze(level(mood), Some("   "));
            assert_eq!(blank, a, "blank note should match no note");
        }
    }

    #[test]
    fn test_stress_keywords_clamp_at_five() {
        let a = analyze(level(1), Some("I feel overwhelmed and exam stress"));
        assert_eq!(a.stress_level.get(), 5);
        assert!(a.sentiment.contains(baseline(level(1)).0));
        assert!(a.sentiment.contains(STRESS_ADDENDUM.trim()));
    }

    #[test]
    fn test_stress_keywords_raise_by_one() {
        let a = analyze(level(4), Some("Deadline tomorrow"));
        assert_eq!(a.stress_level.get(), 3);
    }

    #[test]
    fn test_multiple_stress_words_raise_once() {
        let a = analyze(level(3), Some("stress, anxiety, panic, exam pressure"));
        assert_eq!(a.stress_level.get(), 4);
        assert_eq!(a.sentiment.matches(STRESS_ADDENDUM).count(), 1);
    }

    #[test]
    fn test_positive_addendum_when_mood_is_good() {
        let a = analyze(level(4), Some("grateful and happy today"));
        assert!(a.sentiment.ends_with(POSITIVE_ADDENDUM));
        assert_eq!(a.stress_level.get(), 2);
    }

    #[test]
    fn test_positive_addendum_skipped_for_low_mood() {
        let a = analyze(level(2), Some("trying to stay happy"));
        assert!(!a.sentiment.contains(POSITIVE_ADDENDUM));
    }

    #[test]
    fn test_sad_addendum_only_for_mid_or_low_mood() {
        let low = analyze(level(2), Some("Feeling LONELY"));
        assert!(low.sentiment.contains(SAD_ADDENDUM));

        let high = analyze(level(5), Some("a bit tired but fine"));
        assert!(!high.sentiment.contains(SAD_ADDENDUM));
    }

    #[test]
    fn test_stress_always_in_range() {
        let notes = [
            None,
            Some(""),
            Some("stress"),
            Some("happy sad anxious"),
            Some("overwhelmed overwhelmed overwhelmed"),
        ];
        for mood in 1..=5 {
            for note in notes {
                let s = analyze(level(mood), note).stress_level.get();
                assert!((1..=5).contains(&s));
            }
        }
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let a = analyze(level(3), Some("Exam week, feeling calm though"));
        let b = analyze(level(3), Some("Exam week, feeling calm though"));
        assert_eq!(a, b);
    }
}
