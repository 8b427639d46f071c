//! Session name classification.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NON_RACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"practice|warm-?up|^(starting[\s-]?)?grid$").expect("static session pattern")
});

/// Whether a session counts towards race statistics.
///
/// Practice, warm-up and grid sessions never do. Otherwise the name must
/// contain "race" or be exactly "final", "feature" or "sprint".
pub fn is_race_session(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    if lower.is_empty() || NON_RACE.is_match(&lower) {
        return false;
    }
    lower.contains("race") || matches!(lower.as_str(), "final" | "feature" | "sprint")
}

/// Whether a session is a qualifying session.
pub fn is_qualifying_session(name: &str) -> bool {
    name.to_lowercase().contains("qualifying")
}

/// Single-answer classification of a session name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Race,
    Qualifying,
    Other,
}

impl SessionKind {
    /// Classify a session name. Race takes precedence over qualifying.
    pub fn classify(name: &str) -> Self {
        if is_race_session(name) {
            SessionKind::Race
        } else if is_qualifying_session(name) {
            SessionKind::Qualifying
        } else {
            SessionKind::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_sessions() {
        assert!(is_race_session("Race"));
        assert!(is_race_session("Race 2"));
        assert!(is_race_session("Feature Race"));
        assert!(is_race_session("FINAL"));
        assert!(is_race_session("feature"));
        assert!(is_race_session("Sprint"));
    }

    #[test]
    fn test_non_race_sessions() {
        assert!(!is_race_session("Free Practice 1"));
        assert!(!is_race_session("Warm-up"));
        assert!(!is_race_session("Warmup"));
        assert!(!is_race_session("Grid"));
        assert!(!is_race_session("Starting Grid"));
        assert!(!is_race_session("starting-grid"));
        assert!(!is_race_session("Qualifying"));
        assert!(!is_race_session("Sprint Shootout"));
    }

    #[test]
    fn test_practice_overrides_race_keyword() {
        assert!(!is_race_session("Race Practice"));
    }

    #[test]
    fn test_qualifying_sessions() {
        assert!(is_qualifying_session("Qualifying"));
        assert!(is_qualifying_session("Sprint Qualifying"));
        assert!(!is_qualifying_session("Quali"));
        assert!(!is_qualifying_session("Qualification Round"));
    }

    #[test]
    fn test_empty_name() {
        assert!(!is_race_session(""));
        assert!(!is_qualifying_session(""));
        assert_eq!(SessionKind::classify(""), SessionKind::Other);
    }

    #[test]
    fn test_classify() {
        assert_eq!(SessionKind::classify("Race"), SessionKind::Race);
        assert_eq!(SessionKind::classify("Qualifying"), SessionKind::Qualifying);
        assert_eq!(SessionKind::classify("Practice 2"), SessionKind::Other);
    }
}
