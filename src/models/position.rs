//! Position normalization.
//!
//! Raw positions arrive as strings ("3", "DNF", "Did not start") or numbers.
//! [`Position::normalize`] is the only place that interprets them; every
//! aggregator, filter and table goes through it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw `position` value exactly as the results source sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPosition {
    Number(f64),
    Text(String),
}

impl From<&str> for RawPosition {
    fn from(s: &str) -> Self {
        RawPosition::Text(s.to_string())
    }
}

impl From<u32> for RawPosition {
    fn from(n: u32) -> Self {
        RawPosition::Number(n as f64)
    }
}

/// Category of a session outcome without a meaningful rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NonFinishKind {
    Dnf,
    Dns,
    Dsq,
}

impl fmt::Display for NonFinishKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonFinishKind::Dnf => write!(f, "DNF"),
            NonFinishKind::Dns => write!(f, "DNS"),
            NonFinishKind::Dsq => write!(f, "DSQ"),
        }
    }
}

/// Normalized session outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Position {
    /// Classified finish at the given rank (1 = winner).
    Finish(u32),
    NonFinish(NonFinishKind),
}

const DNF_MARKERS: [&str; 5] = ["DNF", "NC", "RET", "RETIRED", "WD"];

impl Position {
    /// Normalize a raw position. Never fails: anything unrecognised is a DNF.
    pub fn normalize(raw: Option<&RawPosition>) -> Self {
        match raw {
            None => Position::NonFinish(NonFinishKind::Dnf),
            Some(RawPosition::Number(n)) => Self::from_number(*n),
            Some(RawPosition::Text(s)) => Self::from_text(s),
        }
    }

    fn from_number(n: f64) -> Self {
        if n.is_finite() && n.fract() == 0.0 && n >= 1.0 && n <= u32::MAX as f64 {
            Position::Finish(n as u32)
        } else {
            Position::NonFinish(NonFinishKind::Dnf)
        }
    }

    fn from_text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Position::NonFinish(NonFinishKind::Dnf);
        }

        let upper = trimmed.to_uppercase();
        if upper == "DSQ" || upper.contains("DISQUALIFIED") {
            return Position::NonFinish(NonFinishKind::Dsq);
        }
        if upper == "DNS" || upper.contains("NOT START") {
            return Position::NonFinish(NonFinishKind::Dns);
        }
        if DNF_MARKERS.contains(&upper.as_str()) {
            return Position::NonFinish(NonFinishKind::Dnf);
        }

        match trimmed.parse::<i64>() {
            Ok(rank) if rank > 0 && rank <= u32::MAX as i64 => Position::Finish(rank as u32),
            _ => Position::NonFinish(NonFinishKind::Dnf),
        }
    }

    /// Finishing rank, if classified.
    pub fn rank(&self) -> Option<u32> {
        match self {
            Position::Finish(rank) => Some(*rank),
            Position::NonFinish(_) => None,
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Position::Finish(_))
    }

    /// Display label ("3", "DNF", ...).
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Finish(rank) => write!(f, "{}", rank),
            Position::NonFinish(kind) => write!(f, "{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Position {
        Position::normalize(Some(&RawPosition::from(s)))
    }

    #[test]
    fn test_absent_is_dnf() {
        assert_eq!(
            Position::normalize(None),
            Position::NonFinish(NonFinishKind::Dnf)
        );
    }

    #[test]
    fn test_blank_is_dnf() {
        assert_eq!(text(""), Position::NonFinish(NonFinishKind::Dnf));
        assert_eq!(text("   "), Position::NonFinish(NonFinishKind::Dnf));
    }

    #[test]
    fn test_disqualified() {
        assert_eq!(text("DSQ"), Position::NonFinish(NonFinishKind::Dsq));
        assert_eq!(text("dsq"), Position::NonFinish(NonFinishKind::Dsq));
        assert_eq!(text("Disqualified"), Position::NonFinish(NonFinishKind::Dsq));
    }

    #[test]
    fn test_did_not_start() {
        assert_eq!(text("DNS"), Position::NonFinish(NonFinishKind::Dns));
        assert_eq!(text("Did not start"), Position::NonFinish(NonFinishKind::Dns));
    }

    #[test]
    fn test_retirement_markers() {
        for marker in ["DNF", "nc", "Ret", "RETIRED", "wd"] {
            assert_eq!(
                text(marker),
                Position::NonFinish(NonFinishKind::Dnf),
                "marker {}",
                marker
            );
        }
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(text("1"), Position::Finish(1));
        assert_eq!(text(" 12 "), Position::Finish(12));
    }

    #[test]
    fn test_invalid_numbers_are_dnf() {
        assert_eq!(text("0"), Position::NonFinish(NonFinishKind::Dnf));
        assert_eq!(text("-4"), Position::NonFinish(NonFinishKind::Dnf));
        assert_eq!(text("P3"), Position::NonFinish(NonFinishKind::Dnf));
        assert_eq!(text("2.5"), Position::NonFinish(NonFinishKind::Dnf));
    }

    #[test]
    fn test_json_numbers() {
        assert_eq!(
            Position::normalize(Some(&RawPosition::Number(4.0))),
            Position::Finish(4)
        );
        assert_eq!(
            Position::normalize(Some(&RawPosition::Number(0.0))),
            Position::NonFinish(NonFinishKind::Dnf)
        );
        assert_eq!(
            Position::normalize(Some(&RawPosition::Number(f64::NAN))),
            Position::NonFinish(NonFinishKind::Dnf)
        );
    }

    #[test]
    fn test_raw_position_deserializes_either_shape() {
        let n: RawPosition = serde_json::from_str("7").unwrap();
        let s: RawPosition = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(Position::normalize(Some(&n)), Position::Finish(7));
        assert_eq!(Position::normalize(Some(&s)), Position::Finish(7));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Position::Finish(3).label(), "3");
        assert_eq!(Position::NonFinish(NonFinishKind::Dsq).label(), "DSQ");
        assert_eq!(Position::Finish(3).rank(), Some(3));
        assert_eq!(Position::NonFinish(NonFinishKind::Dns).rank(), None);
    }
}
