//! Derived statistics models.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Per-year breakdown used by profile charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonStats {
    pub races: u32,
    pub wins: u32,
    pub podiums: u32,
    pub dnf: u32,
    pub points: f64,
}

/// Statistics derived from one entity's record tree.
///
/// `podiums` counts P2 and P3 only; add `wins` for the conventional figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Race sessions entered
    pub races: u32,

    /// Qualifying sessions entered
    pub qualifying_sessions: u32,

    pub wins: u32,
    pub podiums: u32,
    pub top5: u32,
    pub top10: u32,

    /// Classified finishes outside the top 10
    pub other_finishes: u32,

    pub dnf: u32,
    pub dsq: u32,
    pub dns: u32,

    /// Qualifying sessions won
    pub poles: u32,

    pub fastest_laps: u32,
    pub finished_races: u32,

    /// Points scored in race sessions
    pub total_points: f64,

    /// Mean finishing position over classified race finishes (0 if none)
    pub avg_position: f64,

    /// Mean qualifying position over classified qualifying results (0 if none)
    pub avg_qualifying: f64,

    /// `avg_position - avg_qualifying`; positive means positions lost on race day
    pub qualifying_vs_race_delta: f64,

    /// Percentages of `races`, one decimal
    pub win_rate: f64,
    pub podium_rate: f64,
    pub finish_rate: f64,
    pub dnf_rate: f64,

    pub championships: BTreeSet<String>,
    pub teams: BTreeSet<String>,

    pub first_year: Option<String>,
    pub last_year: Option<String>,

    /// Race statistics per year
    pub seasons: BTreeMap<String, SeasonStats>,
}

impl DerivedStats {
    /// Wins plus P2/P3 finishes.
    pub fn podiums_including_wins(&self) -> u32 {
        self.wins + self.podiums
    }

    /// Every race is either finished or a non-finish of exactly one kind.
    pub fn is_partitioned(&self) -> bool {
        self.finished_races + self.dnf + self.dsq + self.dns == self.races
    }

    pub fn has_results(&self) -> bool {
        self.races > 0 || self.qualifying_sessions > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty_and_partitioned() {
        let stats = DerivedStats::default();
        assert!(stats.is_partitioned());
        assert!(!stats.has_results());
        assert_eq!(stats.avg_position, 0.0);
    }

    #[test]
    fn test_podiums_including_wins() {
        let stats = DerivedStats {
            wins: 3,
            podiums: 5,
            ..Default::default()
        };
        assert_eq!(stats.podiums_including_wins(), 8);
    }

    #[test]
    fn test_partition_detects_mismatch() {
        let stats = DerivedStats {
            races: 4,
            finished_races: 2,
            dnf: 1,
            ..Default::default()
        };
        assert!(!stats.is_partitioned());
    }

    #[test]
    fn test_serialization() {
        let mut stats = DerivedStats {
            races: 2,
            wins: 1,
            ..Default::default()
        };
        stats.championships.insert("formula-1".to_string());

        let json = serde_json::to_string(&stats).unwrap();
        let deserialized: DerivedStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, deserialized);
    }
}
