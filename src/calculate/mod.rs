//! Statistics calculation engine.
//!
//! Computes derived metrics from fetched record trees:
//! - Per-entity statistics (wins, podiums, rates, averages)
//! - Eligible race sets for multi-entity comparisons
//! - Battle tallies between compared entities
//! - Result tables for display and CSV export

pub mod aggregate;
pub mod battle;
pub mod filter;
pub mod table;

pub use aggregate::aggregate;
pub use battle::{
    calculate_battle, rank_instance, Battle, BattleRound, BattleTally, HeadToHead, RankedEntry,
};
pub use filter::{
    championship_intersection, eligible_instances, raced_championships, shared_team,
};
pub use table::{extract_rows, filter_by_year, to_csv, years, ResultCell, ResultRow};

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Percentage of `part` in `total`, rounded to one decimal. Zero when `total` is zero.
pub fn calculate_rate(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        round_to(part as f64 / total as f64 * 100.0, 1)
    }
}

/// Mean of a sum over a count, rounded to two decimals. Zero when `count` is zero.
pub fn calculate_average(sum: u64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        round_to(sum as f64 / count as f64, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ComparisonMode, Entity, EntityKind, Position, RaceInstance, RecordTree, SessionResult,
    };
    use pretty_assertions::assert_eq;

    fn two_race_event(id: &str, sprint: (&str, &str), feature: (&str, &str)) -> Entity {
        let mut tree = RecordTree::default();
        tree.insert(
            "2024",
            "f2",
            "bahrain",
            "Sprint",
            SessionResult::with_position(sprint.0).with_team(sprint.1),
        );
        tree.insert(
            "2024",
            "f2",
            "bahrain",
            "Feature",
            SessionResult::with_position(feature.0).with_team(feature.1),
        );
        Entity::new(id, EntityKind::Driver, id).with_seasons(tree)
    }

    #[test]
    fn test_first_race_session_is_used_everywhere() {
        let entities = vec![
            two_race_event("a", ("1", "prema"), ("9", "campos")),
            two_race_event("b", ("5", "art"), ("2", "campos")),
        ];
        let instance = RaceInstance::new("2024", "f2", "bahrain");

        // "Feature" sorts before "Sprint", so it is the session compared.
        let round = rank_instance(&entities, &instance);
        assert_eq!(round.leader, Some("b".into()));
        assert_eq!(round.ranking[0].position, Some(Position::Finish(2)));
        assert_eq!(round.ranking[1].position, Some(Position::Finish(9)));

        let eligible = eligible_instances(&entities, ComparisonMode::All);
        let rows = extract_rows(&entities, &eligible);
        assert_eq!(rows.len(), 1);
        let labels: Vec<String> = rows[0].cells.iter().map(|c| c.race_label()).collect();
        assert_eq!(labels, vec!["9", "2"]);
        assert_eq!(rows[0].cells[0].team.as_deref(), Some("campos"));

        assert_eq!(shared_team(&entities, &instance), Some("campos"));
        assert_eq!(
            eligible_instances(&entities, ComparisonMode::SameTeam).len(),
            1
        );

        // Aggregation still counts both race sessions.
        let a = aggregate(&entities[0].seasons);
        assert_eq!(a.races, 2);
        assert_eq!(a.wins, 1);
        assert_eq!(a.finished_races, 2);
        assert_eq!(a.teams.len(), 2);
    }

    #[test]
    fn test_calculate_rate() {
        assert_eq!(calculate_rate(1, 3), 33.3);
        assert_eq!(calculate_rate(2, 3), 66.7);
        assert_eq!(calculate_rate(5, 5), 100.0);
        assert_eq!(calculate_rate(0, 0), 0.0);
        assert_eq!(calculate_rate(3, 0), 0.0);
    }

    #[test]
    fn test_calculate_average() {
        assert_eq!(calculate_average(7, 3), 2.33);
        assert_eq!(calculate_average(10, 4), 2.5);
        assert_eq!(calculate_average(0, 0), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.005, 1), 1.0);
        assert_eq!(round_to(2.456, 2), 2.46);
        assert_eq!(round_to(f64::NAN, 2), 0.0);
    }
}
