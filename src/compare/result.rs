//! Comparison results.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calculate::aggregate::compare_years;
use crate::calculate::{
    aggregate, calculate_battle, championship_intersection, eligible_instances, extract_rows,
    filter_by_year, raced_championships, round_to, to_csv, Battle, ResultRow,
};
use crate::models::{ComparisonMode, DerivedStats, Entity, EntityId, EntityKind};

/// Entity metadata and statistics as handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub nationality: Option<String>,
    pub image: Option<String>,
    pub metadata: BTreeMap<String, Value>,
    pub stats: DerivedStats,
}

impl EntitySummary {
    pub fn new(entity: &Entity, stats: DerivedStats) -> Self {
        Self {
            id: entity.id.clone(),
            kind: entity.kind,
            name: entity.display_name().to_string(),
            nationality: entity.nationality.clone(),
            image: entity.image.clone(),
            metadata: entity.metadata.clone(),
            stats,
        }
    }
}

/// Aggregate figures across all compared entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Championships every entity has raced in
    pub common_championships: BTreeSet<String>,

    /// Race instances admitted by the mode
    pub eligible_races: u32,

    pub total_races: u32,
    pub total_wins: u32,
    pub total_podiums: u32,
    pub total_points: f64,

    /// Earliest and latest years across all entities
    pub first_year: Option<String>,
    pub last_year: Option<String>,
}

/// Immutable output of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub mode: ComparisonMode,
    pub entities: Vec<EntitySummary>,
    pub battle: Battle,
    pub rows: Vec<ResultRow>,
    pub summary: ComparisonSummary,
}

impl ComparisonResult {
    /// Mode-specific message when no race was eligible.
    pub fn empty_hint(&self) -> Option<&'static str> {
        self.battle.is_empty().then(|| self.mode.empty_hint())
    }

    pub fn entity(&self, id: &EntityId) -> Option<&EntitySummary> {
        self.entities.iter().find(|e| &e.id == id)
    }

    /// Table rows for one year, without recomputing anything.
    pub fn rows_for_year(&self, year: &str) -> Vec<&ResultRow> {
        filter_by_year(&self.rows, year)
    }

    /// CSV export of the result table, optionally restricted to one year.
    pub fn to_csv(&self, year: Option<&str>) -> Result<String, csv::Error> {
        let names: Vec<&str> = self.entities.iter().map(|e| e.name.as_str()).collect();
        match year {
            Some(year) => to_csv(&names, self.rows_for_year(year)),
            None => to_csv(&names, &self.rows),
        }
    }
}

/// Run the full pipeline over already fetched entities.
pub fn build_comparison(entities: &[Entity], mode: ComparisonMode) -> ComparisonResult {
    let stats: Vec<DerivedStats> = entities.iter().map(|e| aggregate(&e.seasons)).collect();
    assemble(entities, &stats, mode)
}

/// Filter, battle and table over entities whose stats are already known.
///
/// `stats` must be in the same order as `entities`.
pub(crate) fn assemble(
    entities: &[Entity],
    stats: &[DerivedStats],
    mode: ComparisonMode,
) -> ComparisonResult {
    let eligible = eligible_instances(entities, mode);
    let battle = calculate_battle(entities, &eligible);
    let rows = extract_rows(entities, &eligible);
    let summary = summarize(entities, stats, eligible.len() as u32);

    let entities = entities
        .iter()
        .zip(stats)
        .map(|(entity, stats)| EntitySummary::new(entity, stats.clone()))
        .collect();

    ComparisonResult {
        mode,
        entities,
        battle,
        rows,
        summary,
    }
}

fn summarize(
    entities: &[Entity],
    stats: &[DerivedStats],
    eligible_races: u32,
) -> ComparisonSummary {
    let raced: Vec<BTreeSet<String>> = entities.iter().map(raced_championships).collect();
    let mut summary = ComparisonSummary {
        common_championships: championship_intersection(&raced),
        eligible_races,
        ..Default::default()
    };

    for s in stats {
        summary.total_races += s.races;
        summary.total_wins += s.wins;
        summary.total_podiums += s.podiums;
        summary.total_points += s.total_points;
    }
    summary.total_points = round_to(summary.total_points, 2);

    summary.first_year = stats
        .iter()
        .filter_map(|s| s.first_year.as_deref())
        .min_by(|a, b| compare_years(a, b))
        .map(str::to_string);
    summary.last_year = stats
        .iter()
        .filter_map(|s| s.last_year.as_deref())
        .max_by(|a, b| compare_years(a, b))
        .map(str::to_string);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordTree, SessionResult};
    use pretty_assertions::assert_eq;

    fn driver(id: &str, name: &str, races: &[(&str, &str, &str, &str)]) -> Entity {
        let mut tree = RecordTree::default();
        for (year, event, position, team) in races {
            tree.insert(
                year,
                "f1",
                event,
                "Race",
                SessionResult::with_position(*position)
                    .with_team(*team)
                    .with_points(1.0),
            );
        }
        Entity::new(id, EntityKind::Driver, name).with_seasons(tree)
    }

    fn scenario_a() -> Vec<Entity> {
        vec![
            driver(
                "x",
                "Driver X",
                &[
                    ("2023", "r1", "1", "t"),
                    ("2023", "r2", "1", "t"),
                    ("2023", "r3", "5", "t"),
                ],
            ),
            driver(
                "y",
                "Driver Y",
                &[
                    ("2023", "r1", "2", "t"),
                    ("2023", "r2", "3", "t"),
                    ("2023", "r3", "1", "t"),
                ],
            ),
        ]
    }

    #[test]
    fn test_scenario_a_battle() {
        let result = build_comparison(&scenario_a(), ComparisonMode::CommonRaces);

        assert_eq!(result.battle.finishes_ahead(&"x".into()), 2);
        assert_eq!(result.battle.finishes_ahead(&"y".into()), 1);
        assert_eq!(result.battle.common_races, 3);
        assert_eq!(result.rows.len(), 3);
        assert!(result.empty_hint().is_none());
    }

    #[test]
    fn test_scenario_b_empty_entity() {
        let mut entities = scenario_a();
        entities.push(Entity::new("z", EntityKind::Driver, "Driver Z"));

        let result = build_comparison(&entities, ComparisonMode::All);
        let z = result.entity(&"z".into()).unwrap();

        assert_eq!(z.stats, DerivedStats::default());
        assert_eq!(z.stats.avg_position, 0.0);
        assert_eq!(result.battle.finishes_ahead(&"z".into()), 0);
    }

    #[test]
    fn test_scenario_c_no_common_team() {
        let entities = vec![
            driver("a", "A", &[("2023", "r1", "1", "ferrari")]),
            driver("b", "B", &[("2023", "r1", "2", "ferrari")]),
            driver("c", "C", &[("2023", "r1", "3", "mclaren")]),
        ];
        let result = build_comparison(&entities, ComparisonMode::SameTeam);

        assert_eq!(result.battle.common_races, 0);
        assert!(result.rows.is_empty());
        assert_eq!(
            result.empty_hint(),
            Some(ComparisonMode::SameTeam.empty_hint())
        );
        assert_eq!(result.entities.len(), 3);
    }

    #[test]
    fn test_partition_holds_for_every_entity() {
        let entities = vec![
            driver(
                "a",
                "A",
                &[
                    ("2023", "r1", "DNF", "t"),
                    ("2023", "r2", "DSQ", "t"),
                    ("2022", "r3", "DNS", "t"),
                    ("2022", "r4", "", "t"),
                ],
            ),
            driver("b", "B", &[("2023", "r1", "garbage", "t")]),
        ];
        let result = build_comparison(&entities, ComparisonMode::All);

        for entity in &result.entities {
            assert!(entity.stats.is_partitioned(), "{}", entity.id);
        }
    }

    #[test]
    fn test_summary() {
        let entities = vec![
            driver("a", "A", &[("2021", "r1", "1", "t"), ("2023", "r2", "2", "t")]),
            driver("b", "B", &[("2019", "r1", "3", "t")]),
        ];
        let result = build_comparison(&entities, ComparisonMode::All);

        assert_eq!(result.summary.total_races, 3);
        assert_eq!(result.summary.total_wins, 1);
        assert_eq!(result.summary.total_podiums, 2);
        assert_eq!(result.summary.total_points, 3.0);
        assert_eq!(result.summary.eligible_races, 3);
        assert_eq!(result.summary.first_year.as_deref(), Some("2019"));
        assert_eq!(result.summary.last_year.as_deref(), Some("2023"));
        assert_eq!(
            result.summary.common_championships.iter().collect::<Vec<_>>(),
            vec!["f1"]
        );
    }

    #[test]
    fn test_common_championships_count_only_races() {
        let mut a = RecordTree::default();
        a.insert("2023", "f1", "monza", "Race", SessionResult::with_position("4"));
        a.insert("2023", "f2", "monza", "Qualifying", SessionResult::with_position("1"));
        let mut b = RecordTree::default();
        b.insert("2023", "f2", "monza", "Feature", SessionResult::with_position("2"));
        let entities = vec![
            Entity::new("a", EntityKind::Driver, "A").with_seasons(a),
            Entity::new("b", EntityKind::Driver, "B").with_seasons(b),
        ];

        let result = build_comparison(&entities, ComparisonMode::CommonChampionships);

        assert!(result.summary.common_championships.is_empty());
        assert_eq!(result.summary.eligible_races, 0);
        assert_eq!(
            result.empty_hint(),
            Some(ComparisonMode::CommonChampionships.empty_hint())
        );
        // Qualifying-only championships still appear in the entity's own stats.
        let a_stats = &result.entity(&"a".into()).unwrap().stats;
        assert!(a_stats.championships.contains("f2"));
    }

    #[test]
    fn test_determinism() {
        let entities = scenario_a();
        let first = build_comparison(&entities, ComparisonMode::All);
        let second = build_comparison(&entities, ComparisonMode::All);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_csv_year_filter() {
        let entities = vec![
            driver("a", "A", &[("2021", "r1", "1", "t"), ("2023", "r2", "2", "t")]),
            driver("b", "B", &[("2021", "r1", "3", "t")]),
        ];
        let result = build_comparison(&entities, ComparisonMode::All);

        let csv = result.to_csv(Some("2021")).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().starts_with("2021,f1,r1,1,,3,"));
        assert_eq!(result.to_csv(None).unwrap().lines().count(), 3);
    }
}
