//! Battle calculation.
//!
//! For every eligible race instance the compared entities are ranked by
//! normalized race position and the best-placed finisher scores one
//! "finish ahead". Pairwise head-to-head records come from the same rankings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Entity, EntityId, Position, RaceInstance};

use super::calculate_rate;

/// One entity's place in a round's ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub entity: EntityId,

    /// Normalized race position; `None` when the entity has no race result
    /// for this instance.
    pub position: Option<Position>,
}

impl RankedEntry {
    pub fn is_finish(&self) -> bool {
        self.position.is_some_and(|p| p.is_finish())
    }
}

/// Ranking of the compared entities at one race instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleRound {
    pub instance: RaceInstance,

    /// Finishers by rank, then non-finishers, then absentees.
    pub ranking: Vec<RankedEntry>,

    /// Entity credited with the finish ahead, if anyone finished.
    pub leader: Option<EntityId>,
}

/// Battle totals for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleTally {
    pub entity: EntityId,
    pub finishes_ahead: u32,

    /// `finishes_ahead` as a percentage of `common_races`, one decimal
    pub win_share: f64,
}

/// Pairwise record between two compared entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub first: EntityId,
    pub second: EntityId,
    pub first_ahead: u32,
    pub second_ahead: u32,

    /// Rounds where at least one of the pair finished
    pub contested: u32,
}

/// Battle accumulator for one comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    /// Per-entity totals in comparison order
    pub tallies: Vec<BattleTally>,

    /// Number of eligible instances processed
    pub common_races: u32,

    /// Per-instance breakdown in instance order
    pub rounds: Vec<BattleRound>,

    /// Pairwise records in comparison order
    pub head_to_head: Vec<HeadToHead>,
}

impl Battle {
    pub fn finishes_ahead(&self, entity: &EntityId) -> u32 {
        self.tally(entity).map(|t| t.finishes_ahead).unwrap_or(0)
    }

    pub fn win_share(&self, entity: &EntityId) -> f64 {
        self.tally(entity).map(|t| t.win_share).unwrap_or(0.0)
    }

    pub fn tally(&self, entity: &EntityId) -> Option<&BattleTally> {
        self.tallies.iter().find(|t| &t.entity == entity)
    }

    /// Head-to-head record for a pair, in either order.
    pub fn pair(&self, a: &EntityId, b: &EntityId) -> Option<&HeadToHead> {
        self.head_to_head
            .iter()
            .find(|h| (&h.first == a && &h.second == b) || (&h.first == b && &h.second == a))
    }

    /// Rounds in which nobody finished.
    pub fn rounds_without_finisher(&self) -> u32 {
        self.rounds.iter().filter(|r| r.leader.is_none()).count() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.common_races == 0
    }
}

/// Rank the entities at one instance.
pub fn rank_instance(entities: &[Entity], instance: &RaceInstance) -> BattleRound {
    let entries: Vec<RankedEntry> = entities
        .iter()
        .map(|entity| RankedEntry {
            entity: entity.id.clone(),
            position: entity
                .seasons
                .event(instance)
                .and_then(|record| record.race_result())
                .map(|(_, result)| result.normalized()),
        })
        .collect();

    let mut finishers: Vec<RankedEntry> = Vec::new();
    let mut non_finishers: Vec<RankedEntry> = Vec::new();
    let mut absent: Vec<RankedEntry> = Vec::new();
    for entry in entries {
        match entry.position {
            Some(Position::Finish(_)) => finishers.push(entry),
            Some(Position::NonFinish(_)) => non_finishers.push(entry),
            None => absent.push(entry),
        }
    }
    // Stable: equal ranks keep comparison order.
    finishers.sort_by_key(|e| e.position.and_then(|p| p.rank()));

    let leader = finishers.first().map(|e| e.entity.clone());

    let mut ranking = finishers;
    ranking.extend(non_finishers);
    ranking.extend(absent);

    BattleRound {
        instance: instance.clone(),
        ranking,
        leader,
    }
}

/// Compute the battle over the eligible instances.
pub fn calculate_battle(entities: &[Entity], eligible: &BTreeSet<RaceInstance>) -> Battle {
    let rounds: Vec<BattleRound> = eligible
        .iter()
        .map(|instance| rank_instance(entities, instance))
        .collect();
    let common_races = rounds.len() as u32;

    let tallies = entities
        .iter()
        .map(|entity| {
            let finishes_ahead = rounds
                .iter()
                .filter(|r| r.leader.as_ref() == Some(&entity.id))
                .count() as u32;
            BattleTally {
                entity: entity.id.clone(),
                finishes_ahead,
                win_share: calculate_rate(finishes_ahead, common_races),
            }
        })
        .collect();

    let mut head_to_head = Vec::new();
    for (i, first) in entities.iter().enumerate() {
        for second in &entities[i + 1..] {
            head_to_head.push(pair_record(&rounds, &first.id, &second.id));
        }
    }

    Battle {
        tallies,
        common_races,
        rounds,
        head_to_head,
    }
}

fn pair_record(rounds: &[BattleRound], first: &EntityId, second: &EntityId) -> HeadToHead {
    let mut record = HeadToHead {
        first: first.clone(),
        second: second.clone(),
        first_ahead: 0,
        second_ahead: 0,
        contested: 0,
    };

    for round in rounds {
        let find = |id: &EntityId| round.ranking.iter().position(|e| &e.entity == id);
        let (Some(a), Some(b)) = (find(first), find(second)) else {
            continue;
        };
        let (ahead, index) = if a < b { (first, a) } else { (second, b) };
        if !round.ranking[index].is_finish() {
            continue;
        }
        record.contested += 1;
        if ahead == first {
            record.first_ahead += 1;
        } else {
            record.second_ahead += 1;
        }
    }

    record
}
