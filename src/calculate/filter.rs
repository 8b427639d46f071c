//! Comparison filtering.
//!
//! Decides which `(year, championship, event)` instances take part in a
//! multi-entity comparison. The result is a pure function of the trees and
//! the mode; ordered sets keep it independent of source key order.

use std::collections::BTreeSet;

use crate::models::{ComparisonMode, Entity, RaceInstance};

/// Championships in which the entity has at least one race-session result.
pub fn raced_championships(entity: &Entity) -> BTreeSet<String> {
    entity
        .seasons
        .events()
        .filter(|(_, record)| record.has_race())
        .map(|(instance, _)| instance.championship)
        .collect()
}

/// Intersection of several championship sets. Empty when there are no sets.
pub fn championship_intersection<'a, I>(sets: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a BTreeSet<String>>,
{
    let mut iter = sets.into_iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    iter.fold(first.clone(), |acc, set| {
        acc.intersection(set).cloned().collect()
    })
}

/// Race instances the entity has a race-session result for.
fn raced_instances(entity: &Entity) -> BTreeSet<RaceInstance> {
    entity
        .seasons
        .events()
        .filter(|(_, record)| record.has_race())
        .map(|(instance, _)| instance)
        .collect()
}

/// Instances eligible for battle and table computation under `mode`.
pub fn eligible_instances(entities: &[Entity], mode: ComparisonMode) -> BTreeSet<RaceInstance> {
    if entities.is_empty() {
        return BTreeSet::new();
    }

    match mode {
        ComparisonMode::All => entities.iter().flat_map(raced_instances).collect(),
        ComparisonMode::CommonChampionships => {
            let per_entity: Vec<BTreeSet<String>> =
                entities.iter().map(raced_championships).collect();
            let common = championship_intersection(&per_entity);
            entities
                .iter()
                .flat_map(raced_instances)
                .filter(|instance| common.contains(&instance.championship))
                .collect()
        }
        ComparisonMode::CommonRaces => common_races(entities),
        ComparisonMode::SameTeam => common_races(entities)
            .into_iter()
            .filter(|instance| shared_team(entities, instance).is_some())
            .collect(),
    }
}

fn common_races(entities: &[Entity]) -> BTreeSet<RaceInstance> {
    let mut iter = entities.iter().map(raced_instances);
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    iter.fold(first, |acc, set| acc.intersection(&set).cloned().collect())
}

/// The team every entity raced for at this instance, if they all share one.
pub fn shared_team<'a>(entities: &'a [Entity], instance: &RaceInstance) -> Option<&'a str> {
    let mut shared: Option<&str> = None;
    for entity in entities {
        let (_, result) = entity.seasons.event(instance)?.race_result()?;
        let team = result.team.as_deref()?;
        match shared {
            None => shared = Some(team),
            Some(existing) if existing == team => {}
            Some(_) => return None,
        }
    }
    shared
}
