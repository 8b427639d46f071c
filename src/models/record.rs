//! Entity record trees.
//!
//! A record tree is the full competition history of one driver or team:
//! `year → championship → event → session → result`. Every level is an
//! ordered map so that walks are deterministic no matter how the source
//! ordered its keys.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::{is_qualifying_session, is_race_session};
use super::{EntityId, EntityKind, Position, RawPosition};

/// One entity's outcome in one session.
///
/// Deserialization never fails: a non-object session value becomes an empty
/// result and wrongly typed fields are dropped, so a single corrupt record
/// degrades to a DNF instead of rejecting the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct SessionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<RawPosition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,

    #[serde(rename = "fastestLap", skip_serializing_if = "Option::is_none")]
    pub fastest_lap: Option<bool>,

    /// Display-only fields (laps, gap, car number, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SessionResult {
    /// Create a result with the given raw position.
    pub fn with_position(position: impl Into<RawPosition>) -> Self {
        Self {
            position: Some(position.into()),
            ..Default::default()
        }
    }

    /// Builder method to set the team.
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    /// Builder method to set points.
    pub fn with_points(mut self, points: f64) -> Self {
        self.points = Some(points);
        self
    }

    /// Builder method to mark the fastest lap.
    pub fn with_fastest_lap(mut self) -> Self {
        self.fastest_lap = Some(true);
        self
    }

    /// Normalized position.
    pub fn normalized(&self) -> Position {
        Position::normalize(self.position.as_ref())
    }

    pub fn has_fastest_lap(&self) -> bool {
        self.fastest_lap == Some(true)
    }
}

impl From<Value> for SessionResult {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };

        let position = map.remove("position").and_then(|v| match v {
            Value::Null => None,
            Value::Number(n) => n.as_f64().map(RawPosition::Number),
            Value::String(s) => Some(RawPosition::Text(s)),
            other => Some(RawPosition::Text(other.to_string())),
        });

        let team = map.remove("team").and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        let points = map.remove("points").and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        });

        let fastest_lap = map.remove("fastestLap").and_then(|v| v.as_bool());

        Self {
            position,
            team,
            points: points.filter(|p| p.is_finite()),
            fastest_lap,
            extra: map.into_iter().collect(),
        }
    }
}

/// Sessions of one event, keyed by session name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord {
    pub sessions: BTreeMap<String, SessionResult>,
}

impl EventRecord {
    /// First race session in session-name order.
    pub fn race_result(&self) -> Option<(&str, &SessionResult)> {
        self.sessions
            .iter()
            .find(|(name, _)| is_race_session(name))
            .map(|(name, result)| (name.as_str(), result))
    }

    /// First qualifying session in session-name order.
    pub fn qualifying_result(&self) -> Option<(&str, &SessionResult)> {
        self.sessions
            .iter()
            .find(|(name, _)| is_qualifying_session(name))
            .map(|(name, result)| (name.as_str(), result))
    }

    pub fn has_race(&self) -> bool {
        self.race_result().is_some()
    }
}

/// Events of one championship in one year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Championship {
    pub events: BTreeMap<String, EventRecord>,
}

/// Championships contested in one year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Season {
    pub championships: BTreeMap<String, Championship>,
}

/// Full competition history of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTree {
    pub seasons: BTreeMap<String, Season>,
}

/// A single session result together with its position in the tree.
#[derive(Debug, Clone, Copy)]
pub struct Leaf<'a> {
    pub year: &'a str,
    pub championship: &'a str,
    pub event: &'a str,
    pub session: &'a str,
    pub result: &'a SessionResult,
}

impl RecordTree {
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    /// Walk every session result in tree order.
    pub fn leaves(&self) -> impl Iterator<Item = Leaf<'_>> {
        self.seasons.iter().flat_map(|(year, season)| {
            season
                .championships
                .iter()
                .flat_map(move |(championship, champ)| {
                    champ.events.iter().flat_map(move |(event, record)| {
                        record.sessions.iter().map(move |(session, result)| Leaf {
                            year,
                            championship,
                            event,
                            session,
                            result,
                        })
                    })
                })
        })
    }

    /// Walk every event in tree order.
    pub fn events(&self) -> impl Iterator<Item = (RaceInstance, &EventRecord)> {
        self.seasons.iter().flat_map(|(year, season)| {
            season
                .championships
                .iter()
                .flat_map(move |(championship, champ)| {
                    champ.events.iter().map(move |(event, record)| {
                        (RaceInstance::new(year, championship, event), record)
                    })
                })
        })
    }

    /// Look up the sessions of one event.
    pub fn event(&self, instance: &RaceInstance) -> Option<&EventRecord> {
        self.seasons
            .get(&instance.year)?
            .championships
            .get(&instance.championship)?
            .events
            .get(&instance.event)
    }

    /// Builder used by tests and fixtures.
    pub fn insert(
        &mut self,
        year: &str,
        championship: &str,
        event: &str,
        session: &str,
        result: SessionResult,
    ) {
        self.seasons
            .entry(year.to_string())
            .or_default()
            .championships
            .entry(championship.to_string())
            .or_default()
            .events
            .entry(event.to_string())
            .or_default()
            .sessions
            .insert(session.to_string(), result);
    }
}

/// A `(year, championship, event)` triple.
///
/// Ordered by year descending (numerically when the year parses), then
/// championship and event ascending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaceInstance {
    pub year: String,
    pub championship: String,
    pub event: String,
}

impl RaceInstance {
    pub fn new(year: &str, championship: &str, event: &str) -> Self {
        Self {
            year: year.to_string(),
            championship: championship.to_string(),
            event: event.to_string(),
        }
    }

    /// Numeric year, if the key is a number.
    pub fn year_number(&self) -> Option<i32> {
        self.year.trim().parse().ok()
    }
}

impl Ord for RaceInstance {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_year = match (self.year_number(), other.year_number()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_year
            .then_with(|| other.year.cmp(&self.year))
            .then_with(|| self.championship.cmp(&other.championship))
            .then_with(|| self.event.cmp(&other.event))
    }
}

impl PartialOrd for RaceInstance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A driver or team with its record tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: EntityId,

    #[serde(default)]
    pub kind: EntityKind,

    #[serde(default)]
    pub name: String,

    #[serde(default, alias = "country", skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default)]
    pub seasons: RecordTree,

    /// Any other metadata, passed through untouched.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl Entity {
    /// Create an entity with an empty record tree.
    pub fn new(id: impl Into<EntityId>, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            nationality: None,
            image: None,
            seasons: RecordTree::default(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder method to set the record tree.
    pub fn with_seasons(mut self, seasons: RecordTree) -> Self {
        self.seasons = seasons;
        self
    }

    /// Name for display, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}
