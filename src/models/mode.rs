//! Comparison modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy selecting which races count when comparing entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Every race any of the entities took part in
    #[default]
    All,
    /// Every race in championships all entities have raced in
    CommonChampionships,
    /// Races every entity took part in
    CommonRaces,
    /// Common races where every entity drove for the same team
    SameTeam,
}

impl ComparisonMode {
    pub const ALL: [ComparisonMode; 4] = [
        ComparisonMode::All,
        ComparisonMode::CommonChampionships,
        ComparisonMode::CommonRaces,
        ComparisonMode::SameTeam,
    ];

    /// Message shown when the mode admits no races.
    pub fn empty_hint(&self) -> &'static str {
        match self {
            ComparisonMode::All => "No race results found for the selected entities",
            ComparisonMode::CommonChampionships => {
                "No championship found that all selected entities have raced in"
            }
            ComparisonMode::CommonRaces => "No race found that all selected entities took part in",
            ComparisonMode::SameTeam => "No common team found for the selected entities",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonMode::All => "all",
            ComparisonMode::CommonChampionships => "common_championships",
            ComparisonMode::CommonRaces => "common_races",
            ComparisonMode::SameTeam => "same_team",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ComparisonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all" => Ok(ComparisonMode::All),
            "common_championships" | "championships" => Ok(ComparisonMode::CommonChampionships),
            "common_races" | "common" => Ok(ComparisonMode::CommonRaces),
            "same_team" | "team" => Ok(ComparisonMode::SameTeam),
            other => Err(format!("unknown comparison mode: {}", other)),
        }
    }
}
