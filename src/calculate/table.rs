//! Result-table extraction and CSV export.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Entity, EntityId, Position, RaceInstance};

/// One entity's results at one race instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCell {
    pub entity: EntityId,
    pub race: Option<Position>,
    pub qualifying: Option<Position>,
    pub team: Option<String>,
    pub points: Option<f64>,
}

impl ResultCell {
    /// Race position label, empty when the entity did not race.
    pub fn race_label(&self) -> String {
        self.race.map(|p| p.label()).unwrap_or_default()
    }

    /// Qualifying position label, empty when there is no qualifying result.
    pub fn qualifying_label(&self) -> String {
        self.qualifying.map(|p| p.label()).unwrap_or_default()
    }
}

/// One table row per eligible race instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(flatten)]
    pub instance: RaceInstance,

    /// Cells in comparison order
    pub cells: Vec<ResultCell>,
}

impl ResultRow {
    pub fn cell(&self, entity: &EntityId) -> Option<&ResultCell> {
        self.cells.iter().find(|c| &c.entity == entity)
    }
}

/// Flatten the eligible instances into table rows, newest year first.
pub fn extract_rows(entities: &[Entity], eligible: &BTreeSet<RaceInstance>) -> Vec<ResultRow> {
    eligible
        .iter()
        .map(|instance| ResultRow {
            instance: instance.clone(),
            cells: entities
                .iter()
                .map(|entity| extract_cell(entity, instance))
                .collect(),
        })
        .collect()
}

fn extract_cell(entity: &Entity, instance: &RaceInstance) -> ResultCell {
    let record = entity.seasons.event(instance);
    let race = record.and_then(|r| r.race_result()).map(|(_, result)| result);
    let qualifying = record
        .and_then(|r| r.qualifying_result())
        .map(|(_, result)| result.normalized());

    ResultCell {
        entity: entity.id.clone(),
        race: race.map(|r| r.normalized()),
        qualifying,
        team: race.and_then(|r| r.team.clone()),
        points: race.and_then(|r| r.points),
    }
}

/// Rows for a single year. Works on already extracted rows.
pub fn filter_by_year<'a>(rows: &'a [ResultRow], year: &str) -> Vec<&'a ResultRow> {
    rows.iter().filter(|r| r.instance.year == year).collect()
}

/// Distinct years present in the rows, in row order.
pub fn years(rows: &[ResultRow]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    rows.iter()
        .filter(|r| seen.insert(r.instance.year.clone()))
        .map(|r| r.instance.year.clone())
        .collect()
}

/// Render rows as CSV: `Year,Championship,Event,<Name> Race,<Name> Qualifying,...`.
///
/// `names` must follow the comparison order used to build the rows.
pub fn to_csv<'a, I>(names: &[&str], rows: I) -> Result<String, csv::Error>
where
    I: IntoIterator<Item = &'a ResultRow>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "Year".to_string(),
        "Championship".to_string(),
        "Event".to_string(),
    ];
    for name in names {
        header.push(format!("{} Race", name));
        header.push(format!("{} Qualifying", name));
    }
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.instance.year.clone(),
            row.instance.championship.clone(),
            row.instance.event.clone(),
        ];
        for i in 0..names.len() {
            match row.cells.get(i) {
                Some(cell) => {
                    record.push(cell.race_label());
                    record.push(cell.qualifying_label());
                }
                None => {
                    record.push(String::new());
                    record.push(String::new());
                }
            }
        }
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}
