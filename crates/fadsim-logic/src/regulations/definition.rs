//! Declarative regulation definitions, as they appear in scenario files, and
//! the builder that turns them into predicate trees.
//!
//! ```json
//! {
//!   "name": "El Corralito",
//!   "forbidden_if": {
//!     "type": "all_of",
//!     "of": [
//!       { "type": "between_yearly_dates",
//!         "start": { "month": 10, "day": 9 }, "end": { "month": 11, "day": 8 } },
//!       { "type": "in_cell_set", "set": "corralito" }
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    BetweenDates, BetweenYearlyDates, InCellSet, MonthDay, Predicate, RectangularArea,
    Regulation, RegulationError, Regulations,
};
use crate::action::ActionKind;
use crate::grid::{Cell, MapExtent};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PredicateDef {
    AllOf { of: Vec<PredicateDef> },
    AnyOf { of: Vec<PredicateDef> },
    Not { of: Box<PredicateDef> },
    BetweenDates { start: NaiveDate, end: NaiveDate },
    BetweenYearlyDates { start: MonthDay, end: MonthDay },
    InCellSet { set: String },
    InRectangularArea { north: f64, west: f64, south: f64, east: f64 },
    ActionCodeIs { code: String },
    AgentHasTag { tag: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulationDef {
    pub name: String,
    pub forbidden_if: PredicateDef,
}

/// Build every regulation, resolving cell-set names against `cell_sets`.
/// The first configuration error aborts the build.
pub fn build_regulations(
    defs: &[RegulationDef],
    cell_sets: &BTreeMap<String, Vec<Cell>>,
    grid: MapExtent,
) -> Result<Regulations, RegulationError> {
    let mut regulations = Regulations::new();
    for def in defs {
        let condition = build_predicate(&def.forbidden_if, cell_sets, grid)?;
        regulations.add(Regulation::forbidden_if(def.name.clone(), condition))?;
    }
    Ok(regulations)
}

pub fn build_predicate(
    def: &PredicateDef,
    cell_sets: &BTreeMap<String, Vec<Cell>>,
    grid: MapExtent,
) -> Result<Predicate, RegulationError> {
    let build_all = |defs: &[PredicateDef]| -> Result<Vec<Predicate>, RegulationError> {
        defs.iter()
            .map(|d| build_predicate(d, cell_sets, grid))
            .collect()
    };

    Ok(match def {
        PredicateDef::AllOf { of } => Predicate::AllOf(build_all(of)?),
        PredicateDef::AnyOf { of } => Predicate::AnyOf(build_all(of)?),
        PredicateDef::Not { of } => Predicate::not(build_predicate(of, cell_sets, grid)?),
        PredicateDef::BetweenDates { start, end } => {
            Predicate::BetweenDates(BetweenDates::new(*start, *end)?)
        }
        PredicateDef::BetweenYearlyDates { start, end } => {
            Predicate::BetweenYearlyDates(BetweenYearlyDates::new(*start, *end))
        }
        PredicateDef::InCellSet { set } => {
            let cells = cell_sets
                .get(set)
                .ok_or_else(|| RegulationError::UnknownCellSet(set.clone()))?;
            Predicate::in_cells(InCellSet::new(cells.iter().copied(), grid)?)
        }
        PredicateDef::InRectangularArea {
            north,
            west,
            south,
            east,
        } => Predicate::in_area(RectangularArea::new(*north, *west, *south, *east)?),
        PredicateDef::ActionCodeIs { code } => Predicate::ActionKindIs(
            ActionKind::from_code(code)
                .ok_or_else(|| RegulationError::UnknownActionCode(code.clone()))?,
        ),
        PredicateDef::AgentHasTag { tag } => Predicate::AgentHasTag(tag.clone()),
    })
}
