//! Composable regulation predicates.
//!
//! A regulation is "forbidden if <predicate>". Predicates form a tree of
//! [`Predicate::AllOf`] / [`Predicate::AnyOf`] / [`Predicate::Not`] over leaf
//! tests on the action's dates, location, kind and vessel tags. Trees are
//! built once per run (see [`definition`]) and never change afterwards;
//! invalid configurations are rejected at construction, never at evaluation.
//!
//! Identities: `AllOf([])` is true ("no constraint") and `AnyOf([])` is
//! false ("no applicable rule").

pub mod definition;
pub mod spatial;
pub mod temporal;

use chrono::NaiveDate;

use crate::action::{Action, ActionKind};
use crate::grid::Cell;

pub use definition::{build_regulations, PredicateDef, RegulationDef};
pub use spatial::{ActionCellPredicate, CoordinatePredicate, InCellSet, RectangularArea};
pub use temporal::{BetweenDates, BetweenYearlyDates, MonthDay};

/// Configuration errors found while building a regulation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RegulationError {
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    InvalidMonthDay { month: u32, day: u32 },
    InvalidArea { north: f64, west: f64, south: f64, east: f64 },
    UnknownCellSet(String),
    CellOutsideGrid(Cell),
    UnknownActionCode(String),
    DuplicateRegulation(String),
}

impl std::fmt::Display for RegulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegulationError::InvertedDateRange { start, end } => {
                write!(f, "Date range starts after it ends: {} > {}", start, end)
            }
            RegulationError::InvalidMonthDay { month, day } => {
                write!(f, "Invalid month/day: {}/{}", month, day)
            }
            RegulationError::InvalidArea {
                north,
                west,
                south,
                east,
            } => write!(
                f,
                "Invalid area: north={} west={} south={} east={}",
                north, west, south, east
            ),
            RegulationError::UnknownCellSet(name) => write!(f, "Unknown cell set '{}'", name),
            RegulationError::CellOutsideGrid(cell) => {
                write!(f, "Cell ({}, {}) lies outside the grid", cell.x, cell.y)
            }
            RegulationError::UnknownActionCode(code) => write!(f, "Unknown action code '{}'", code),
            RegulationError::DuplicateRegulation(name) => {
                write!(f, "Regulation '{}' defined twice", name)
            }
        }
    }
}

impl std::error::Error for RegulationError {}

/// Node of a regulation tree.
#[derive(Debug, Clone)]
pub enum Predicate {
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
    Not(Box<Predicate>),
    BetweenDates(BetweenDates),
    BetweenYearlyDates(BetweenYearlyDates),
    ActionLocation(ActionCellPredicate),
    ActionKindIs(ActionKind),
    AgentHasTag(String),
}

impl Predicate {
    pub fn all_of(children: Vec<Predicate>) -> Self {
        Predicate::AllOf(children)
    }

    pub fn any_of(children: Vec<Predicate>) -> Self {
        Predicate::AnyOf(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Predicate) -> Self {
        Predicate::Not(Box::new(child))
    }

    /// Action starts or ends inside the cell set.
    pub fn in_cells(set: InCellSet) -> Self {
        Predicate::ActionLocation(ActionCellPredicate(CoordinatePredicate::InCellSet(set)))
    }

    /// Action starts or ends inside the box.
    pub fn in_area(area: RectangularArea) -> Self {
        Predicate::ActionLocation(ActionCellPredicate(CoordinatePredicate::InRectangularArea(
            area,
        )))
    }

    /// Evaluate against a proposed action. Combinators short-circuit.
    pub fn test(&self, action: &Action) -> bool {
        match self {
            Predicate::AllOf(children) => children.iter().all(|c| c.test(action)),
            Predicate::AnyOf(children) => children.iter().any(|c| c.test(action)),
            Predicate::Not(child) => !child.test(action),
            Predicate::BetweenDates(p) => p.test(action),
            Predicate::BetweenYearlyDates(p) => p.test(action),
            Predicate::ActionLocation(p) => p.test(action),
            Predicate::ActionKindIs(kind) => action.kind == *kind,
            Predicate::AgentHasTag(tag) => action.has_tag(tag),
        }
    }
}

/// Outcome of a regulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Permitted,
    Forbidden,
}

/// A named rule: the action is forbidden whenever the condition holds.
#[derive(Debug, Clone)]
pub struct Regulation {
    name: String,
    condition: Predicate,
}

impl Regulation {
    pub fn forbidden_if(name: impl Into<String>, condition: Predicate) -> Self {
        Self {
            name: name.into(),
            condition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permission(&self, action: &Action) -> Permission {
        if self.condition.test(action) {
            Permission::Forbidden
        } else {
            Permission::Permitted
        }
    }

    pub fn permits(&self, action: &Action) -> bool {
        self.permission(action) == Permission::Permitted
    }
}

/// Conjunction of named regulations: an action is permitted only if every
/// regulation permits it.
#[derive(Debug, Clone, Default)]
pub struct Regulations {
    rules: Vec<Regulation>,
}

impl Regulations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regulation; names must be unique.
    pub fn add(&mut self, regulation: Regulation) -> Result<(), RegulationError> {
        if self.rules.iter().any(|r| r.name == regulation.name) {
            return Err(RegulationError::DuplicateRegulation(regulation.name));
        }
        self.rules.push(regulation);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn permits(&self, action: &Action) -> bool {
        self.rules.iter().all(|r| r.permits(action))
    }

    pub fn permission(&self, action: &Action) -> Permission {
        if self.permits(action) {
            Permission::Permitted
        } else {
            Permission::Forbidden
        }
    }

    /// Name of the first regulation (in insertion order) that forbids the action.
    pub fn first_forbidding(&self, action: &Action) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| !r.permits(action))
            .map(|r| r.name.as_str())
    }
}

/// Gate check: may the action go ahead under these regulations?
pub fn can_proceed(action: &Action, regulations: &Regulations) -> bool {
    regulations.permits(action)
}
