//! Location predicates: which coordinates, and therefore which actions, fall
//! inside a regulated area.

use std::collections::HashSet;

use super::RegulationError;
use crate::action::Action;
use crate::grid::{Cell, Coordinate, MapExtent};

/// Predicate over a single coordinate.
#[derive(Debug, Clone)]
pub enum CoordinatePredicate {
    InCellSet(InCellSet),
    InRectangularArea(RectangularArea),
}

impl CoordinatePredicate {
    pub fn test(&self, coord: Coordinate) -> bool {
        match self {
            CoordinatePredicate::InCellSet(p) => p.test(coord),
            CoordinatePredicate::InRectangularArea(p) => p.test(coord),
        }
    }
}

/// True when the coordinate's grid cell belongs to the set.
#[derive(Debug, Clone)]
pub struct InCellSet {
    cells: HashSet<Cell>,
    grid: MapExtent,
}

impl InCellSet {
    /// Fails if any cell lies outside the grid.
    pub fn new<I>(cells: I, grid: MapExtent) -> Result<Self, RegulationError>
    where
        I: IntoIterator<Item = Cell>,
    {
        let cells: HashSet<Cell> = cells.into_iter().collect();
        if let Some(bad) = cells.iter().find(|c| !grid.contains(**c)) {
            return Err(RegulationError::CellOutsideGrid(*bad));
        }
        Ok(Self { cells, grid })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains_cell(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn test(&self, coord: Coordinate) -> bool {
        self.grid
            .cell_of(coord)
            .map_or(false, |cell| self.cells.contains(&cell))
    }
}

/// Lat/lon box, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangularArea {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl RectangularArea {
    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Result<Self, RegulationError> {
        if north < south || west > east {
            return Err(RegulationError::InvalidArea {
                north,
                west,
                south,
                east,
            });
        }
        Ok(Self {
            north,
            west,
            south,
            east,
        })
    }

    pub fn test(&self, coord: Coordinate) -> bool {
        coord.lat <= self.north
            && coord.lat >= self.south
            && coord.lon >= self.west
            && coord.lon <= self.east
    }
}

/// Lifts a coordinate predicate to actions: holds if either the start or the
/// end of the action satisfies it, so actions crossing a boundary in either
/// direction are caught.
#[derive(Debug, Clone)]
pub struct ActionCellPredicate(pub CoordinatePredicate);

impl ActionCellPredicate {
    pub fn test(&self, action: &Action) -> bool {
        self.0.test(action.start_coord) || self.0.test(action.end_coord)
    }
}
