//! Equirectangular map grid: cells, geographic coordinates, unit conversion.
//!
//! Grid rows run north to south (`y = 0` is the northernmost row) and columns
//! west to east. Continuous grid positions are expressed in cell units, so a
//! position of `(3.5, 7.25)` lies inside cell `(3, 7)`.

use serde::{Deserialize, Serialize};

use crate::vector::Vec2;

/// Mean Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Discrete grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Continuous grid position of the middle of this cell.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x as f64 + 0.5, self.y as f64 + 0.5)
    }
}

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// How the meters→degrees conversion treats latitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// One scale factor for the whole map, taken at its central latitude.
    #[default]
    Uniform,
    /// Scale longitude distances by the cosine of the object's own latitude.
    LatitudeCorrected,
}

/// Meters spanned by one degree of latitude.
pub fn meters_per_degree_lat() -> f64 {
    std::f64::consts::PI * EARTH_RADIUS_M / 180.0
}

/// Meters spanned by one degree of longitude at `lat` degrees.
pub fn meters_per_degree_lon(lat: f64) -> f64 {
    meters_per_degree_lat() * lat.to_radians().cos()
}

/// Bounds and resolution of the simulated map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapExtent {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl MapExtent {
    pub fn new(west: f64, east: f64, south: f64, north: f64, width: u32, height: u32) -> Self {
        Self {
            west,
            east,
            south,
            north,
            width,
            height,
        }
    }

    /// Width of a cell in degrees of longitude.
    pub fn cell_width_deg(&self) -> f64 {
        (self.east - self.west) / self.width as f64
    }

    /// Height of a cell in degrees of latitude.
    pub fn cell_height_deg(&self) -> f64 {
        (self.north - self.south) / self.height as f64
    }

    pub fn center_latitude(&self) -> f64 {
        (self.north + self.south) / 2.0
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Row-major index of a cell, `None` if outside the grid.
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.y as usize * self.width as usize + cell.x as usize)
        } else {
            None
        }
    }

    /// Cell stored at a row-major index.
    pub fn cell_at_index(&self, index: usize) -> Cell {
        let w = self.width as usize;
        Cell::new((index % w) as i32, (index / w) as i32)
    }

    /// Whether a continuous grid position lies on the map.
    pub fn contains_position(&self, pos: Vec2) -> bool {
        pos.x >= 0.0 && pos.y >= 0.0 && pos.x < self.width as f64 && pos.y < self.height as f64
    }

    /// Cell containing a continuous grid position.
    pub fn cell_at(&self, pos: Vec2) -> Option<Cell> {
        if !self.contains_position(pos) {
            return None;
        }
        Some(Cell::new(pos.x.floor() as i32, pos.y.floor() as i32))
    }

    /// Cell containing a geographic coordinate. Coordinates on the eastern or
    /// southern edge belong to the last column/row. Non-finite coordinates
    /// are on no cell.
    pub fn cell_of(&self, coord: Coordinate) -> Option<Cell> {
        if !coord.lon.is_finite() || !coord.lat.is_finite() {
            return None;
        }
        if coord.lon < self.west
            || coord.lon > self.east
            || coord.lat < self.south
            || coord.lat > self.north
        {
            return None;
        }
        let x = ((coord.lon - self.west) / self.cell_width_deg()).floor() as i32;
        let y = ((self.north - coord.lat) / self.cell_height_deg()).floor() as i32;
        Some(Cell::new(
            x.min(self.width as i32 - 1),
            y.min(self.height as i32 - 1),
        ))
    }

    /// Geographic coordinate of a continuous grid position.
    pub fn coordinate_of(&self, pos: Vec2) -> Coordinate {
        Coordinate::new(
            self.west + pos.x * self.cell_width_deg(),
            self.north - pos.y * self.cell_height_deg(),
        )
    }

    /// Geographic coordinate of a cell's center.
    pub fn cell_center(&self, cell: Cell) -> Coordinate {
        self.coordinate_of(cell.center())
    }

    /// Cells-per-day displacement produced by one m/s of current, as
    /// `(eastward, southward)` factors at the given latitude.
    pub fn cells_per_day_per_mps(&self, lat: f64) -> (f64, f64) {
        let x = SECONDS_PER_DAY / meters_per_degree_lon(lat) / self.cell_width_deg();
        let y = SECONDS_PER_DAY / meters_per_degree_lat() / self.cell_height_deg();
        (x, y)
    }

    /// Convert a current velocity (m/s, `y` northward) into a grid
    /// displacement per day (cells, `y` southward).
    pub fn velocity_to_cells_per_day(&self, velocity: Vec2, lat: f64) -> Vec2 {
        let (fx, fy) = self.cells_per_day_per_mps(lat);
        Vec2::new(velocity.x * fx, -velocity.y * fy)
    }

    /// Latitude at which to evaluate the conversion for an object at `lat`.
    pub fn reference_latitude(&self, mode: ScaleMode, lat: f64) -> f64 {
        match mode {
            ScaleMode::Uniform => self.center_latitude(),
            ScaleMode::LatitudeCorrected => lat,
        }
    }
}
