//! Scenario configuration.
//!
//! Everything a run needs is described by one [`SimulationConfig`], usually
//! read from JSON. Missing fields fall back to the defaults below.
//! [`SimulationConfig::validate`] runs before the engine is built so bad
//! scenarios fail before the first step.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use fadsim_logic::action::VesselId;
use fadsim_logic::biomass::Habitat;
use fadsim_logic::currents::{CurrentPattern, DEFAULT_CYCLE_LENGTH};
use fadsim_logic::grid::{Cell, MapExtent, ScaleMode};
use fadsim_logic::regulations::{RegulationDef, RegulationError};

/// Top-level scenario description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub name: String,
    /// Seed of the single random source.
    pub seed: u64,
    /// Calendar date of step 0 (midnight).
    pub start_date: NaiveDate,
    pub steps_per_day: u32,
    pub map: MapExtent,
    /// Species names; positions are the species indices used everywhere else.
    pub species: Vec<String>,
    /// Cells that are not open water. Everything else is `Water`.
    pub habitats: Vec<HabitatPatch>,
    pub initial_biomass: Vec<BiomassPatch>,
    pub vessels: Vec<VesselConfig>,
    pub fad: FadConfig,
    pub drift: DriftConfig,
    pub currents: CurrentsConfig,
    pub exploitation: ExploitationConfig,
    pub restock: RestockConfig,
    /// Named cell sets referenced by regulations.
    pub cell_sets: BTreeMap<String, Vec<Cell>>,
    pub regulations: Vec<RegulationDef>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "Default Fishery".to_string(),
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            steps_per_day: 1,
            map: MapExtent::new(-150.0, -70.0, -50.0, 50.0, 80, 100),
            species: vec!["Skipjack tuna".to_string()],
            habitats: Vec::new(),
            initial_biomass: Vec::new(),
            vessels: Vec::new(),
            fad: FadConfig::default(),
            drift: DriftConfig::default(),
            currents: CurrentsConfig::default(),
            exploitation: ExploitationConfig::default(),
            restock: RestockConfig::default(),
            cell_sets: BTreeMap::new(),
            regulations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitatPatch {
    pub habitat: Habitat,
    pub cells: Vec<Cell>,
}

/// Biomass placed in cells at start. `cells: None` means every water cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomassPatch {
    pub species: usize,
    pub mass_per_cell: f64,
    #[serde(default)]
    pub cells: Option<Vec<Cell>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselConfig {
    pub id: VesselId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub initial_stock: u32,
}

/// Parameters given to every newly deployed FAD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FadConfig {
    /// Fraction of local biomass pulled in per step while active.
    pub attraction_rate: f64,
    /// Per-species ceiling of the FAD's biomass pool.
    pub carrying_capacity: Vec<f64>,
    /// Days after deployment at which the FAD stops attracting.
    pub lifetime_days: Option<u32>,
    /// Days in the water before attraction starts.
    pub days_before_attraction: u32,
    /// Per-species daily probability that aggregated fish leave the FAD.
    pub release_probabilities: Vec<f64>,
    /// Deploy at a random point of the cell instead of its center.
    pub random_position_in_cell: bool,
}

impl Default for FadConfig {
    fn default() -> Self {
        Self {
            attraction_rate: 0.05,
            carrying_capacity: vec![50.0],
            lifetime_days: None,
            days_before_attraction: 0,
            release_probabilities: Vec::new(),
            random_position_in_cell: false,
        }
    }
}

/// What happens to a FAD that drifts off the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryPolicy {
    /// Keep it on the edge cell.
    Clamp,
    /// Treat it as lost.
    #[default]
    Lose,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub boundary: BoundaryPolicy,
    pub scale_mode: ScaleMode,
}

/// Which current pattern applies on a given date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternSchedule {
    Constant {
        pattern: CurrentPattern,
    },
    /// `patterns[i]` applies in `first_year + i`; years outside the list use
    /// the nearest end.
    ByYear {
        first_year: i32,
        patterns: Vec<CurrentPattern>,
    },
}

impl Default for PatternSchedule {
    fn default() -> Self {
        PatternSchedule::Constant {
            pattern: CurrentPattern(0),
        }
    }
}

impl PatternSchedule {
    pub fn pattern_for(&self, time: NaiveDateTime) -> CurrentPattern {
        match self {
            PatternSchedule::Constant { pattern } => *pattern,
            PatternSchedule::ByYear {
                first_year,
                patterns,
            } => {
                if patterns.is_empty() {
                    return CurrentPattern(0);
                }
                let offset = (time.year() - first_year).max(0) as usize;
                patterns[offset.min(patterns.len() - 1)]
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentsConfig {
    pub cycle_length: u32,
    pub schedule: PatternSchedule,
}

impl Default for CurrentsConfig {
    fn default() -> Self {
        Self {
            cycle_length: DEFAULT_CYCLE_LENGTH,
            schedule: PatternSchedule::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploitationConfig {
    /// Chance that a set on a FAD catches its aggregated school.
    pub fad_set_success_probability: f64,
    /// Chance that a set on a free school succeeds.
    pub non_associated_success_probability: f64,
    /// Fraction of each species in the cell taken by a successful free-school set.
    pub non_associated_catch_fraction: f64,
}

impl Default for ExploitationConfig {
    fn default() -> Self {
        Self {
            fad_set_success_probability: 1.0,
            non_associated_success_probability: 0.5,
            non_associated_catch_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestockConfig {
    /// Price charged per FAD added to a vessel's inventory.
    pub unit_cost: f64,
    /// Optional `year,vessel,max_stock` table applied at each year start.
    pub schedule_path: Option<PathBuf>,
}

impl Default for RestockConfig {
    fn default() -> Self {
        Self {
            unit_cost: 1_000.0,
            schedule_path: None,
        }
    }
}

/// Errors raised while reading or checking a scenario.
#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    Invalid(String),
    Regulation(RegulationError),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl From<RegulationError> for ConfigError {
    fn from(e: RegulationError) -> Self {
        ConfigError::Regulation(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "Scenario JSON error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid scenario: {}", msg),
            ConfigError::Regulation(e) => write!(f, "Invalid regulation: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Whole hours per step; `validate` guarantees `steps_per_day` divides 24.
    pub fn hours_per_step(&self) -> i64 {
        24 / self.steps_per_day.max(1) as i64
    }

    /// Check everything that can be checked without building the engine.
    /// Regulation trees are checked when they are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.steps_per_day == 0 || 24 % self.steps_per_day != 0 {
            return invalid(format!(
                "steps_per_day must divide 24, got {}",
                self.steps_per_day
            ));
        }
        if self.map.width == 0 || self.map.height == 0 {
            return invalid("map must have at least one cell".into());
        }
        if self.map.west >= self.map.east || self.map.south >= self.map.north {
            return invalid("map bounds are inverted".into());
        }
        if self.species.is_empty() {
            return invalid("at least one species is required".into());
        }
        let n = self.species.len();
        if self.fad.carrying_capacity.len() != n {
            return invalid(format!(
                "fad.carrying_capacity has {} entries for {} species",
                self.fad.carrying_capacity.len(),
                n
            ));
        }
        if self.fad.carrying_capacity.iter().any(|c| *c < 0.0) {
            return invalid("fad.carrying_capacity must be non-negative".into());
        }
        if self.fad.release_probabilities.len() > n
            || !self.fad.release_probabilities.iter().all(|p| is_probability(*p))
        {
            return invalid("fad.release_probabilities must be probabilities, one per species".into());
        }
        if !is_probability(self.exploitation.fad_set_success_probability)
            || !is_probability(self.exploitation.non_associated_success_probability)
            || !is_probability(self.exploitation.non_associated_catch_fraction)
        {
            return invalid("exploitation parameters must lie in [0, 1]".into());
        }
        if self.restock.unit_cost < 0.0 {
            return invalid("restock.unit_cost must be non-negative".into());
        }

        for patch in &self.habitats {
            if let Some(cell) = patch.cells.iter().find(|c| !self.map.contains(**c)) {
                return invalid(format!("habitat cell ({}, {}) off the map", cell.x, cell.y));
            }
        }
        for patch in &self.initial_biomass {
            if patch.species >= n {
                return invalid(format!("initial biomass for unknown species {}", patch.species));
            }
            if patch.mass_per_cell < 0.0 {
                return invalid("initial biomass must be non-negative".into());
            }
            if let Some(cells) = &patch.cells {
                if let Some(cell) = cells.iter().find(|c| !self.map.contains(**c)) {
                    return invalid(format!("biomass cell ({}, {}) off the map", cell.x, cell.y));
                }
            }
        }

        let mut ids = std::collections::HashSet::new();
        for vessel in &self.vessels {
            if !ids.insert(vessel.id) {
                return invalid(format!("{} defined twice", vessel.id));
            }
        }
        Ok(())
    }
}
