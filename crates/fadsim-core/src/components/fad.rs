//! FAD components.

use serde::{Deserialize, Serialize};

use fadsim_logic::action::VesselId;
use fadsim_logic::biomass::BiomassPool;
use fadsim_logic::grid::Cell;
use fadsim_logic::vector::Vec2;

use crate::config::FadConfig;

/// Stable FAD identifier. Unlike `hecs::Entity` it survives save/load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FadId(pub u64);

impl std::fmt::Display for FadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FAD #{}", self.0)
    }
}

/// Core FAD data: owner, deployment record and attraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fad {
    pub id: FadId,
    pub owner: VesselId,
    pub deployed_step: u64,
    pub deployed_cell: Cell,
    pub attraction_rate: f64,
    pub carrying_capacity: Vec<f64>,
    /// Cleared when the FAD outlives `lifetime_days`. Inactive FADs keep
    /// drifting and keep their fish but stop attracting.
    pub active: bool,
    pub lifetime_days: Option<u32>,
    pub days_before_attraction: u32,
    pub release_probabilities: Vec<f64>,
    /// Step of the last aggregation, so a FAD aggregates at most once per step.
    pub last_aggregation_step: Option<u64>,
}

impl Fad {
    pub fn new(id: FadId, owner: VesselId, step: u64, cell: Cell, params: &FadConfig) -> Self {
        Self {
            id,
            owner,
            deployed_step: step,
            deployed_cell: cell,
            attraction_rate: params.attraction_rate,
            carrying_capacity: params.carrying_capacity.clone(),
            active: true,
            lifetime_days: params.lifetime_days,
            days_before_attraction: params.days_before_attraction,
            release_probabilities: params.release_probabilities.clone(),
            last_aggregation_step: None,
        }
    }

    /// Whole days spent in the water at `step`.
    pub fn age_days(&self, step: u64, steps_per_day: u32) -> u64 {
        step.saturating_sub(self.deployed_step) / steps_per_day.max(1) as u64
    }

    pub fn is_expired(&self, step: u64, steps_per_day: u32) -> bool {
        match self.lifetime_days {
            Some(days) => self.age_days(step, steps_per_day) >= days as u64,
            None => false,
        }
    }

    /// Whether the FAD attracts fish at `step`.
    pub fn can_attract(&self, step: u64, steps_per_day: u32) -> bool {
        self.active
            && self.age_days(step, steps_per_day) >= self.days_before_attraction as u64
    }

    pub fn release_probability(&self, species: usize) -> f64 {
        self.release_probabilities.get(species).copied().unwrap_or(0.0)
    }
}

/// Continuous grid position (cell units) and the cell it falls in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftPosition {
    pub position: Vec2,
    pub cell: Cell,
}

/// Fish aggregated under a FAD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FadBiomass(pub BiomassPool);
