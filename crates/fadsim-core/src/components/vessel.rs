//! Vessels. There are few of them, so they live in a map on the engine rather
//! than in the world.

use serde::{Deserialize, Serialize};

use fadsim_logic::action::VesselId;
use fadsim_logic::biomass::BiomassPool;

use crate::config::VesselConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub id: VesselId,
    pub name: String,
    pub tags: Vec<String>,
    /// Everything landed by sets so far.
    pub catch: BiomassPool,
}

impl Vessel {
    pub fn from_config(config: &VesselConfig, species: usize) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            tags: config.tags.clone(),
            catch: BiomassPool::empty(species),
        }
    }
}
