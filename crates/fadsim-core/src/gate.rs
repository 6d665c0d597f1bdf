//! Action gate - every fishing action is checked against the regulations
//! before it may touch the world.

use hecs::Entity;

use fadsim_logic::action::Action;
use fadsim_logic::biomass::BiomassPool;
use fadsim_logic::grid::{Cell, Coordinate};
use fadsim_logic::regulations::{can_proceed, Regulations};

use crate::registry::RegistryError;

/// What a permitted action did.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Deployed(Entity),
    /// The FAD is back in stock; its fish went back into the tile.
    Recovered { returned: BiomassPool },
    /// A successful set; the catch is now in the vessel's hold.
    Caught(BiomassPool),
    /// The set was made but the school escaped.
    Missed,
}

/// Why a permitted action could not be carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    Registry(RegistryError),
    OutsideMap(Coordinate),
    NotWater(Cell),
}

impl From<RegistryError> for ActionError {
    fn from(e: RegistryError) -> Self {
        ActionError::Registry(e)
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Registry(e) => write!(f, "{}", e),
            ActionError::OutsideMap(c) => write!(f, "({}, {}) is outside the map", c.lon, c.lat),
            ActionError::NotWater(c) => write!(f, "Cell ({}, {}) is not open water", c.x, c.y),
        }
    }
}

impl std::error::Error for ActionError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Performed(Effect),
    /// Blocked by the named regulation; nothing changed.
    Forbidden { regulation: String },
    Failed(ActionError),
}

impl ActionOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, ActionOutcome::Performed(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ActionOutcome::Forbidden { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    regulations: Regulations,
}

impl ActionGate {
    pub fn new(regulations: Regulations) -> Self {
        Self { regulations }
    }

    pub fn regulations(&self) -> &Regulations {
        &self.regulations
    }

    pub fn can_proceed(&self, action: &Action) -> bool {
        can_proceed(action, &self.regulations)
    }

    /// `Err` with the name of the first regulation forbidding `action`.
    pub fn check(&self, action: &Action) -> Result<(), String> {
        match self.regulations.first_forbidding(action) {
            Some(name) => Err(name.to_string()),
            None => Ok(()),
        }
    }
}
