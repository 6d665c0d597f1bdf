//! fadsim Core - FAD Fishery Simulation Engine
//!
//! An ECS-based simulation of a purse-seine fishery in which vessels deploy
//! drifting fish aggregating devices (FADs), let them gather fish, and set
//! their nets on them, all under spatial and seasonal closures.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: FADs, owned by the [`registry::ObjectRegistry`]
//! - **Components**: Pure data attached to entities (Fad, DriftPosition, FadBiomass)
//! - **Systems**: Logic that queries and updates components (drift, aggregation, release)
//!
//! Pure math (grid, currents, biomass transfers, regulations) lives in
//! `fadsim-logic`; this crate adds the world, the clock, randomness and I/O.
//!
//! # Example
//!
//! ```rust,no_run
//! use fadsim_core::prelude::*;
//!
//! let config = SimulationConfig::from_json_str(r#"{ "seed": 7 }"#).unwrap();
//! let mut engine = SimulationEngine::new(config).unwrap();
//!
//! // One simulated year at one step per day
//! engine.run(365);
//! ```

pub mod components;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod gate;
pub mod ocean;
pub mod persistence;
pub mod registry;
pub mod schedule;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::SimulationConfig;
    pub use crate::engine::{SimulationEngine, StepReport};
    pub use crate::gate::{ActionOutcome, Effect};
    pub use fadsim_logic::action::VesselId;
    pub use fadsim_logic::grid::{Cell, Coordinate};
}
