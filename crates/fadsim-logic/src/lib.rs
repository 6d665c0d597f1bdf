//! Pure simulation logic for fadsim.
//!
//! This crate holds the parts of the FAD fishery model that are independent
//! of any ECS, random source or file system. Functions take plain data and
//! return results, so everything here is unit-testable on its own and shared
//! by the engine and the headless harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`action`] | Proposed fishing actions (deploy, recover, set) and vessel ids |
//! | [`biomass`] | Per-species pools, habitats, mass-conserving transfers and aggregation |
//! | [`currents`] | Pattern/day-indexed current field with circular interpolation |
//! | [`grid`] | Equirectangular map grid, cells, coordinates, m/s → cells/day |
//! | [`regulations`] | Boolean predicate algebra and named "forbidden if" regulations |
//! | [`vector`] | 2D vector math |

pub mod action;
pub mod biomass;
pub mod currents;
pub mod grid;
pub mod regulations;
pub mod vector;
