//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for a compact binary snapshot of everything that changes
//! while the simulation runs. FAD components are serialized individually
//! and respawned on load; the scenario itself (currents, regulations,
//! parameters) is not part of the snapshot and comes from the engine's config.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use fadsim_logic::action::VesselId;
use fadsim_logic::grid::MapExtent;

use crate::components::{DriftPosition, Fad, FadBiomass, FadId, Vessel};
use crate::diagnostics::Diagnostics;
use crate::ocean::{Ocean, Tile};
use crate::registry::{InventoryRecord, ObjectRegistry};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    /// Index of the next step to run
    pub step: u64,
    pub rng: ChaCha8Rng,
    pub extent: MapExtent,
    pub species: usize,
    pub tiles: Vec<Tile>,
    pub vessels: Vec<Vessel>,
    pub inventories: Vec<InventoryRecord>,
    pub fads: Vec<SerializableFad>,
    pub restock_ledger: Vec<(VesselId, i32, u32)>,
    pub next_fad_id: u64,
    pub diagnostics: Diagnostics,
}

/// All components of one FAD entity
#[derive(Serialize, Deserialize)]
pub struct SerializableFad {
    pub fad: Fad,
    pub position: DriftPosition,
    pub biomass: FadBiomass,
}

fn serialize_fads(registry: &ObjectRegistry) -> Vec<SerializableFad> {
    let world = registry.world();
    registry
        .all_deployed()
        .into_iter()
        .filter_map(|entity| {
            let mut query = world
                .query_one::<(&Fad, &DriftPosition, &FadBiomass)>(entity)
                .ok()?;
            let (fad, position, biomass) = query.get()?;
            Some(SerializableFad {
                fad: fad.clone(),
                position: *position,
                biomass: biomass.clone(),
            })
        })
        .collect()
}

/// Write a snapshot of the running state
pub fn save_simulation<W: Write>(
    writer: W,
    step: u64,
    rng: &ChaCha8Rng,
    ocean: &Ocean,
    registry: &ObjectRegistry,
    vessels: &BTreeMap<VesselId, Vessel>,
    diagnostics: &Diagnostics,
) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        step,
        rng: rng.clone(),
        extent: *ocean.extent(),
        species: ocean.species_count(),
        tiles: ocean.tiles_raw().to_vec(),
        vessels: vessels.values().cloned().collect(),
        inventories: registry.inventory_records(),
        fads: serialize_fads(registry),
        restock_ledger: registry.restock_ledger(),
        next_fad_id: registry.next_fad_id(),
        diagnostics: diagnostics.clone(),
    };

    bincode::serialize_into(writer, &save_data)?;
    log::info!(
        "Saved simulation at step {} ({} FADs deployed)",
        step,
        save_data.fads.len()
    );
    Ok(())
}

/// Every inventory entry must name exactly one FAD record owned by that
/// vessel, and every FAD record must be listed once and sit on the map.
fn check_fad_records(save_data: &SaveData) -> Result<(), SaveError> {
    let mut records: BTreeMap<FadId, &SerializableFad> = BTreeMap::new();
    for f in &save_data.fads {
        if records.insert(f.fad.id, f).is_some() {
            return Err(SaveError::Corrupt(format!("{} saved twice", f.fad.id)));
        }
        if !save_data.extent.contains(f.position.cell) {
            return Err(SaveError::Corrupt(format!(
                "{} lies off the map at ({}, {})",
                f.fad.id, f.position.cell.x, f.position.cell.y
            )));
        }
        if f.biomass.0.species_count() != save_data.species {
            return Err(SaveError::Corrupt(format!(
                "{} carries {} species, expected {}",
                f.fad.id,
                f.biomass.0.species_count(),
                save_data.species
            )));
        }
    }

    let mut listed = BTreeSet::new();
    let mut vessels = BTreeSet::new();
    for inventory in &save_data.inventories {
        if !vessels.insert(inventory.vessel) {
            return Err(SaveError::Corrupt(format!("{} has two inventories", inventory.vessel)));
        }
        for id in &inventory.deployed {
            let record = records
                .get(id)
                .ok_or_else(|| SaveError::Corrupt(format!("{} has no FAD record", id)))?;
            if record.fad.owner != inventory.vessel {
                return Err(SaveError::Corrupt(format!(
                    "{} is listed by {} but owned by {}",
                    id, inventory.vessel, record.fad.owner
                )));
            }
            if !listed.insert(*id) {
                return Err(SaveError::Corrupt(format!("{} listed twice", id)));
            }
        }
    }

    if listed.len() != records.len() {
        return Err(SaveError::Corrupt(format!(
            "{} FAD records but {} listed in inventories",
            records.len(),
            listed.len()
        )));
    }
    Ok(())
}

/// Load a snapshot from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<LoadedSimulation, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    check_fad_records(&save_data)?;
    let ocean = Ocean::from_raw(save_data.extent, save_data.species, save_data.tiles)
        .ok_or_else(|| SaveError::Corrupt("tile count does not match the map".into()))?;
    let fads = save_data
        .fads
        .into_iter()
        .map(|f| (f.fad, f.position, f.biomass))
        .collect();
    let registry = ObjectRegistry::restore(
        save_data.inventories,
        fads,
        save_data.restock_ledger,
        save_data.next_fad_id,
    );

    Ok(LoadedSimulation {
        step: save_data.step,
        rng: save_data.rng,
        ocean,
        registry,
        vessels: save_data.vessels.into_iter().map(|v| (v.id, v)).collect(),
        diagnostics: save_data.diagnostics,
    })
}

/// Result of loading a simulation
pub struct LoadedSimulation {
    pub step: u64,
    pub rng: ChaCha8Rng,
    pub ocean: Ocean,
    pub registry: ObjectRegistry,
    pub vessels: BTreeMap<VesselId, Vessel>,
    pub diagnostics: Diagnostics,
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    /// The snapshot decoded but does not fit the engine it is loaded into.
    Corrupt(String),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::Corrupt(msg) => write!(f, "Corrupt save: {}", msg),
        }
    }
}

impl std::error::Error for SaveError {}

#[cfg(test)]
mod tests {
    use super::*;
    use fadsim_logic::grid::Cell;
    use rand::{Rng, SeedableRng};

    use crate::config::FadConfig;

    fn sample_state() -> (ObjectRegistry, Ocean, BTreeMap<VesselId, Vessel>) {
        let mut ocean = Ocean::new(MapExtent::new(0.0, 4.0, 0.0, 4.0, 4, 4), 1);
        ocean.add_biomass(Cell::new(2, 2), 0, 12.5);
        let mut registry = ObjectRegistry::new();
        registry.register_vessel(VesselId(7), 3);
        let cell = Cell::new(2, 2);
        registry
            .deploy(
                VesselId(7),
                DriftPosition {
                    position: cell.center(),
                    cell,
                },
                &FadConfig::default(),
                0,
            )
            .unwrap();
        let vessel = Vessel {
            id: VesselId(7),
            name: "Cabo Blanco".into(),
            tags: vec!["closure A".into()],
            catch: Default::default(),
        };
        let mut vessels = BTreeMap::new();
        vessels.insert(vessel.id, vessel);
        (registry, ocean, vessels)
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (registry, ocean, vessels) = sample_state();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let _: u64 = rng.gen();

        let mut buffer = Vec::new();
        save_simulation(&mut buffer, 17, &rng, &ocean, &registry, &vessels, &Diagnostics::new(1))
            .unwrap();
        let mut loaded = load_simulation(buffer.as_slice()).unwrap();

        assert_eq!(loaded.step, 17);
        assert_eq!(loaded.ocean, ocean);
        assert_eq!(loaded.vessels, vessels);
        assert_eq!(loaded.registry.fad_count(), 1);
        assert_eq!(loaded.registry.inventory(VesselId(7)).unwrap().stock(), 2);
        assert_eq!(loaded.rng.gen::<u64>(), rng.gen::<u64>());
    }

    /// Save the sample state, edit the decoded snapshot, and reload it.
    fn reload_edited(edit: impl FnOnce(&mut SaveData)) -> Result<LoadedSimulation, SaveError> {
        let (registry, ocean, vessels) = sample_state();
        let rng = ChaCha8Rng::seed_from_u64(3);
        let mut buffer = Vec::new();
        save_simulation(&mut buffer, 4, &rng, &ocean, &registry, &vessels, &Diagnostics::new(1))
            .unwrap();
        let mut data: SaveData = bincode::deserialize(&buffer).unwrap();
        edit(&mut data);
        let edited = bincode::serialize(&data).unwrap();
        load_simulation(edited.as_slice())
    }

    #[test]
    fn test_unedited_snapshot_loads() {
        assert!(reload_edited(|_| {}).is_ok());
    }

    #[test]
    fn test_unlisted_fad_is_corrupt() {
        let result = reload_edited(|data| {
            data.inventories[0].deployed.clear();
            data.fads[0].biomass.0.add(0, 7.0);
        });
        assert!(matches!(result, Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn test_listed_fad_without_record_is_corrupt() {
        let result = reload_edited(|data| data.fads.clear());
        assert!(matches!(result, Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn test_off_map_fad_is_corrupt() {
        let result = reload_edited(|data| data.fads[0].position.cell.x = 500);
        assert!(matches!(result, Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn test_fad_listed_by_wrong_vessel_is_corrupt() {
        let result = reload_edited(|data| data.fads[0].fad.owner = VesselId(8));
        assert!(matches!(result, Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn test_duplicate_fad_id_is_corrupt() {
        let result = reload_edited(|data| {
            let copy = SerializableFad {
                fad: data.fads[0].fad.clone(),
                position: data.fads[0].position,
                biomass: data.fads[0].biomass.clone(),
            };
            data.fads.push(copy);
        });
        assert!(matches!(result, Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn test_version_mismatch() {
        let (registry, ocean, vessels) = sample_state();
        let rng = ChaCha8Rng::seed_from_u64(1);
        let mut buffer = Vec::new();
        save_simulation(&mut buffer, 0, &rng, &ocean, &registry, &vessels, &Diagnostics::new(1))
            .unwrap();
        // Version is the first field, a little-endian u32
        buffer[0] = 99;
        match load_simulation(buffer.as_slice()) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, 99);
            }
            _ => panic!("expected version mismatch"),
        }
    }
}
