//! Object registry - owns every deployed FAD and each vessel's inventory.
//!
//! The hecs `World` is the arena of FADs; everything else in the engine holds
//! `Entity` handles. All creation and destruction of FADs goes through this
//! type so that inventories stay consistent with the world:
//! each FAD belongs to exactly one vessel and appears exactly once in that
//! vessel's deployed list.

use std::collections::BTreeMap;

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use fadsim_logic::action::VesselId;
use fadsim_logic::biomass::BiomassPool;

use crate::components::{DriftPosition, Fad, FadBiomass, FadId};
use crate::config::FadConfig;

/// Resource violations. The engine reports these as failed actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InsufficientStock(VesselId),
    NotDeployed { fad: Entity, vessel: VesselId },
    UnknownVessel(VesselId),
    UnknownObject(Entity),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InsufficientStock(v) => write!(f, "{} has no FADs in stock", v),
            RegistryError::NotDeployed { fad, vessel } => {
                write!(f, "FAD {:?} is not deployed by {}", fad, vessel)
            }
            RegistryError::UnknownVessel(v) => write!(f, "Unknown {}", v),
            RegistryError::UnknownObject(e) => write!(f, "Unknown FAD {:?}", e),
        }
    }
}

impl std::error::Error for RegistryError {}

/// One vessel's FADs: undeployed stock plus the deployed FADs in deployment order.
#[derive(Debug, Clone, Default)]
pub struct VesselInventory {
    stock: u32,
    deployed: Vec<Entity>,
    spent: f64,
}

impl VesselInventory {
    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn deployed(&self) -> &[Entity] {
        &self.deployed
    }

    /// FADs owned, in the water or not.
    pub fn total(&self) -> u32 {
        self.stock + self.deployed.len() as u32
    }

    /// Money spent on restocking so far.
    pub fn spent(&self) -> f64 {
        self.spent
    }
}

/// Inventory in a form that survives save/load: deployed FADs by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub vessel: VesselId,
    pub stock: u32,
    pub deployed: Vec<FadId>,
    pub spent: f64,
}

#[derive(Default)]
pub struct ObjectRegistry {
    world: World,
    inventories: BTreeMap<VesselId, VesselInventory>,
    /// Target applied per (vessel, period), making restocks idempotent.
    restocks: BTreeMap<(VesselId, i32), u32>,
    next_fad_id: u64,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vessel with an initial stock. Re-registering keeps the
    /// existing inventory.
    pub fn register_vessel(&mut self, vessel: VesselId, stock: u32) {
        self.inventories.entry(vessel).or_insert(VesselInventory {
            stock,
            ..Default::default()
        });
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access for systems that update FAD components in place.
    /// Spawning and despawning must go through the registry.
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn vessels(&self) -> impl Iterator<Item = VesselId> + '_ {
        self.inventories.keys().copied()
    }

    pub fn inventory(&self, vessel: VesselId) -> Option<&VesselInventory> {
        self.inventories.get(&vessel)
    }

    pub fn deployed(&self, vessel: VesselId) -> &[Entity] {
        self.inventories
            .get(&vessel)
            .map(|inv| inv.deployed.as_slice())
            .unwrap_or(&[])
    }

    /// Every deployed FAD, ordered by vessel id then deployment order.
    pub fn all_deployed(&self) -> Vec<Entity> {
        self.inventories
            .values()
            .flat_map(|inv| inv.deployed.iter().copied())
            .collect()
    }

    pub fn owner(&self, fad: Entity) -> Option<VesselId> {
        self.world.get::<&Fad>(fad).ok().map(|f| f.owner)
    }

    pub fn fad_count(&self) -> usize {
        self.inventories.values().map(|inv| inv.deployed.len()).sum()
    }

    /// Biomass of one species held by all FADs.
    pub fn total_fad_biomass(&self, species: usize) -> f64 {
        self.world
            .query::<&FadBiomass>()
            .iter()
            .map(|(_, b)| b.0.get(species))
            .sum()
    }

    pub fn position(&self, fad: Entity) -> Option<DriftPosition> {
        self.world.get::<&DriftPosition>(fad).ok().map(|p| *p)
    }

    pub fn biomass(&self, fad: Entity) -> Option<BiomassPool> {
        self.world.get::<&FadBiomass>(fad).ok().map(|b| b.0.clone())
    }

    pub fn fad(&self, fad: Entity) -> Option<Fad> {
        self.world.get::<&Fad>(fad).ok().map(|f| (*f).clone())
    }

    /// Put a new FAD in the water for `vessel`, taking it from stock.
    pub fn deploy(
        &mut self,
        vessel: VesselId,
        position: DriftPosition,
        params: &FadConfig,
        step: u64,
    ) -> Result<Entity, RegistryError> {
        let inventory = self
            .inventories
            .get_mut(&vessel)
            .ok_or(RegistryError::UnknownVessel(vessel))?;
        if inventory.stock == 0 {
            return Err(RegistryError::InsufficientStock(vessel));
        }

        let id = FadId(self.next_fad_id);
        self.next_fad_id += 1;
        let fad = Fad::new(id, vessel, step, position.cell, params);
        let pool = BiomassPool::empty(params.carrying_capacity.len());
        let entity = self.world.spawn((fad, position, FadBiomass(pool)));

        inventory.stock -= 1;
        inventory.deployed.push(entity);
        log::debug!("{} deployed {} at ({}, {})", vessel, id, position.cell.x, position.cell.y);
        Ok(entity)
    }

    /// Take a FAD out of the water and back into its owner's stock. Returns
    /// the fish it held, for the caller to put somewhere.
    pub fn recover(&mut self, fad: Entity, vessel: VesselId) -> Result<BiomassPool, RegistryError> {
        let inventory = self
            .inventories
            .get_mut(&vessel)
            .ok_or(RegistryError::UnknownVessel(vessel))?;
        let index = inventory
            .deployed
            .iter()
            .position(|e| *e == fad)
            .ok_or(RegistryError::NotDeployed { fad, vessel })?;

        let biomass = Self::despawn(&mut self.world, fad)?;
        inventory.deployed.remove(index);
        inventory.stock += 1;
        Ok(biomass)
    }

    /// Remove a FAD for good (drifted away, beached). Stock is not returned.
    pub fn lose(&mut self, fad: Entity) -> Result<BiomassPool, RegistryError> {
        let owner = self.owner(fad).ok_or(RegistryError::UnknownObject(fad))?;
        let biomass = Self::despawn(&mut self.world, fad)?;
        if let Some(inventory) = self.inventories.get_mut(&owner) {
            inventory.deployed.retain(|e| *e != fad);
        }
        Ok(biomass)
    }

    /// Empty a FAD's pool, as when a set catches its school.
    pub fn take_biomass(&mut self, fad: Entity) -> Result<BiomassPool, RegistryError> {
        Self::take_from(&self.world, fad)
    }

    fn take_from(world: &World, fad: Entity) -> Result<BiomassPool, RegistryError> {
        world
            .get::<&mut FadBiomass>(fad)
            .map(|mut b| b.0.take_all())
            .map_err(|_| RegistryError::UnknownObject(fad))
    }

    fn despawn(world: &mut World, fad: Entity) -> Result<BiomassPool, RegistryError> {
        let biomass = Self::take_from(world, fad)?;
        world
            .despawn(fad)
            .map_err(|_| RegistryError::UnknownObject(fad))?;
        Ok(biomass)
    }

    /// Buy FADs so the vessel owns `target` in total. Charges
    /// `unit_cost * shortfall` and returns the charge. A second call for the
    /// same vessel, period and target does nothing, even if FADs were lost
    /// in between.
    pub fn restock(
        &mut self,
        vessel: VesselId,
        target: u32,
        unit_cost: f64,
        period: i32,
    ) -> Result<f64, RegistryError> {
        let inventory = self
            .inventories
            .get_mut(&vessel)
            .ok_or(RegistryError::UnknownVessel(vessel))?;
        if self.restocks.get(&(vessel, period)) == Some(&target) {
            return Ok(0.0);
        }
        self.restocks.insert((vessel, period), target);

        let shortfall = target.saturating_sub(inventory.total());
        if shortfall == 0 {
            return Ok(0.0);
        }
        let charge = unit_cost * shortfall as f64;
        inventory.stock += shortfall;
        inventory.spent += charge;
        log::info!(
            "{} restocked {} FADs for period {} (cost {:.2})",
            vessel,
            shortfall,
            period,
            charge
        );
        Ok(charge)
    }

    pub fn inventory_records(&self) -> Vec<InventoryRecord> {
        self.inventories
            .iter()
            .map(|(vessel, inv)| InventoryRecord {
                vessel: *vessel,
                stock: inv.stock,
                deployed: inv
                    .deployed
                    .iter()
                    .filter_map(|e| self.world.get::<&Fad>(*e).ok().map(|f| f.id))
                    .collect(),
                spent: inv.spent,
            })
            .collect()
    }

    pub(crate) fn restock_ledger(&self) -> Vec<(VesselId, i32, u32)> {
        self.restocks
            .iter()
            .map(|((v, p), t)| (*v, *p, *t))
            .collect()
    }

    pub(crate) fn next_fad_id(&self) -> u64 {
        self.next_fad_id
    }

    /// Rebuild a registry from saved parts. FAD entities are spawned afresh;
    /// inventories are relinked through their `FadId`s.
    pub(crate) fn restore(
        records: Vec<InventoryRecord>,
        fads: Vec<(Fad, DriftPosition, FadBiomass)>,
        ledger: Vec<(VesselId, i32, u32)>,
        next_fad_id: u64,
    ) -> Self {
        let mut world = World::new();
        let mut by_id = BTreeMap::new();
        for (fad, position, biomass) in fads {
            let id = fad.id;
            by_id.insert(id, world.spawn((fad, position, biomass)));
        }
        let inventories = records
            .into_iter()
            .map(|r| {
                let inventory = VesselInventory {
                    stock: r.stock,
                    deployed: r.deployed.iter().filter_map(|id| by_id.get(id).copied()).collect(),
                    spent: r.spent,
                };
                (r.vessel, inventory)
            })
            .collect();
        Self {
            world,
            inventories,
            restocks: ledger.into_iter().map(|(v, p, t)| ((v, p), t)).collect(),
            next_fad_id,
        }
    }
}
