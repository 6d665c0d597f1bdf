//! Simulation engine - main entry point for running the simulation

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use hecs::Entity;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use fadsim_logic::action::{Action, ActionKind, VesselId};
use fadsim_logic::biomass::{transfer, transfer_all, BiomassPool};
use fadsim_logic::currents::{CurrentField, CurrentPattern};
use fadsim_logic::grid::{Cell, Coordinate};
use fadsim_logic::regulations::build_regulations;
use fadsim_logic::vector::Vec2;

use crate::components::*;
use crate::config::{ConfigError, SimulationConfig};
use crate::diagnostics::Diagnostics;
use crate::gate::{ActionError, ActionGate, ActionOutcome, Effect};
use crate::ocean::Ocean;
use crate::persistence::SaveError;
use crate::registry::{ObjectRegistry, RegistryError};
use crate::schedule::{RestockSchedule, ScheduleCache};
use crate::systems::*;

/// Picks the current pattern for a point in time.
pub type PatternClassifier = Box<dyn Fn(NaiveDateTime) -> CurrentPattern>;

/// Summary of one call to [`SimulationEngine::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub step: u64,
    pub restocked: bool,
    pub expired: usize,
    pub moved: usize,
    pub lost: usize,
    pub beached: usize,
    pub aggregated: usize,
    pub caught: f64,
    pub released: f64,
}

/// Main simulation engine
pub struct SimulationEngine {
    config: SimulationConfig,
    /// Tiles and their biomass
    pub ocean: Ocean,
    pub currents: CurrentField,
    /// FADs and vessel inventories
    pub registry: ObjectRegistry,
    gate: ActionGate,
    vessels: BTreeMap<VesselId, Vessel>,
    drift: DriftEngine,
    classifier: Option<PatternClassifier>,
    restock_schedule: Option<RestockSchedule>,
    schedule_cache: ScheduleCache,
    rng: ChaCha8Rng,
    /// Index of the next step to run
    step: u64,
    diagnostics: Diagnostics,
}

impl SimulationEngine {
    /// Build an engine from a scenario. Fails before any step runs if the
    /// scenario or its regulations are invalid.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let regulations = build_regulations(&config.regulations, &config.cell_sets, config.map)?;
        let species = config.species_count();

        let mut registry = ObjectRegistry::new();
        let mut vessels = BTreeMap::new();
        for v in &config.vessels {
            registry.register_vessel(v.id, v.initial_stock);
            vessels.insert(v.id, Vessel::from_config(v, species));
        }

        log::info!(
            "Starting '{}' on {}: {} vessels, {} regulations, seed {}",
            config.name,
            config.start_date,
            vessels.len(),
            regulations.len(),
            config.seed
        );

        Ok(Self {
            ocean: Ocean::from_config(&config),
            currents: CurrentField::new(config.currents.cycle_length),
            registry,
            gate: ActionGate::new(regulations),
            vessels,
            drift: DriftEngine::new(&config.drift, config.steps_per_day),
            classifier: None,
            restock_schedule: None,
            schedule_cache: ScheduleCache::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            step: 0,
            diagnostics: Diagnostics::new(species),
            config,
        })
    }

    pub fn with_currents(mut self, currents: CurrentField) -> Self {
        self.currents = currents;
        self
    }

    /// Replace the configured pattern schedule with a custom classifier.
    pub fn set_pattern_classifier<F>(&mut self, classifier: F)
    where
        F: Fn(NaiveDateTime) -> CurrentPattern + 'static,
    {
        self.classifier = Some(Box::new(classifier));
    }

    /// Use an in-memory restock schedule instead of `restock.schedule_path`.
    pub fn set_restock_schedule(&mut self, schedule: RestockSchedule) {
        self.restock_schedule = Some(schedule);
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn gate(&self) -> &ActionGate {
        &self.gate
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Index of the next step to run.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn vessel(&self, id: VesselId) -> Option<&Vessel> {
        self.vessels.get(&id)
    }

    pub fn vessels(&self) -> impl Iterator<Item = &Vessel> {
        self.vessels.values()
    }

    pub fn time_at(&self, step: u64) -> NaiveDateTime {
        let start = self.config.start_date.and_time(NaiveTime::default());
        start + Duration::hours(step as i64 * self.config.hours_per_step())
    }

    /// Start of the next step.
    pub fn current_time(&self) -> NaiveDateTime {
        self.time_at(self.step)
    }

    /// Fractional day of the year used to index the current cycle.
    pub fn day_of_cycle(&self, time: NaiveDateTime) -> f64 {
        time.ordinal0() as f64 + time.hour() as f64 / 24.0
    }

    pub fn pattern_at(&self, time: NaiveDateTime) -> CurrentPattern {
        match &self.classifier {
            Some(classify) => classify(time),
            None => self.config.currents.schedule.pattern_for(time),
        }
    }

    /// Every biomass pool in the system, per species: tiles, FADs, catches
    /// and what was lost off the map.
    pub fn total_biomass(&self, species: usize) -> f64 {
        self.ocean.total_biomass(species)
            + self.registry.total_fad_biomass(species)
            + self.vessels.values().map(|v| v.catch.get(species)).sum::<f64>()
            + self.diagnostics.biomass_lost.get(species)
    }

    fn is_year_start(&self) -> bool {
        self.step == 0 || self.time_at(self.step - 1).year() != self.current_time().year()
    }

    // ── Clock loop ─────────────────────────────────────────────────────

    /// Run one step: restock at a year start, expire old FADs, drift,
    /// aggregate, release.
    pub fn step(&mut self) -> StepReport {
        let now = self.current_time();
        let spd = self.config.steps_per_day;
        let mut report = StepReport {
            step: self.step,
            ..Default::default()
        };

        if self.is_year_start() {
            log::info!("Year {} begins at step {}", now.year(), self.step);
            report.restocked = self.restock_year(now.year());
        }

        report.expired = expiry_system(&mut self.registry, self.step, spd);
        self.diagnostics.fads_expired += report.expired as u64;

        let pattern = self.pattern_at(now);
        let day = self.day_of_cycle(now);
        let drift = drift_system(
            &mut self.registry,
            &self.ocean,
            &self.currents,
            pattern,
            day,
            &self.drift,
        );
        self.diagnostics.gaps.merge(&drift.gaps);
        report.moved = drift.moved + drift.clamped;
        report.lost = drift.off_map.len();
        report.beached = drift.beached.len();
        self.remove_drifted(drift);

        let aggregation = aggregation_system(&mut self.registry, &mut self.ocean, self.step, spd);
        report.aggregated = aggregation.fads_aggregated;
        report.caught = aggregation.caught.total();

        let released = release_system(&mut self.registry, &mut self.ocean, &mut self.rng);
        report.released = released.total();
        for (species, mass) in released.masses().iter().enumerate() {
            self.diagnostics.biomass_released.add(species, *mass);
        }

        self.step += 1;
        report
    }

    pub fn run(&mut self, steps: u64) -> Vec<StepReport> {
        (0..steps).map(|_| self.step()).collect()
    }

    /// Lost FADs take their fish with them; beached FADs drop them in the
    /// tile they came from.
    fn remove_drifted(&mut self, drift: DriftReport) {
        for entity in drift.off_map {
            if let Ok(fish) = self.registry.lose(entity) {
                log::debug!("FAD {:?} drifted off the map with {:.3} t", entity, fish.total());
                for (species, mass) in fish.masses().iter().enumerate() {
                    self.diagnostics.biomass_lost.add(species, *mass);
                }
                self.diagnostics.fads_lost_off_map += 1;
            }
        }
        for (entity, from) in drift.beached {
            if let Ok(mut fish) = self.registry.lose(entity) {
                log::debug!("FAD {:?} beached next to ({}, {})", entity, from.x, from.y);
                if let Some(tile) = self.ocean.tile_mut(from) {
                    transfer_all(&mut fish, &mut tile.biomass);
                }
                self.diagnostics.fads_beached += 1;
            }
        }
    }

    /// Top every vessel up to its scheduled maximum for `year`. Returns
    /// whether a schedule was available.
    fn restock_year(&mut self, year: i32) -> bool {
        let table = match (&self.restock_schedule, &self.config.restock.schedule_path) {
            (Some(schedule), _) => schedule.year(year).cloned().unwrap_or_default(),
            (None, Some(path)) => match self.schedule_cache.get(path, year) {
                Ok(table) => table.clone(),
                Err(e) => {
                    log::warn!("No restock for {}: {}", year, e);
                    return false;
                }
            },
            (None, None) => return false,
        };

        let unit_cost = self.config.restock.unit_cost;
        for (vessel, target) in table {
            match self.registry.restock(vessel, target, unit_cost, year) {
                Ok(_) => {}
                Err(RegistryError::UnknownVessel(v)) => {
                    log::warn!("Restock schedule names unknown {}", v);
                }
                Err(e) => log::warn!("Restock failed: {}", e),
            }
        }
        true
    }

    // ── Gated actions ──────────────────────────────────────────────────

    fn action(&self, kind: ActionKind, vessel: &Vessel, coord: Coordinate) -> Action {
        Action::at(kind, vessel.id, self.current_time(), coord).with_tags(vessel.tags.iter().cloned())
    }

    fn forbid(&mut self, action: &Action, regulation: String) -> ActionOutcome {
        log::debug!(
            "{} {} at ({:.2}, {:.2}) forbidden by '{}'",
            action.vessel,
            action.kind.code(),
            action.start_coord.lon,
            action.start_coord.lat,
            regulation
        );
        self.diagnostics.record_forbidden(&regulation);
        ActionOutcome::Forbidden { regulation }
    }

    fn finish(&mut self, result: Result<Effect, ActionError>) -> ActionOutcome {
        match result {
            Ok(effect) => {
                self.diagnostics.actions_performed += 1;
                ActionOutcome::Performed(effect)
            }
            Err(e) => {
                log::debug!("Action failed: {}", e);
                self.diagnostics.actions_failed += 1;
                ActionOutcome::Failed(e)
            }
        }
    }

    /// Gate `kind` for `vessel` at `coord`. `Err` carries the outcome to
    /// return without acting.
    fn permit(
        &mut self,
        kind: ActionKind,
        vessel: VesselId,
        coord: Coordinate,
    ) -> Result<(), ActionOutcome> {
        let Some(v) = self.vessels.get(&vessel) else {
            return Err(self.finish(Err(RegistryError::UnknownVessel(vessel).into())));
        };
        let action = self.action(kind, v, coord);
        match self.gate.check(&action) {
            Ok(()) => Ok(()),
            Err(regulation) => Err(self.forbid(&action, regulation)),
        }
    }

    /// Deploy one of `vessel`'s FADs in the cell containing `coord`.
    pub fn try_deploy(&mut self, vessel: VesselId, coord: Coordinate) -> ActionOutcome {
        if let Err(outcome) = self.permit(ActionKind::Deployment, vessel, coord) {
            return outcome;
        }
        let result = self.deploy(vessel, coord);
        self.finish(result)
    }

    fn deploy(&mut self, vessel: VesselId, coord: Coordinate) -> Result<Effect, ActionError> {
        let cell = self
            .ocean
            .extent()
            .cell_of(coord)
            .ok_or(ActionError::OutsideMap(coord))?;
        if self.ocean.habitat(cell).is_some_and(|h| h.is_land()) {
            return Err(ActionError::NotWater(cell));
        }
        if self.registry.inventory(vessel).is_some_and(|inv| inv.stock() == 0) {
            return Err(RegistryError::InsufficientStock(vessel).into());
        }
        let position = if self.config.fad.random_position_in_cell {
            Vec2::new(
                cell.x as f64 + self.rng.gen::<f64>(),
                cell.y as f64 + self.rng.gen::<f64>(),
            )
        } else {
            cell.center()
        };
        let entity = self.registry.deploy(
            vessel,
            DriftPosition { position, cell },
            &self.config.fad,
            self.step,
        )?;
        Ok(Effect::Deployed(entity))
    }

    fn fad_location(&self, fad: Entity) -> Result<(Cell, Coordinate), ActionError> {
        let drift = self
            .registry
            .position(fad)
            .ok_or(RegistryError::UnknownObject(fad))?;
        Ok((drift.cell, self.ocean.extent().coordinate_of(drift.position)))
    }

    /// Take `fad` out of the water. Its fish go back into the tile.
    pub fn try_recover(&mut self, vessel: VesselId, fad: Entity) -> ActionOutcome {
        let (cell, coord) = match self.fad_location(fad) {
            Ok(loc) => loc,
            Err(e) => return self.finish(Err(e)),
        };
        if let Err(outcome) = self.permit(ActionKind::Recovery, vessel, coord) {
            return outcome;
        }
        let result = self
            .registry
            .recover(fad, vessel)
            .map_err(ActionError::from)
            .map(|mut fish| {
                let returned = fish.clone();
                if let Some(tile) = self.ocean.tile_mut(cell) {
                    transfer_all(&mut fish, &mut tile.biomass);
                }
                Effect::Recovered { returned }
            });
        self.finish(result)
    }

    /// Set the net around `fad`. On success everything aggregated under it
    /// goes into the vessel's catch; the FAD stays in the water.
    pub fn try_set(&mut self, vessel: VesselId, fad: Entity) -> ActionOutcome {
        let (_, coord) = match self.fad_location(fad) {
            Ok(loc) => loc,
            Err(e) => return self.finish(Err(e)),
        };
        if let Err(outcome) = self.permit(ActionKind::FadSet, vessel, coord) {
            return outcome;
        }

        let p = self.config.exploitation.fad_set_success_probability;
        if self.rng.gen::<f64>() >= p {
            return self.finish(Ok(Effect::Missed));
        }
        let mut caught = match self.registry.take_biomass(fad) {
            Ok(fish) => fish,
            Err(e) => return self.finish(Err(e.into())),
        };
        let landed = caught.clone();
        if let Some(v) = self.vessels.get_mut(&vessel) {
            transfer_all(&mut caught, &mut v.catch);
        }
        self.finish(Ok(Effect::Caught(landed)))
    }

    /// Set on a free-swimming school in the cell containing `coord`.
    pub fn try_non_associated_set(&mut self, vessel: VesselId, coord: Coordinate) -> ActionOutcome {
        if let Err(outcome) = self.permit(ActionKind::NonAssociatedSet, vessel, coord) {
            return outcome;
        }
        let result = self.non_associated_set(vessel, coord);
        self.finish(result)
    }

    fn non_associated_set(&mut self, vessel: VesselId, coord: Coordinate) -> Result<Effect, ActionError> {
        let cell = self
            .ocean
            .extent()
            .cell_of(coord)
            .ok_or(ActionError::OutsideMap(coord))?;
        let species = self.ocean.species_count();
        let fraction = self.config.exploitation.non_associated_catch_fraction;
        let p = self.config.exploitation.non_associated_success_probability;

        let tile = self.ocean.tile_mut(cell).ok_or(ActionError::OutsideMap(coord))?;
        if !tile.habitat.is_fishable() {
            return Err(ActionError::NotWater(cell));
        }
        let hold = &mut self
            .vessels
            .get_mut(&vessel)
            .ok_or(RegistryError::UnknownVessel(vessel))?
            .catch;
        if self.rng.gen::<f64>() >= p {
            return Ok(Effect::Missed);
        }
        let mut landed = BiomassPool::empty(species);
        for s in 0..species {
            let wanted = tile.biomass.get(s) * fraction;
            let moved = transfer(&mut tile.biomass, hold, s, wanted, f64::INFINITY);
            landed.add(s, moved);
        }
        Ok(Effect::Caught(landed))
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        crate::persistence::save_simulation(
            writer,
            self.step,
            &self.rng,
            &self.ocean,
            &self.registry,
            &self.vessels,
            &self.diagnostics,
        )
    }

    /// Load simulation state from a reader. The snapshot must come from an
    /// engine built with the same scenario.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let loaded = crate::persistence::load_simulation(reader)?;
        if loaded.ocean.extent() != self.ocean.extent()
            || loaded.ocean.species_count() != self.ocean.species_count()
        {
            return Err(SaveError::Corrupt(
                "snapshot map or species differ from the scenario".into(),
            ));
        }

        self.step = loaded.step;
        self.rng = loaded.rng;
        self.ocean = loaded.ocean;
        self.registry = loaded.registry;
        self.vessels = loaded.vessels;
        self.diagnostics = loaded.diagnostics;
        log::info!("Loaded simulation at step {}", self.step);
        Ok(())
    }
}
