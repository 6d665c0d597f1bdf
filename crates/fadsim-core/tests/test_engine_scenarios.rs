//! Integration tests for the engine loop and gated fishing actions.
//!
//! Exercises: SimulationConfig → SimulationEngine → step / try_* → save / load

use fadsim_core::config::{BoundaryPolicy, FadConfig, SimulationConfig};
use fadsim_core::gate::{ActionError, ActionOutcome, Effect};
use fadsim_core::registry::RegistryError;
use fadsim_core::engine::SimulationEngine;
use fadsim_core::schedule::RestockSchedule;
use fadsim_logic::action::VesselId;
use fadsim_logic::biomass::Habitat;
use fadsim_logic::currents::{CurrentField, CurrentPattern};
use fadsim_logic::grid::{meters_per_degree_lat, Cell, Coordinate, SECONDS_PER_DAY};
use fadsim_logic::vector::Vec2;

// ── Helpers ────────────────────────────────────────────────────────────

const ALBACORA: VesselId = VesselId(1);
const MARLIN: VesselId = VesselId(2);

/// 10 × 10 one-degree cells around the equator, 100 t per water cell.
const SCENARIO: &str = r#"{
  "name": "test fishery",
  "seed": 2024,
  "start_date": "2023-01-01",
  "map": { "west": 0.0, "east": 10.0, "south": -5.0, "north": 5.0, "width": 10, "height": 10 },
  "species": ["skipjack"],
  "habitats": [ { "habitat": "Land", "cells": [ { "x": 9, "y": 5 } ] } ],
  "initial_biomass": [ { "species": 0, "mass_per_cell": 100.0 } ],
  "vessels": [
    { "id": 1, "name": "Albacora", "tags": ["closure A"], "initial_stock": 3 },
    { "id": 2, "name": "Marlin", "initial_stock": 1 }
  ],
  "fad": { "attraction_rate": 0.1, "carrying_capacity": [30.0], "release_probabilities": [0.05] },
  "drift": { "boundary": "Lose" },
  "cell_sets": { "reserve": [ { "x": 0, "y": 0 } ] },
  "regulations": [
    { "name": "Reserve", "forbidden_if": { "type": "in_cell_set", "set": "reserve" } },
    { "name": "Closure A", "forbidden_if": { "type": "all_of", "of": [
        { "type": "agent_has_tag", "tag": "closure A" },
        { "type": "between_yearly_dates",
          "start": { "month": 7, "day": 29 }, "end": { "month": 10, "day": 8 } } ] } }
  ]
}"#;

fn scenario() -> SimulationConfig {
    SimulationConfig::from_json_str(SCENARIO).expect("valid scenario")
}

fn engine() -> SimulationEngine {
    SimulationEngine::new(scenario()).expect("valid engine")
}

/// Eastward drift of `cells_per_day` everywhere, pattern 0.
fn eastward(cells_per_day: f64) -> CurrentField {
    let speed = cells_per_day * meters_per_degree_lat() / SECONDS_PER_DAY;
    let mut field = CurrentField::new(365);
    for x in 0..10 {
        for y in 0..10 {
            field
                .insert(0, CurrentPattern(0), Cell::new(x, y), Vec2::new(speed, 0.0))
                .unwrap();
        }
    }
    field
}

fn open_water(engine: &SimulationEngine, x: i32, y: i32) -> Coordinate {
    engine.ocean.extent().cell_center(Cell::new(x, y))
}

fn deployed(outcome: ActionOutcome) -> hecs::Entity {
    match outcome {
        ActionOutcome::Performed(Effect::Deployed(e)) => e,
        other => panic!("expected deployment, got {:?}", other),
    }
}

// ── Inventory ──────────────────────────────────────────────────────────

#[test]
fn stock_of_one_allows_exactly_one_deployment() {
    let mut engine = engine();
    let at = open_water(&engine, 4, 4);
    deployed(engine.try_deploy(MARLIN, at));
    assert_eq!(
        engine.try_deploy(MARLIN, at),
        ActionOutcome::Failed(ActionError::Registry(RegistryError::InsufficientStock(MARLIN)))
    );
}

#[test]
fn stock_plus_deployed_is_conserved() {
    let mut engine = engine();
    let a = deployed(engine.try_deploy(ALBACORA, open_water(&engine, 3, 3)));
    let _b = deployed(engine.try_deploy(ALBACORA, open_water(&engine, 5, 5)));
    let total = |e: &SimulationEngine| e.registry.inventory(ALBACORA).unwrap().total();
    assert_eq!(total(&engine), 3);

    engine.run(3);
    assert!(engine.try_recover(ALBACORA, a).is_performed());
    assert_eq!(total(&engine), 3);
    assert_eq!(engine.registry.inventory(ALBACORA).unwrap().stock(), 2);
}

#[test]
fn foreign_fad_cannot_be_recovered() {
    let mut engine = engine();
    let fad = deployed(engine.try_deploy(ALBACORA, open_water(&engine, 3, 3)));
    let outcome = engine.try_recover(MARLIN, fad);
    assert!(matches!(
        outcome,
        ActionOutcome::Failed(ActionError::Registry(RegistryError::NotDeployed { .. }))
    ));
    assert_eq!(engine.registry.fad_count(), 1);
}

#[test]
fn deployment_on_land_fails() {
    let mut engine = engine();
    let outcome = engine.try_deploy(ALBACORA, open_water(&engine, 9, 5));
    assert_eq!(outcome, ActionOutcome::Failed(ActionError::NotWater(Cell::new(9, 5))));
    assert_eq!(engine.registry.inventory(ALBACORA).unwrap().stock(), 3);
}

// ── Regulations ────────────────────────────────────────────────────────

#[test]
fn forbidden_deployment_changes_nothing() {
    let mut engine = engine();
    let before = engine.registry.inventory(ALBACORA).unwrap().stock();
    let outcome = engine.try_deploy(ALBACORA, open_water(&engine, 0, 0));
    assert_eq!(
        outcome,
        ActionOutcome::Forbidden {
            regulation: "Reserve".into()
        }
    );
    assert_eq!(engine.registry.inventory(ALBACORA).unwrap().stock(), before);
    assert_eq!(engine.registry.fad_count(), 0);
    assert_eq!(engine.diagnostics().forbidden["Reserve"], 1);
}

#[test]
fn seasonal_closure_only_binds_tagged_vessels() {
    let mut engine = engine();
    // 2023-08-15 is day 226 counted from Jan 1
    engine.run(226);
    let at = open_water(&engine, 4, 4);
    assert!(engine.try_deploy(ALBACORA, at).is_forbidden());
    assert!(engine.try_deploy(MARLIN, at).is_performed());
}

// ── Aggregation and sets ───────────────────────────────────────────────

#[test]
fn biomass_is_conserved_through_aggregation_and_sets() {
    let mut config = scenario();
    config.fad.release_probabilities = vec![0.0];
    let mut engine = SimulationEngine::new(config).unwrap();
    let initial = engine.total_biomass(0);

    let fad = deployed(engine.try_deploy(ALBACORA, open_water(&engine, 4, 4)));
    engine.run(10);
    let aggregated = engine.registry.biomass(fad).unwrap().get(0);
    assert!(aggregated > 0.0 && aggregated <= 30.0);

    match engine.try_set(ALBACORA, fad) {
        ActionOutcome::Performed(Effect::Caught(catch)) => assert_eq!(catch.get(0), aggregated),
        other => panic!("expected catch, got {:?}", other),
    }
    assert_eq!(engine.registry.biomass(fad).unwrap().get(0), 0.0);
    assert_eq!(engine.vessel(ALBACORA).unwrap().catch.get(0), aggregated);
    assert!((engine.total_biomass(0) - initial).abs() < 1e-6);
}

#[test]
fn failed_set_leaves_fad_untouched() {
    let mut config = scenario();
    config.exploitation.fad_set_success_probability = 0.0;
    let mut engine = SimulationEngine::new(config).unwrap();
    let fad = deployed(engine.try_deploy(ALBACORA, open_water(&engine, 4, 4)));
    engine.run(2);
    let held = engine.registry.biomass(fad).unwrap();
    assert_eq!(engine.try_set(ALBACORA, fad), ActionOutcome::Performed(Effect::Missed));
    assert_eq!(engine.registry.biomass(fad).unwrap(), held);
}

#[test]
fn non_associated_set_takes_fraction_of_cell() {
    let mut config = scenario();
    config.exploitation.non_associated_success_probability = 1.0;
    config.exploitation.non_associated_catch_fraction = 0.25;
    let mut engine = SimulationEngine::new(config).unwrap();
    match engine.try_non_associated_set(MARLIN, open_water(&engine, 6, 2)) {
        ActionOutcome::Performed(Effect::Caught(catch)) => assert_eq!(catch.get(0), 25.0),
        other => panic!("expected catch, got {:?}", other),
    }
    let tile = engine.ocean.tile(Cell::new(6, 2)).unwrap();
    assert_eq!(tile.biomass.get(0), 75.0);
}

// ── Drift ──────────────────────────────────────────────────────────────

#[test]
fn fad_drifting_off_the_map_is_lost_with_its_fish() {
    let mut engine = engine().with_currents(eastward(1.0));
    let fad = deployed(engine.try_deploy(ALBACORA, open_water(&engine, 7, 2)));
    let initial = engine.total_biomass(0);

    let reports = engine.run(4);
    assert_eq!(reports.iter().map(|r| r.lost).sum::<usize>(), 1);
    assert!(engine.registry.position(fad).is_none());
    assert_eq!(engine.diagnostics().fads_lost_off_map, 1);
    assert_eq!(engine.registry.inventory(ALBACORA).unwrap().total(), 2);
    assert!((engine.total_biomass(0) - initial).abs() < 1e-6);
}

#[test]
fn clamp_policy_keeps_fad_on_edge() {
    let mut config = scenario();
    config.drift.boundary = BoundaryPolicy::Clamp;
    let mut engine = SimulationEngine::new(config).unwrap().with_currents(eastward(1.0));
    let fad = deployed(engine.try_deploy(ALBACORA, open_water(&engine, 7, 2)));
    engine.run(5);
    assert_eq!(engine.registry.position(fad).unwrap().cell, Cell::new(9, 2));
}

#[test]
fn beached_fad_returns_fish_to_previous_tile() {
    let mut config = scenario();
    config.fad.release_probabilities = vec![0.0];
    let mut engine = SimulationEngine::new(config).unwrap().with_currents(eastward(1.0));
    deployed(engine.try_deploy(ALBACORA, open_water(&engine, 7, 5)));
    let initial = engine.total_biomass(0);

    engine.run(2);
    assert_eq!(engine.diagnostics().fads_beached, 1);
    assert_eq!(engine.registry.fad_count(), 0);
    assert_eq!(engine.ocean.habitat(Cell::new(9, 5)), Some(Habitat::Land));
    assert!((engine.total_biomass(0) - initial).abs() < 1e-6);
}

#[test]
fn missing_currents_are_counted_as_gaps() {
    let mut engine = engine();
    deployed(engine.try_deploy(ALBACORA, open_water(&engine, 4, 4)));
    engine.run(3);
    assert_eq!(engine.diagnostics().gaps.no_pattern_data, 3);
}

// ── Restocking ─────────────────────────────────────────────────────────

#[test]
fn yearly_restock_tops_up_inventory() {
    let mut engine = engine();
    engine.set_restock_schedule(RestockSchedule::parse("2023,1,5\n2024,1,6\n").unwrap());

    let report = engine.step();
    assert!(report.restocked);
    let inv = engine.registry.inventory(ALBACORA).unwrap();
    assert_eq!(inv.total(), 5);
    assert_eq!(inv.spent(), 2.0 * engine.config().restock.unit_cost);

    // Steps 1..=365; step 365 is 2024-01-01
    engine.run(365);
    assert_eq!(engine.registry.inventory(ALBACORA).unwrap().total(), 6);
    assert_eq!(engine.registry.inventory(MARLIN).unwrap().total(), 1);
}

// ── Determinism and persistence ────────────────────────────────────────

fn busy_engine() -> SimulationEngine {
    let mut config = scenario();
    config.fad = FadConfig {
        random_position_in_cell: true,
        release_probabilities: vec![0.3],
        ..config.fad
    };
    config.exploitation.fad_set_success_probability = 0.5;
    let mut engine = SimulationEngine::new(config).unwrap().with_currents(eastward(0.2));
    for (x, y) in [(1, 1), (2, 6), (4, 8)] {
        engine.try_deploy(ALBACORA, open_water(&engine, x, y));
    }
    engine
}

fn trajectory(engine: &mut SimulationEngine, steps: u64) -> Vec<(Vec2, f64)> {
    let mut out = Vec::new();
    for _ in 0..steps {
        engine.step();
        for fad in engine.registry.all_deployed() {
            engine.try_set(ALBACORA, fad);
            out.push((
                engine.registry.position(fad).unwrap().position,
                engine.registry.biomass(fad).unwrap().get(0),
            ));
        }
    }
    out
}

#[test]
fn same_seed_gives_identical_runs() {
    let a = trajectory(&mut busy_engine(), 20);
    let b = trajectory(&mut busy_engine(), 20);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn saved_run_continues_identically() {
    let mut original = busy_engine();
    trajectory(&mut original, 5);

    let mut buffer = Vec::new();
    original.save(&mut buffer).unwrap();
    let mut restored = busy_engine();
    restored.load(buffer.as_slice()).unwrap();
    assert_eq!(restored.current_step(), original.current_step());

    let a = trajectory(&mut original, 10);
    let b = trajectory(&mut restored, 10);
    assert_eq!(a, b);
    assert_eq!(
        original.vessel(ALBACORA).unwrap().catch,
        restored.vessel(ALBACORA).unwrap().catch
    );
}
