//! Aggregation systems - fish gathering under FADs, FAD ageing, and fish
//! leaving FADs again.

use rand::Rng;

use fadsim_logic::biomass::{aggregate, transfer, BiomassPool};

use crate::components::{DriftPosition, Fad, FadBiomass};
use crate::ocean::Ocean;
use crate::registry::ObjectRegistry;

#[derive(Debug, Default)]
pub struct AggregationReport {
    pub fads_aggregated: usize,
    pub caught: BiomassPool,
}

/// Deactivate FADs that have outlived their lifetime. Returns how many were
/// deactivated this step.
pub fn expiry_system(registry: &mut ObjectRegistry, step: u64, steps_per_day: u32) -> usize {
    let order = registry.all_deployed();
    let world = registry.world_mut();
    let mut expired = 0;
    for entity in order {
        if let Ok(mut fad) = world.get::<&mut Fad>(entity) {
            if fad.active && fad.is_expired(step, steps_per_day) {
                fad.active = false;
                expired += 1;
                log::debug!("{} reached the end of its lifetime", fad.id);
            }
        }
    }
    expired
}

/// Pull fish from each FAD's tile into the FAD. A FAD aggregates at most
/// once per step; calling this again for the same step moves nothing.
pub fn aggregation_system(
    registry: &mut ObjectRegistry,
    ocean: &mut Ocean,
    step: u64,
    steps_per_day: u32,
) -> AggregationReport {
    let mut report = AggregationReport {
        caught: BiomassPool::empty(ocean.species_count()),
        ..Default::default()
    };
    let order = registry.all_deployed();
    let world = registry.world_mut();

    for entity in order {
        let Ok((fad, biomass, drift)) =
            world.query_one_mut::<(&mut Fad, &mut FadBiomass, &DriftPosition)>(entity)
        else {
            continue;
        };
        if fad.last_aggregation_step == Some(step) {
            continue;
        }
        fad.last_aggregation_step = Some(step);
        if !fad.can_attract(step, steps_per_day) {
            continue;
        }
        let Some(tile) = ocean.tile_mut(drift.cell) else {
            continue;
        };
        if !tile.habitat.is_fishable() {
            continue;
        }

        let caught = aggregate(
            &mut biomass.0,
            &fad.carrying_capacity,
            fad.attraction_rate,
            &mut tile.biomass,
        );
        for (species, mass) in caught.masses().iter().enumerate() {
            report.caught.add(species, *mass);
        }
        report.fads_aggregated += 1;
    }
    report
}

/// For each FAD and species, with the FAD's release probability, let that
/// species' fish go back into the tile. Returns the released mass.
pub fn release_system<R: Rng>(
    registry: &mut ObjectRegistry,
    ocean: &mut Ocean,
    rng: &mut R,
) -> BiomassPool {
    let mut released = BiomassPool::empty(ocean.species_count());
    let order = registry.all_deployed();
    let world = registry.world_mut();

    for entity in order {
        let Ok((fad, biomass, drift)) =
            world.query_one_mut::<(&Fad, &mut FadBiomass, &DriftPosition)>(entity)
        else {
            continue;
        };
        let Some(tile) = ocean.tile_mut(drift.cell) else {
            continue;
        };
        for species in 0..fad.release_probabilities.len() {
            let p = fad.release_probability(species);
            if p <= 0.0 || rng.gen::<f64>() >= p {
                continue;
            }
            let moved = transfer(
                &mut biomass.0,
                &mut tile.biomass,
                species,
                f64::INFINITY,
                f64::INFINITY,
            );
            released.add(species, moved);
        }
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use fadsim_logic::action::VesselId;
    use fadsim_logic::biomass::Habitat;
    use fadsim_logic::grid::{Cell, MapExtent};
    use hecs::Entity;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::config::FadConfig;

    const CELL: Cell = Cell { x: 1, y: 1 };

    fn setup(params: FadConfig, tile_mass: f64) -> (ObjectRegistry, Ocean, Entity) {
        let mut ocean = Ocean::new(MapExtent::new(0.0, 3.0, 0.0, 3.0, 3, 3), 1);
        ocean.add_biomass(CELL, 0, tile_mass);
        let mut registry = ObjectRegistry::new();
        registry.register_vessel(VesselId(1), 1);
        let fad = registry
            .deploy(
                VesselId(1),
                DriftPosition {
                    position: CELL.center(),
                    cell: CELL,
                },
                &params,
                0,
            )
            .unwrap();
        (registry, ocean, fad)
    }

    fn params(rate: f64, capacity: f64) -> FadConfig {
        FadConfig {
            attraction_rate: rate,
            carrying_capacity: vec![capacity],
            ..Default::default()
        }
    }

    #[test]
    fn test_saturation_over_two_steps() {
        let (mut registry, mut ocean, fad) = setup(params(0.5, 3.0), 10.0);
        let report = aggregation_system(&mut registry, &mut ocean, 0, 1);
        assert_eq!(report.caught.get(0), 3.0);
        let report = aggregation_system(&mut registry, &mut ocean, 1, 1);
        assert_eq!(report.caught.get(0), 0.0);
        assert_eq!(registry.biomass(fad).unwrap().get(0), 3.0);
        assert_eq!(ocean.total_biomass(0), 7.0);
    }

    #[test]
    fn test_second_call_same_step_is_noop() {
        let (mut registry, mut ocean, fad) = setup(params(0.1, 100.0), 10.0);
        aggregation_system(&mut registry, &mut ocean, 4, 1);
        let after_first = registry.biomass(fad).unwrap().get(0);
        let report = aggregation_system(&mut registry, &mut ocean, 4, 1);
        assert_eq!(report.fads_aggregated, 0);
        assert_eq!(registry.biomass(fad).unwrap().get(0), after_first);
        assert!((ocean.total_biomass(0) + after_first - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_aggregation_off_water() {
        let (mut registry, mut ocean, fad) = setup(params(0.5, 100.0), 10.0);
        ocean.set_habitat(CELL, Habitat::Protected);
        aggregation_system(&mut registry, &mut ocean, 0, 1);
        assert_eq!(registry.biomass(fad).unwrap().get(0), 0.0);
    }

    #[test]
    fn test_attraction_delay_and_expiry() {
        let p = FadConfig {
            days_before_attraction: 2,
            lifetime_days: Some(3),
            ..params(0.5, 100.0)
        };
        let (mut registry, mut ocean, fad) = setup(p, 16.0);
        assert_eq!(aggregation_system(&mut registry, &mut ocean, 1, 1).fads_aggregated, 0);
        assert_eq!(aggregation_system(&mut registry, &mut ocean, 2, 1).fads_aggregated, 1);
        assert_eq!(expiry_system(&mut registry, 3, 1), 1);
        assert_eq!(expiry_system(&mut registry, 4, 1), 0);
        assert_eq!(aggregation_system(&mut registry, &mut ocean, 3, 1).fads_aggregated, 0);
        assert_eq!(registry.biomass(fad).unwrap().get(0), 8.0);
    }

    #[test]
    fn test_certain_release_empties_fad() {
        let p = FadConfig {
            release_probabilities: vec![1.0],
            ..params(0.5, 100.0)
        };
        let (mut registry, mut ocean, fad) = setup(p, 10.0);
        aggregation_system(&mut registry, &mut ocean, 0, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let released = release_system(&mut registry, &mut ocean, &mut rng);
        assert_eq!(released.get(0), 5.0);
        assert_eq!(registry.biomass(fad).unwrap().get(0), 0.0);
        assert_eq!(ocean.total_biomass(0), 10.0);
    }

    #[test]
    fn test_zero_release_probability_keeps_fish() {
        let p = FadConfig {
            release_probabilities: vec![0.0],
            ..params(0.5, 100.0)
        };
        let (mut registry, mut ocean, fad) = setup(p, 10.0);
        aggregation_system(&mut registry, &mut ocean, 0, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        release_system(&mut registry, &mut ocean, &mut rng);
        assert_eq!(registry.biomass(fad).unwrap().get(0), 5.0);
    }
}
