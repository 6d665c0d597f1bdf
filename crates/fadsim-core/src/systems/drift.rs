//! Drift system - moves FADs with the local current.

use hecs::Entity;

use fadsim_logic::currents::{CurrentField, CurrentPattern, GapKind};
use fadsim_logic::grid::{Cell, MapExtent, ScaleMode};
use fadsim_logic::vector::Vec2;

use crate::components::DriftPosition;
use crate::config::{BoundaryPolicy, DriftConfig};
use crate::diagnostics::GapCounts;
use crate::ocean::Ocean;
use crate::registry::ObjectRegistry;

/// Where a FAD ends up after one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftOutcome {
    Moved(DriftPosition),
    /// Left the map and was pinned to the edge.
    Clamped(DriftPosition),
    /// Left the map under [`BoundaryPolicy::Lose`].
    OffMap,
}

/// Converts currents into displacements for one step.
#[derive(Debug, Clone, Copy)]
pub struct DriftEngine {
    pub boundary: BoundaryPolicy,
    pub scale_mode: ScaleMode,
    pub days_per_step: f64,
}

impl DriftEngine {
    pub fn new(config: &DriftConfig, steps_per_day: u32) -> Self {
        Self {
            boundary: config.boundary,
            scale_mode: config.scale_mode,
            days_per_step: 1.0 / steps_per_day.max(1) as f64,
        }
    }

    /// Advance a continuous position by `velocity` (m/s) for one step.
    pub fn step(&self, position: Vec2, velocity: Vec2, extent: &MapExtent) -> DriftOutcome {
        let lat = extent.coordinate_of(position).lat;
        let reference = extent.reference_latitude(self.scale_mode, lat);
        let displacement = extent.velocity_to_cells_per_day(velocity, reference) * self.days_per_step;
        let next = position + displacement;

        if let Some(cell) = extent.cell_at(next) {
            return DriftOutcome::Moved(DriftPosition {
                position: next,
                cell,
            });
        }
        match self.boundary {
            BoundaryPolicy::Lose => DriftOutcome::OffMap,
            BoundaryPolicy::Clamp => {
                let clamped = clamp_to_extent(next, extent);
                DriftOutcome::Clamped(DriftPosition {
                    position: clamped,
                    cell: Cell::new(clamped.x.floor() as i32, clamped.y.floor() as i32),
                })
            }
        }
    }
}

/// Largest position still inside the last column/row.
fn clamp_to_extent(pos: Vec2, extent: &MapExtent) -> Vec2 {
    let max_x = extent.width as f64 - 1e-9;
    let max_y = extent.height as f64 - 1e-9;
    Vec2::new(pos.x.clamp(0.0, max_x), pos.y.clamp(0.0, max_y))
}

/// What happened to the fleet of FADs during one drift step.
#[derive(Debug, Default)]
pub struct DriftReport {
    pub moved: usize,
    pub clamped: usize,
    pub gaps: GapCounts,
    /// FADs that left the map under the `Lose` policy.
    pub off_map: Vec<Entity>,
    /// FADs that reached land, with the cell they came from.
    pub beached: Vec<(Entity, Cell)>,
}

/// Drift every FAD in `order`. Positions are updated in place; FADs that
/// leave the map or beach are reported but left in the world for the
/// caller to remove through the registry.
pub fn drift_system(
    registry: &mut ObjectRegistry,
    ocean: &Ocean,
    field: &CurrentField,
    pattern: CurrentPattern,
    day: f64,
    engine: &DriftEngine,
) -> DriftReport {
    let mut report = DriftReport::default();
    let order = registry.all_deployed();
    let world = registry.world_mut();

    for entity in order {
        let Ok(mut drift) = world.get::<&mut DriftPosition>(entity) else {
            continue;
        };
        let lookup = field.lookup(day, pattern, drift.cell);
        if let Some(kind) = lookup.gap() {
            report.gaps.record(kind);
        }

        match engine.step(drift.position, lookup.vector(), ocean.extent()) {
            DriftOutcome::Moved(next) | DriftOutcome::Clamped(next)
                if ocean.habitat(next.cell).is_some_and(|h| h.is_land()) =>
            {
                report.beached.push((entity, drift.cell));
            }
            DriftOutcome::Moved(next) => {
                *drift = next;
                report.moved += 1;
            }
            DriftOutcome::Clamped(next) => {
                *drift = next;
                report.clamped += 1;
            }
            DriftOutcome::OffMap => report.off_map.push(entity),
        }
    }

    let total = report.gaps.total();
    if total > 0 {
        log::warn!(
            "Current coverage gaps this step: {} ({} no pattern data, {} uncovered cells, {} missing samples)",
            total,
            report.gaps.get(GapKind::NoPatternData),
            report.gaps.get(GapKind::UncoveredCell),
            report.gaps.get(GapKind::MissingSample),
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use fadsim_logic::action::VesselId;
    use fadsim_logic::biomass::Habitat;
    use fadsim_logic::grid::{meters_per_degree_lat, SECONDS_PER_DAY};

    use crate::config::FadConfig;

    const P: CurrentPattern = CurrentPattern(0);

    fn extent() -> MapExtent {
        // 1 degree cells straddling the equator
        MapExtent::new(0.0, 10.0, -5.0, 5.0, 10, 10)
    }

    fn engine(boundary: BoundaryPolicy) -> DriftEngine {
        DriftEngine {
            boundary,
            scale_mode: ScaleMode::Uniform,
            days_per_step: 1.0,
        }
    }

    /// Speed in m/s that moves one cell per day at the equator.
    fn one_cell_per_day() -> f64 {
        meters_per_degree_lat() / SECONDS_PER_DAY
    }

    #[test]
    fn test_eastward_current_moves_one_cell() {
        let out = engine(BoundaryPolicy::Lose).step(
            Vec2::new(2.5, 4.5),
            Vec2::new(one_cell_per_day(), 0.0),
            &extent(),
        );
        match out {
            DriftOutcome::Moved(p) => {
                assert_eq!(p.cell, Cell::new(3, 4));
                assert!((p.position.x - 3.5).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sub_cell_position_retained() {
        let out = engine(BoundaryPolicy::Lose).step(
            Vec2::new(2.5, 4.5),
            Vec2::new(one_cell_per_day() * 0.25, 0.0),
            &extent(),
        );
        let DriftOutcome::Moved(p) = out else {
            panic!("expected move");
        };
        assert_eq!(p.cell, Cell::new(2, 4));
        assert!((p.position.x - 2.75).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_policies() {
        let west = Vec2::new(-3.0 * one_cell_per_day(), 0.0);
        let start = Vec2::new(1.5, 4.5);
        assert_eq!(
            engine(BoundaryPolicy::Lose).step(start, west, &extent()),
            DriftOutcome::OffMap
        );
        let DriftOutcome::Clamped(p) = engine(BoundaryPolicy::Clamp).step(start, west, &extent())
        else {
            panic!("expected clamp");
        };
        assert_eq!(p.cell, Cell::new(0, 4));
        assert_eq!(p.position.x, 0.0);
    }

    fn deployed_at(cell: Cell) -> (ObjectRegistry, Entity) {
        let mut registry = ObjectRegistry::new();
        registry.register_vessel(VesselId(1), 1);
        let fad = registry
            .deploy(
                VesselId(1),
                DriftPosition {
                    position: cell.center(),
                    cell,
                },
                &FadConfig::default(),
                0,
            )
            .unwrap();
        (registry, fad)
    }

    #[test]
    fn test_system_reports_beaching() {
        let mut ocean = Ocean::new(extent(), 1);
        ocean.set_habitat(Cell::new(5, 4), Habitat::Land);
        let mut field = CurrentField::new(365);
        field
            .insert(0, P, Cell::new(4, 4), Vec2::new(one_cell_per_day(), 0.0))
            .unwrap();
        let (mut registry, fad) = deployed_at(Cell::new(4, 4));

        let report = drift_system(&mut registry, &ocean, &field, P, 0.0, &engine(BoundaryPolicy::Lose));
        assert_eq!(report.beached, vec![(fad, Cell::new(4, 4))]);
        assert_eq!(registry.position(fad).unwrap().cell, Cell::new(4, 4));
    }

    #[test]
    fn test_system_counts_gaps_and_stays_put() {
        let ocean = Ocean::new(extent(), 1);
        let mut field = CurrentField::new(365);
        field.insert(0, P, Cell::new(0, 0), Vec2::new(1.0, 0.0)).unwrap();
        let (mut registry, fad) = deployed_at(Cell::new(4, 4));

        let report = drift_system(&mut registry, &ocean, &field, P, 0.0, &engine(BoundaryPolicy::Lose));
        assert_eq!(report.gaps.get(GapKind::UncoveredCell), 1);
        assert_eq!(report.moved, 1);
        assert_eq!(registry.position(fad).unwrap().cell, Cell::new(4, 4));
    }
}
