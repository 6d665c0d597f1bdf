//! Running counters the engine keeps for reporting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fadsim_logic::biomass::BiomassPool;
use fadsim_logic::currents::GapKind;

/// Current lookups that fell back to the zero vector, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapCounts {
    pub no_pattern_data: u64,
    pub uncovered_cell: u64,
    pub missing_sample: u64,
}

impl GapCounts {
    pub fn record(&mut self, kind: GapKind) {
        match kind {
            GapKind::NoPatternData => self.no_pattern_data += 1,
            GapKind::UncoveredCell => self.uncovered_cell += 1,
            GapKind::MissingSample => self.missing_sample += 1,
        }
    }

    pub fn get(&self, kind: GapKind) -> u64 {
        match kind {
            GapKind::NoPatternData => self.no_pattern_data,
            GapKind::UncoveredCell => self.uncovered_cell,
            GapKind::MissingSample => self.missing_sample,
        }
    }

    pub fn total(&self) -> u64 {
        self.no_pattern_data + self.uncovered_cell + self.missing_sample
    }

    pub fn merge(&mut self, other: &GapCounts) {
        self.no_pattern_data += other.no_pattern_data;
        self.uncovered_cell += other.uncovered_cell;
        self.missing_sample += other.missing_sample;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub gaps: GapCounts,
    pub fads_lost_off_map: u64,
    pub fads_beached: u64,
    pub fads_expired: u64,
    /// Biomass carried off the map by lost FADs.
    pub biomass_lost: BiomassPool,
    /// Biomass released by FADs back into their tiles.
    pub biomass_released: BiomassPool,
    /// Forbidden action attempts per regulation name.
    pub forbidden: BTreeMap<String, u64>,
    pub actions_performed: u64,
    pub actions_failed: u64,
}

impl Diagnostics {
    pub fn new(species: usize) -> Self {
        Self {
            biomass_lost: BiomassPool::empty(species),
            biomass_released: BiomassPool::empty(species),
            ..Default::default()
        }
    }

    pub fn record_forbidden(&mut self, regulation: &str) {
        *self.forbidden.entry(regulation.to_string()).or_insert(0) += 1;
    }

    pub fn forbidden_total(&self) -> u64 {
        self.forbidden.values().sum()
    }
}
