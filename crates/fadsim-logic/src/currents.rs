//! Time- and pattern-indexed ocean current field.
//!
//! Samples are stored per current pattern (a "regime" such as a given year's
//! circulation) and per day of a repeating cycle. Lookups between sampled days
//! interpolate linearly, searching circularly so the days just after the last
//! sample of a cycle blend toward the first sample of the next one.
//!
//! Cells without data resolve to the zero vector. That fallback is kept, but
//! every lookup says *why* it had no data (see [`GapKind`]) so callers can
//! count gaps instead of silently drifting nothing.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::grid::Cell;
use crate::vector::Vec2;

/// Default cycle: a non-leap year of daily samples.
pub const DEFAULT_CYCLE_LENGTH: u32 = 365;

/// Identifier of a current regime. Which pattern applies on a given step is
/// decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrentPattern(pub u16);

/// Why a lookup produced no vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GapKind {
    /// The pattern has no samples at all.
    NoPatternData,
    /// The cell never appears for this pattern (land, an excluded lake...).
    UncoveredCell,
    /// The cell appears on other days but not on a bracketing day.
    MissingSample,
}

/// Result of a current lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrentLookup {
    /// The requested day was sampled (or only one sample day exists).
    Sampled(Vec2),
    /// Blended from the samples before and after the requested day.
    Interpolated(Vec2),
    /// No usable sample: the vector is zero.
    Gap(GapKind),
}

impl CurrentLookup {
    pub fn vector(&self) -> Vec2 {
        match self {
            CurrentLookup::Sampled(v) | CurrentLookup::Interpolated(v) => *v,
            CurrentLookup::Gap(_) => Vec2::ZERO,
        }
    }

    pub fn gap(&self) -> Option<GapKind> {
        match self {
            CurrentLookup::Gap(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Errors raised while filling a current field.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentTableError {
    Parse { line: usize, message: String },
    DayOutsideCycle { day: u32, cycle_length: u32 },
}

impl std::fmt::Display for CurrentTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrentTableError::Parse { line, message } => {
                write!(f, "Current table line {}: {}", line, message)
            }
            CurrentTableError::DayOutsideCycle { day, cycle_length } => write!(
                f,
                "Sample day {} outside cycle of {} days",
                day, cycle_length
            ),
        }
    }
}

impl std::error::Error for CurrentTableError {}

#[derive(Debug, Clone, Default)]
struct PatternSamples {
    /// day → cell → velocity (m/s)
    days: BTreeMap<u32, HashMap<Cell, Vec2>>,
    /// every cell that has at least one sample for this pattern
    covered: HashSet<Cell>,
}

/// Sampled current vectors for every pattern.
#[derive(Debug, Clone)]
pub struct CurrentField {
    cycle_length: u32,
    patterns: BTreeMap<CurrentPattern, PatternSamples>,
}

impl Default for CurrentField {
    fn default() -> Self {
        Self::new(DEFAULT_CYCLE_LENGTH)
    }
}

impl CurrentField {
    pub fn new(cycle_length: u32) -> Self {
        Self {
            cycle_length: cycle_length.max(1),
            patterns: BTreeMap::new(),
        }
    }

    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = CurrentPattern> + '_ {
        self.patterns.keys().copied()
    }

    /// Sampled days of a pattern, ascending.
    pub fn sampled_days(&self, pattern: CurrentPattern) -> Vec<u32> {
        self.patterns
            .get(&pattern)
            .map(|p| p.days.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of (day, cell) samples stored for a pattern.
    pub fn sample_count(&self, pattern: CurrentPattern) -> usize {
        self.patterns
            .get(&pattern)
            .map(|p| p.days.values().map(HashMap::len).sum())
            .unwrap_or(0)
    }

    /// Store one sample. A later sample for the same key replaces the earlier one.
    pub fn insert(
        &mut self,
        day: u32,
        pattern: CurrentPattern,
        cell: Cell,
        velocity: Vec2,
    ) -> Result<(), CurrentTableError> {
        if day >= self.cycle_length {
            return Err(CurrentTableError::DayOutsideCycle {
                day,
                cycle_length: self.cycle_length,
            });
        }
        let samples = self.patterns.entry(pattern).or_default();
        samples.days.entry(day).or_default().insert(cell, velocity);
        samples.covered.insert(cell);
        Ok(())
    }

    /// Parse a `day,x,y,u,v` table into `pattern`. Blank lines and lines
    /// starting with `#` are skipped, as is a leading header line whose first
    /// field is not a number. Returns the number of samples read.
    pub fn load_table(
        &mut self,
        pattern: CurrentPattern,
        content: &str,
    ) -> Result<usize, CurrentTableError> {
        let mut rows = 0;
        let mut seen_first = false;

        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();

            if !seen_first {
                seen_first = true;
                if parts.first().map_or(true, |p| p.parse::<f64>().is_err()) {
                    continue;
                }
            }

            if parts.len() < 5 {
                return Err(CurrentTableError::Parse {
                    line: line_num + 1,
                    message: format!("expected 5 columns, got {}", parts.len()),
                });
            }

            let parse_err = |what: &str, raw: &str| CurrentTableError::Parse {
                line: line_num + 1,
                message: format!("invalid {} '{}'", what, raw),
            };
            let day: u32 = parts[0].parse().map_err(|_| parse_err("day", parts[0]))?;
            let x: i32 = parts[1].parse().map_err(|_| parse_err("x", parts[1]))?;
            let y: i32 = parts[2].parse().map_err(|_| parse_err("y", parts[2]))?;
            let u: f64 = parts[3].parse().map_err(|_| parse_err("u", parts[3]))?;
            let v: f64 = parts[4].parse().map_err(|_| parse_err("v", parts[4]))?;

            self.insert(day, pattern, Cell::new(x, y), Vec2::new(u, v))?;
            rows += 1;
        }

        Ok(rows)
    }

    /// Current velocity (m/s) at `cell` on `day` under `pattern`; zero when
    /// there is no coverage.
    pub fn vector_at(&self, day: f64, pattern: CurrentPattern, cell: Cell) -> Vec2 {
        self.lookup(day, pattern, cell).vector()
    }

    /// Like [`vector_at`](Self::vector_at) but reports how the vector was obtained.
    ///
    /// `day` may be fractional and lie outside the cycle; it is wrapped into
    /// `[0, cycle_length)`.
    pub fn lookup(&self, day: f64, pattern: CurrentPattern, cell: Cell) -> CurrentLookup {
        let samples = match self.patterns.get(&pattern) {
            Some(s) if !s.days.is_empty() => s,
            _ => return CurrentLookup::Gap(GapKind::NoPatternData),
        };
        if !samples.covered.contains(&cell) {
            return CurrentLookup::Gap(GapKind::UncoveredCell);
        }

        let cycle = self.cycle_length as f64;
        let day = day.rem_euclid(cycle);

        // Both always succeed: `days` is non-empty and the search wraps.
        let (day_before, map_before) = match samples.days.range(..=day.floor() as u32).next_back()
        {
            Some(entry) => entry,
            None => match samples.days.iter().next_back() {
                Some(entry) => entry,
                None => return CurrentLookup::Gap(GapKind::NoPatternData),
            },
        };
        let (day_after, map_after) = match samples.days.range(day.ceil() as u32..).next() {
            Some(entry) => entry,
            None => match samples.days.iter().next() {
                Some(entry) => entry,
                None => return CurrentLookup::Gap(GapKind::NoPatternData),
            },
        };

        let before = match map_before.get(&cell) {
            Some(v) => *v,
            None => return CurrentLookup::Gap(GapKind::MissingSample),
        };
        if day_before == day_after {
            return CurrentLookup::Sampled(before);
        }
        let after = match map_after.get(&cell) {
            Some(v) => *v,
            None => return CurrentLookup::Gap(GapKind::MissingSample),
        };

        let offset_before = (day - *day_before as f64).rem_euclid(cycle);
        let offset_after = (*day_after as f64 - day).rem_euclid(cycle);
        let total = offset_before + offset_after;
        if total == 0.0 {
            return CurrentLookup::Sampled(before);
        }
        CurrentLookup::Interpolated(before.lerp(&after, offset_before / total))
    }
}
