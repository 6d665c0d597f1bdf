//! Yearly restock schedule: how many FADs each vessel may own in a year.
//!
//! ```text
//! # year,vessel,max_stock
//! year,vessel,max_stock
//! 2023,1,300
//! 2023,2,450
//! 2024,1,250
//! ```

use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};
use std::path::{Path, PathBuf};

use fadsim_logic::action::VesselId;

#[derive(Debug)]
pub enum ScheduleError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { line: usize, message: String },
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::Io { path, source } => {
                write!(f, "Cannot read restock schedule {}: {}", path.display(), source)
            }
            ScheduleError::Parse { line, message } => {
                write!(f, "Restock schedule line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for ScheduleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScheduleError::Io { source, .. } => Some(source),
            ScheduleError::Parse { .. } => None,
        }
    }
}

/// Maximum stock per vessel for one year.
pub type YearTable = BTreeMap<VesselId, u32>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestockSchedule {
    years: BTreeMap<i32, YearTable>,
}

impl RestockSchedule {
    pub fn parse(content: &str) -> Result<Self, ScheduleError> {
        let mut years: BTreeMap<i32, YearTable> = BTreeMap::new();
        for (index, raw) in content.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = text.split(',').map(str::trim).collect();
            if fields.len() != 3 {
                return Err(ScheduleError::Parse {
                    line,
                    message: format!("expected 3 columns, found {}", fields.len()),
                });
            }
            if fields[0].eq_ignore_ascii_case("year") {
                continue;
            }
            let parse_err = |what: &str, value: &str| ScheduleError::Parse {
                line,
                message: format!("invalid {} '{}'", what, value),
            };
            let year: i32 = fields[0].parse().map_err(|_| parse_err("year", fields[0]))?;
            let vessel: u32 = fields[1].parse().map_err(|_| parse_err("vessel", fields[1]))?;
            let max: u32 = fields[2]
                .parse()
                .map_err(|_| parse_err("max_stock", fields[2]))?;
            years.entry(year).or_default().insert(VesselId(vessel), max);
        }
        Ok(Self { years })
    }

    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn year(&self, year: i32) -> Option<&YearTable> {
        self.years.get(&year)
    }

    pub fn max_stock(&self, year: i32, vessel: VesselId) -> Option<u32> {
        self.years.get(&year).and_then(|t| t.get(&vessel)).copied()
    }
}

/// Year tables keyed by `(file, year)`. Each key is read from disk once.
#[derive(Debug, Default)]
pub struct ScheduleCache {
    entries: HashMap<(PathBuf, i32), YearTable>,
    reads: usize,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for `year` from the schedule at `path`. A year absent from the
    /// file yields an empty table.
    pub fn get(&mut self, path: &Path, year: i32) -> Result<&YearTable, ScheduleError> {
        match self.entries.entry((path.to_path_buf(), year)) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let schedule = RestockSchedule::load(path)?;
                self.reads += 1;
                log::info!("Loaded restock schedule {} for {}", path.display(), year);
                Ok(e.insert(schedule.year(year).cloned().unwrap_or_default()))
            }
        }
    }

    /// Number of times a file was actually read.
    pub fn reads(&self) -> usize {
        self.reads
    }
}
