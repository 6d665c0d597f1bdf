//! Descriptors for proposed fishing actions, consumed read-only by the
//! regulation predicates.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::grid::Coordinate;

/// Identifier of a fishing vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VesselId(pub u32);

impl std::fmt::Display for VesselId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vessel {}", self.0)
    }
}

/// Classification of a proposed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Put a FAD from stock into the water.
    Deployment,
    /// Take an own FAD out of the water and back into stock.
    Recovery,
    /// Set the net around a FAD and take its aggregated fish.
    FadSet,
    /// Set the net on a free school, no FAD involved.
    NonAssociatedSet,
}

impl ActionKind {
    /// Short logbook code.
    pub fn code(&self) -> &'static str {
        match self {
            ActionKind::Deployment => "DPL",
            ActionKind::Recovery => "RCV",
            ActionKind::FadSet => "FAD",
            ActionKind::NonAssociatedSet => "NOA",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "DPL" => Some(ActionKind::Deployment),
            "RCV" => Some(ActionKind::Recovery),
            "FAD" => Some(ActionKind::FadSet),
            "NOA" => Some(ActionKind::NonAssociatedSet),
            _ => None,
        }
    }
}

/// A proposed state transition, with when and where it happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub vessel: VesselId,
    /// Tags of the acting vessel (licences, closure groups...).
    pub vessel_tags: Vec<String>,
    pub start: NaiveDateTime,
    /// `None` while the action is still ongoing.
    pub end: Option<NaiveDateTime>,
    pub start_coord: Coordinate,
    pub end_coord: Coordinate,
}

impl Action {
    /// An instantaneous action at a single place.
    pub fn at(kind: ActionKind, vessel: VesselId, time: NaiveDateTime, coord: Coordinate) -> Self {
        Self {
            kind,
            vessel,
            vessel_tags: Vec::new(),
            start: time,
            end: Some(time),
            start_coord: coord,
            end_coord: coord,
        }
    }

    /// Set where and when the action finishes.
    pub fn ending(mut self, time: NaiveDateTime, coord: Coordinate) -> Self {
        self.end = Some(time);
        self.end_coord = coord;
        self
    }

    /// Mark the action as still ongoing.
    pub fn ongoing(mut self) -> Self {
        self.end = None;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vessel_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.vessel_tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_code_roundtrip() {
        for kind in [
            ActionKind::Deployment,
            ActionKind::Recovery,
            ActionKind::FadSet,
            ActionKind::NonAssociatedSet,
        ] {
            assert_eq!(ActionKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ActionKind::from_code("XXX"), None);
    }

    #[test]
    fn test_builders() {
        let t0 = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let t1 = t0 + chrono::Duration::hours(3);
        let action = Action::at(ActionKind::FadSet, VesselId(7), t0, Coordinate::new(-100.0, 2.0))
            .ending(t1, Coordinate::new(-99.0, 2.0))
            .with_tags(["closure A"]);
        assert_eq!(action.end, Some(t1));
        assert_eq!(action.end_coord.lon, -99.0);
        assert!(action.has_tag("closure A"));
        assert!(!action.has_tag("closure B"));
        assert_eq!(action.ongoing().end, None);
    }
}
