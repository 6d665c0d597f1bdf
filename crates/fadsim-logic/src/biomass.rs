//! Per-species biomass pools and the mass-conserving transfers between them.
//!
//! Both grid tiles and FADs own a [`BiomassPool`]. Every transfer removes
//! from one pool exactly what it adds to the other, clamped so the source
//! never goes negative and the destination never exceeds its capacity.

use serde::{Deserialize, Serialize};

/// What lies under a grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Habitat {
    /// Open water, the only fishable habitat.
    #[default]
    Water,
    Land,
    /// Water closed to aggregation (marine reserve).
    Protected,
    /// Water with no usable biology.
    Inert,
}

impl Habitat {
    pub fn is_fishable(&self) -> bool {
        matches!(self, Habitat::Water)
    }

    pub fn is_land(&self) -> bool {
        matches!(self, Habitat::Land)
    }
}

/// Non-negative mass per species, indexed by species position in the
/// global species list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomassPool {
    masses: Vec<f64>,
}

impl BiomassPool {
    /// Empty pool for `species` species.
    pub fn empty(species: usize) -> Self {
        Self {
            masses: vec![0.0; species],
        }
    }

    /// Pool with the given masses; negative entries are clamped to zero.
    pub fn from_masses(masses: Vec<f64>) -> Self {
        Self {
            masses: masses.into_iter().map(|m| m.max(0.0)).collect(),
        }
    }

    pub fn species_count(&self) -> usize {
        self.masses.len()
    }

    pub fn get(&self, species: usize) -> f64 {
        self.masses.get(species).copied().unwrap_or(0.0)
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn total(&self) -> f64 {
        self.masses.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.iter().all(|m| *m <= 0.0)
    }

    fn slot(&mut self, species: usize) -> &mut f64 {
        if species >= self.masses.len() {
            self.masses.resize(species + 1, 0.0);
        }
        &mut self.masses[species]
    }

    /// Add mass from outside the system (initialisation, growth).
    pub fn add(&mut self, species: usize, amount: f64) {
        *self.slot(species) += amount.max(0.0);
    }

    /// Empty this pool, returning what it held.
    pub fn take_all(&mut self) -> BiomassPool {
        let n = self.masses.len();
        std::mem::replace(self, BiomassPool::empty(n))
    }

    /// Empty a single species, returning the mass removed.
    pub fn take(&mut self, species: usize) -> f64 {
        std::mem::take(self.slot(species))
    }
}

/// Move up to `requested` of one species from `source` into `dest`, never
/// taking more than the source holds nor filling `dest` beyond `capacity`.
/// Returns the amount moved.
pub fn transfer(
    source: &mut BiomassPool,
    dest: &mut BiomassPool,
    species: usize,
    requested: f64,
    capacity: f64,
) -> f64 {
    let available = source.get(species);
    let room = capacity - dest.get(species);
    let amount = requested.min(available).min(room).max(0.0);
    if amount > 0.0 {
        *source.slot(species) -= amount;
        *dest.slot(species) += amount;
    }
    amount
}

/// Move everything from `source` into `dest` with no capacity limit.
/// Returns the total mass moved.
pub fn transfer_all(source: &mut BiomassPool, dest: &mut BiomassPool) -> f64 {
    let taken = source.take_all();
    let mut moved = 0.0;
    for (species, mass) in taken.masses.iter().enumerate() {
        if *mass > 0.0 {
            *dest.slot(species) += *mass;
            moved += *mass;
        }
    }
    moved
}

/// One aggregation step: for each species pull `available * rate` from the
/// tile, limited by the remaining capacity of the FAD. Returns the mass caught
/// per species. Nothing moves when `rate <= 0`.
pub fn aggregate(
    fad: &mut BiomassPool,
    capacity: &[f64],
    rate: f64,
    tile: &mut BiomassPool,
) -> BiomassPool {
    let species = capacity.len().max(tile.species_count());
    let mut caught = BiomassPool::empty(species);
    if rate <= 0.0 {
        return caught;
    }
    for s in 0..species {
        let cap = capacity.get(s).copied().unwrap_or(0.0);
        let wanted = tile.get(s) * rate;
        let moved = transfer(tile, fad, s, wanted, cap);
        caught.add(s, moved);
    }
    caught
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_saturates_at_capacity() {
        let mut tile = BiomassPool::from_masses(vec![10.0]);
        let mut fad = BiomassPool::empty(1);

        let caught = aggregate(&mut fad, &[3.0], 0.5, &mut tile);
        assert_eq!(caught.get(0), 3.0);
        assert_eq!(tile.get(0), 7.0);
        assert_eq!(fad.get(0), 3.0);

        let caught = aggregate(&mut fad, &[3.0], 0.5, &mut tile);
        assert_eq!(caught.get(0), 0.0);
        assert_eq!(tile.get(0), 7.0);
        assert_eq!(fad.get(0), 3.0);
    }

    #[test]
    fn test_aggregate_rate_bound() {
        let mut tile = BiomassPool::from_masses(vec![8.0, 4.0]);
        let mut fad = BiomassPool::empty(2);
        let caught = aggregate(&mut fad, &[100.0, 100.0], 0.25, &mut tile);
        assert_eq!(caught.masses(), &[2.0, 1.0]);
        assert_eq!(tile.masses(), &[6.0, 3.0]);
    }

    #[test]
    fn test_zero_rate_moves_nothing() {
        let mut tile = BiomassPool::from_masses(vec![8.0]);
        let mut fad = BiomassPool::empty(1);
        aggregate(&mut fad, &[100.0], 0.0, &mut tile);
        aggregate(&mut fad, &[100.0], -1.0, &mut tile);
        assert_eq!(tile.get(0), 8.0);
        assert_eq!(fad.get(0), 0.0);
    }

    #[test]
    fn test_rate_above_one_never_overdraws() {
        let mut tile = BiomassPool::from_masses(vec![2.0]);
        let mut fad = BiomassPool::empty(1);
        aggregate(&mut fad, &[100.0], 5.0, &mut tile);
        assert_eq!(tile.get(0), 0.0);
        assert_eq!(fad.get(0), 2.0);
    }

    #[test]
    fn test_over_capacity_fad_does_not_push_back() {
        let mut tile = BiomassPool::from_masses(vec![10.0]);
        let mut fad = BiomassPool::from_masses(vec![5.0]);
        let caught = aggregate(&mut fad, &[3.0], 0.5, &mut tile);
        assert_eq!(caught.get(0), 0.0);
        assert_eq!(tile.get(0), 10.0);
    }

    #[test]
    fn test_transfer_all() {
        let mut fad = BiomassPool::from_masses(vec![1.5, 2.5]);
        let mut hold = BiomassPool::empty(1);
        let moved = transfer_all(&mut fad, &mut hold);
        assert_eq!(moved, 4.0);
        assert!(fad.is_empty());
        assert_eq!(hold.masses(), &[1.5, 2.5]);
    }

    #[test]
    fn test_habitat_flags() {
        assert!(Habitat::Water.is_fishable());
        assert!(!Habitat::Protected.is_fishable());
        assert!(!Habitat::Inert.is_fishable());
        assert!(Habitat::Land.is_land());
    }
}
