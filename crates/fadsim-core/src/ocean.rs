//! The grid of tiles FADs drift over.

use serde::{Deserialize, Serialize};

use fadsim_logic::biomass::{BiomassPool, Habitat};
use fadsim_logic::grid::{Cell, MapExtent};

use crate::config::SimulationConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub habitat: Habitat,
    pub biomass: BiomassPool,
}

/// Row-major tile storage over a [`MapExtent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ocean {
    extent: MapExtent,
    species: usize,
    tiles: Vec<Tile>,
}

impl Ocean {
    /// Open water everywhere, no biomass.
    pub fn new(extent: MapExtent, species: usize) -> Self {
        let tile = Tile {
            habitat: Habitat::Water,
            biomass: BiomassPool::empty(species),
        };
        Self {
            extent,
            species,
            tiles: vec![tile; extent.cell_count()],
        }
    }

    /// Build the ocean described by a validated config.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut ocean = Self::new(config.map, config.species_count());
        for patch in &config.habitats {
            for cell in &patch.cells {
                ocean.set_habitat(*cell, patch.habitat);
            }
        }
        for patch in &config.initial_biomass {
            match &patch.cells {
                Some(cells) => {
                    for cell in cells {
                        ocean.add_biomass(*cell, patch.species, patch.mass_per_cell);
                    }
                }
                None => {
                    for tile in ocean.tiles.iter_mut().filter(|t| t.habitat.is_fishable()) {
                        tile.biomass.add(patch.species, patch.mass_per_cell);
                    }
                }
            }
        }
        ocean
    }

    pub fn extent(&self) -> &MapExtent {
        &self.extent
    }

    pub fn species_count(&self) -> usize {
        self.species
    }

    pub fn tile(&self, cell: Cell) -> Option<&Tile> {
        self.extent.index_of(cell).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, cell: Cell) -> Option<&mut Tile> {
        self.extent.index_of(cell).map(move |i| &mut self.tiles[i])
    }

    pub fn habitat(&self, cell: Cell) -> Option<Habitat> {
        self.tile(cell).map(|t| t.habitat)
    }

    pub fn set_habitat(&mut self, cell: Cell, habitat: Habitat) {
        if let Some(tile) = self.tile_mut(cell) {
            tile.habitat = habitat;
        }
    }

    pub fn add_biomass(&mut self, cell: Cell, species: usize, mass: f64) {
        if let Some(tile) = self.tile_mut(cell) {
            tile.biomass.add(species, mass);
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = (Cell, &Tile)> {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, t)| (self.extent.cell_at_index(i), t))
    }

    /// Biomass of one species summed over every tile.
    pub fn total_biomass(&self, species: usize) -> f64 {
        self.tiles.iter().map(|t| t.biomass.get(species)).sum()
    }

    pub(crate) fn tiles_raw(&self) -> &[Tile] {
        &self.tiles
    }

    pub(crate) fn from_raw(extent: MapExtent, species: usize, tiles: Vec<Tile>) -> Option<Self> {
        if tiles.len() != extent.cell_count() {
            return None;
        }
        Some(Self {
            extent,
            species,
            tiles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BiomassPatch, HabitatPatch};

    #[test]
    fn test_from_config_seeds_only_water() {
        let mut config = SimulationConfig {
            map: MapExtent::new(0.0, 4.0, 0.0, 4.0, 4, 4),
            ..Default::default()
        };
        config.habitats.push(HabitatPatch {
            habitat: Habitat::Land,
            cells: vec![Cell::new(0, 0), Cell::new(1, 0)],
        });
        config.initial_biomass.push(BiomassPatch {
            species: 0,
            mass_per_cell: 2.0,
            cells: None,
        });
        let ocean = Ocean::from_config(&config);
        assert_eq!(ocean.habitat(Cell::new(0, 0)), Some(Habitat::Land));
        assert_eq!(ocean.tile(Cell::new(0, 0)).unwrap().biomass.get(0), 0.0);
        assert_eq!(ocean.total_biomass(0), 14.0 * 2.0);
    }

    #[test]
    fn test_off_map_cells_ignored() {
        let mut ocean = Ocean::new(MapExtent::new(0.0, 2.0, 0.0, 2.0, 2, 2), 1);
        ocean.add_biomass(Cell::new(5, 5), 0, 1.0);
        assert!(ocean.tile(Cell::new(5, 5)).is_none());
        assert_eq!(ocean.total_biomass(0), 0.0);
    }
}
