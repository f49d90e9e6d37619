//! # Grid Map
//!
//! [`GridMap`] is a multi-layer grid container inspired by
//! [grid_map](https://github.com/ANYbotics/grid_map) by ANYbotics. Unlike a
//! metric map it is indexed directly by cell, since the world projection
//! already produces clipped cell coordinates.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, fs, hash::Hash, io, path::Path};

use ndarray::{Array2, Array3, ArrayView2, s};
use ndarray_stats::QuantileExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A grid-based map containing many layers of information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridMap<T, L>
where
    T: Clone,
    L: Hash + Eq,
{
    /// The number of cells in each axis of the map
    num_cells: (usize, usize),

    /// A map between layer name and index into the map data array
    layer_map: HashMap<L, usize>,

    /// Raw map data, a 3D array with dimension order layer, x cell, y cell
    data: Array3<T>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GridMapError {
    #[error("Requested cell outside map bounds")]
    OutsideMap,

    #[error("Attempted to access unknown layer")]
    UnknownLayer,

    #[error("Map created with no layers, there must be at least one")]
    NoLayers,

    #[error("Grid map is empty")]
    Empty,

    #[error("An IO operation failed: {0}")]
    IoError(io::Error),

    #[error("Couldn't deserialize the given GridMap: {0}")]
    DeserializeError(serde_json::Error),

    #[error("Couldn't serialize the given GridMap: {0}")]
    SerializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T, L> GridMap<T, L>
where
    T: Clone,
    L: Hash + Eq + Clone,
{
    /// Create a new GridMap with the given number of cells, layers, and
    /// initial empty value.
    pub fn new(num_cells: (usize, usize), layers: &[L], empty_value: T) -> Result<Self, GridMapError> {
        // Create layer map
        let mut layer_map = HashMap::new();

        for (i, layer) in layers.iter().enumerate() {
            layer_map.insert(layer.clone(), i);
        }

        // Check for empty map
        if layer_map.is_empty() {
            return Err(GridMapError::NoLayers);
        }

        Ok(Self {
            num_cells,
            layer_map,
            data: Array3::from_elem((layers.len(), num_cells.0, num_cells.1), empty_value),
        })
    }

    /// The number of cells in each axis of the map.
    pub fn num_cells(&self) -> (usize, usize) {
        self.num_cells
    }

    pub fn cell_in_map(&self, cell: (usize, usize)) -> bool {
        cell.0 < self.num_cells.0 && cell.1 < self.num_cells.1
    }

    pub fn get(&self, layer: L, cell: (usize, usize)) -> Result<T, GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        if !self.cell_in_map(cell) {
            return Err(GridMapError::OutsideMap);
        }

        Ok(self.data[[layer_idx, cell.0, cell.1]].clone())
    }

    pub fn get_mut(&mut self, layer: L, cell: (usize, usize)) -> Result<&mut T, GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        if !self.cell_in_map(cell) {
            return Err(GridMapError::OutsideMap);
        }

        Ok(&mut self.data[[layer_idx, cell.0, cell.1]])
    }

    pub fn get_layer(&self, layer: L) -> Result<ArrayView2<T>, GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        Ok(self.data.slice(s![layer_idx, .., ..]))
    }

    pub fn get_layer_owned(&self, layer: L) -> Result<Array2<T>, GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        Ok(self.data.slice(s![layer_idx, .., ..]).to_owned())
    }

    /// Apply `f` to every cell of the given layer in place.
    pub fn map<F: Fn((usize, usize), T) -> T>(&mut self, layer: L, f: F) -> Result<(), GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        for (idx, t) in self.data.slice_mut(s![layer_idx, .., ..]).indexed_iter_mut() {
            *t = f(idx, t.clone());
        }

        Ok(())
    }

    fn layer_index(&self, layer: L) -> Result<usize, GridMapError> {
        match self.layer_map.get(&layer) {
            Some(l) => Ok(*l),
            None => Err(GridMapError::UnknownLayer),
        }
    }
}

impl<T, L> GridMap<T, L>
where
    T: Clone + Ord,
    L: Hash + Eq + Clone,
{
    /// The range of values currently held in the given layer.
    pub fn layer_range(&self, layer: L) -> Result<(T, T), GridMapError> {
        let view = self.get_layer(layer)?;

        let min = view.min().map_err(|_| GridMapError::Empty)?;
        let max = view.max().map_err(|_| GridMapError::Empty)?;

        Ok((min.clone(), max.clone()))
    }
}

impl<T, L> GridMap<T, L>
where
    T: Clone + Serialize + DeserializeOwned,
    L: Hash + Eq + Clone + Serialize + DeserializeOwned,
{
    /// Load the grid map from the given path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GridMapError> {
        let s = fs::read_to_string(path).map_err(GridMapError::IoError)?;

        serde_json::from_str(&s).map_err(GridMapError::DeserializeError)
    }

    /// Save the grid map to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GridMapError> {
        let s = serde_json::to_string(self).map_err(GridMapError::SerializeError)?;

        fs::write(path, s).map_err(GridMapError::IoError)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
