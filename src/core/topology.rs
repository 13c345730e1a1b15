//! Topology describes an N-dimensional grid through its dimension sizes and row-major strides.
//!
//! The Spatial Pooler uses two of them: one for the input space (a patch is a `side × side`
//! grid of bits) and one for the column space. Potential pools are drawn from a neighborhood
//! in input space, and local inhibition compares a column against its neighbors in column space.

use serde::{Deserialize, Serialize};

/// Shape of an N-dimensional grid with precomputed row-major strides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl Topology {
    /// Creates a new `Topology` from a slice of dimension sizes.
    pub fn new(dimensions: &[usize]) -> Self {
        let dims = dimensions.to_vec();
        let mut strides = vec![1; dims.len()];
        for axis in (0..dims.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * dims[axis + 1];
        }

        Self { dims, strides }
    }

    /// The size of each dimension.
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of cells in the grid.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts a linear index into per-dimension coordinates.
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        self.strides
            .iter()
            .scan(index, |remainder, &stride| {
                let coord = *remainder / stride;
                *remainder %= stride;
                Some(coord)
            })
            .collect()
    }

    /// Converts per-dimension coordinates into a linear index.
    pub fn index(&self, coords: &[usize]) -> usize {
        coords.iter().zip(&self.strides).map(|(&c, &s)| c * s).sum()
    }

    /// Returns every index within `radius` of `center`, in row-major order.
    ///
    /// With `wrapping` the grid behaves like a torus and a neighborhood never contains more
    /// than one copy of a cell; without it the neighborhood is clipped at the edges.
    pub fn neighborhood(&self, center: usize, radius: usize, wrapping: bool) -> Vec<usize> {
        let center = self.coordinates(center);

        let axes: Vec<Vec<usize>> = center
            .iter()
            .zip(&self.dims)
            .map(|(&c, &dim)| {
                let (c, dim, r) = (c as isize, dim as isize, radius as isize);
                if wrapping {
                    let span = (2 * r + 1).min(dim);
                    (c - r..c - r + span)
                        .map(|v| v.rem_euclid(dim) as usize)
                        .collect()
                } else {
                    ((c - r).max(0)..(c + r + 1).min(dim))
                        .map(|v| v as usize)
                        .collect()
                }
            })
            .collect();

        let mut indices = Vec::with_capacity(axes.iter().map(Vec::len).product());
        let mut cursor = vec![0usize; axes.len()];
        if axes.iter().any(Vec::is_empty) {
            return indices;
        }

        loop {
            let coords: Vec<usize> = cursor
                .iter()
                .enumerate()
                .map(|(axis, &pos)| axes[axis][pos])
                .collect();
            indices.push(self.index(&coords));

            // Odometer increment, last axis fastest.
            let mut axis = axes.len();
            loop {
                if axis == 0 {
                    return indices;
                }
                axis -= 1;
                cursor[axis] += 1;
                if cursor[axis] < axes[axis].len() {
                    break;
                }
                cursor[axis] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_round_trip_on_grid() {
        let topology = Topology::new(&[4, 8]);
        assert_eq!(topology.len(), 32);
        assert_eq!(topology.coordinates(13), vec![1, 5]);
        assert_eq!(topology.index(&[1, 5]), 13);
    }

    #[test]
    fn test_neighborhood_clipped_at_corner() {
        let topology = Topology::new(&[5, 5]);
        let hood = topology.neighborhood(0, 1, false);
        assert_eq!(hood, vec![0, 1, 5, 6]);
    }

    #[test]
    fn test_neighborhood_wraps_without_duplicates() {
        let topology = Topology::new(&[3]);
        let mut hood = topology.neighborhood(0, 10_000, true);
        hood.sort_unstable();
        assert_eq!(hood, vec![0, 1, 2]);

        let hood = Topology::new(&[10]).neighborhood(0, 1, true);
        assert_eq!(hood, vec![9, 0, 1]);
    }
}
