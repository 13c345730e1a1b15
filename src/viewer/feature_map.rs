//! Per-column feature maps: where in the image each column fired during one epoch.
//!
//! Column `c`'s activity across the epoch's patch visits is laid out row-major on a square grid
//! of side `floor(sqrt(patch count))`, so with non-overlapping patches each cell lines up with
//! the patch it came from. Samples past the largest perfect square do not fit the grid and
//! are dropped.

use super::training::EpochHistory;
use image::{imageops, imageops::FilterType, GrayImage, Luma};
use tracing::warn;

/// Side, in pixels, that feature maps are rescaled to by default.
pub const DEFAULT_MAP_SIDE: u32 = 32;

/// One column's activity over an epoch, as a square image (active is dark).
#[derive(Debug, Clone)]
pub struct FeatureMap {
    pub column: usize,
    /// Side of the activity grid before rescaling.
    pub grid_side: u32,
    /// Raw activity values, row-major, `grid_side²` long.
    pub grid: Vec<f32>,
    /// Inverted grid rescaled to the display size.
    pub image: GrayImage,
}

/// Largest `s` with `s * s <= len`.
pub fn grid_side(len: usize) -> u32 {
    let mut side = (len as f64).sqrt() as usize;
    while side * side > len {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= len {
        side += 1;
    }
    side as u32
}

/// Builds feature maps from an epoch's activation history.
#[derive(Debug, Clone, Copy)]
pub struct FeatureMapAggregator {
    target_side: u32,
}

impl Default for FeatureMapAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MAP_SIDE)
    }
}

impl FeatureMapAggregator {
    pub fn new(target_side: u32) -> Self {
        Self { target_side }
    }

    /// One map per column, in column order. An empty history has no maps.
    pub fn aggregate(&self, history: &EpochHistory) -> Vec<FeatureMap> {
        let side = grid_side(history.len());
        if side == 0 {
            return Vec::new();
        }

        let used = (side * side) as usize;
        if used < history.len() {
            warn!(
                samples = history.len(),
                dropped = history.len() - used,
                grid_side = side,
                "patch count is not a perfect square, trailing samples left out of feature maps"
            );
        }

        (0..history.column_count())
            .map(|column| {
                let grid: Vec<f32> = history.column(column).take(used).collect();
                let small = GrayImage::from_fn(side, side, |x, y| {
                    let activity = grid[(y * side + x) as usize].clamp(0.0, 1.0);
                    Luma([((1.0 - activity) * 255.0) as u8])
                });
                let image = imageops::resize(
                    &small,
                    self.target_side,
                    self.target_side,
                    FilterType::Nearest,
                );

                FeatureMap {
                    column,
                    grid_side: side,
                    grid,
                    image,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::training::ActivationVector;

    fn history(rows: &[&[f32]]) -> EpochHistory {
        let mut history = EpochHistory::new();
        for row in rows {
            history.push(ActivationVector::from_slice(row));
        }
        history
    }

    #[test]
    fn test_grid_side_is_floor_sqrt() {
        assert_eq!(grid_side(0), 0);
        assert_eq!(grid_side(4), 2);
        assert_eq!(grid_side(8), 2);
        assert_eq!(grid_side(9), 3);
        assert_eq!(grid_side(1_000_000), 1000);
    }

    #[test]
    fn test_one_map_per_column_with_inverted_polarity() {
        let history = history(&[&[1.0, 0.0], &[0.0, 1.0], &[0.0, 1.0], &[1.0, 0.0]]);
        let maps = FeatureMapAggregator::new(4).aggregate(&history);

        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].grid_side, 2);
        assert_eq!(maps[0].grid, vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(maps[0].image.dimensions(), (4, 4));
        // top-left cell was active, so it is black; top-right was not.
        assert_eq!(maps[0].image.get_pixel(0, 0).0[0], 0);
        assert_eq!(maps[0].image.get_pixel(3, 0).0[0], 255);
        assert_eq!(maps[1].image.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_trailing_samples_are_dropped() {
        let rows: Vec<[f32; 1]> = (0..6).map(|i| [i as f32 / 10.0]).collect();
        let refs: Vec<&[f32]> = rows.iter().map(|r| r.as_slice()).collect();
        let maps = FeatureMapAggregator::default().aggregate(&history(&refs));
        assert_eq!(maps[0].grid_side, 2);
        assert_eq!(maps[0].grid.len(), 4);
        assert_eq!(maps[0].image.dimensions(), (DEFAULT_MAP_SIDE, DEFAULT_MAP_SIDE));
    }

    #[test]
    fn test_empty_history_has_no_maps() {
        assert!(FeatureMapAggregator::default()
            .aggregate(&EpochHistory::new())
            .is_empty());
    }
}
