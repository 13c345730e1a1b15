//! Property tests for patch extraction geometry.
//!
//! Run with: `cargo test --test patch_geometry`

use htm_viewer::viewer::patches::{patch_step, plan_patches};
use htm_viewer::ViewerError;
use proptest::prelude::*;

proptest! {
    #[test]
    fn patches_stay_inside_the_image(
        width in 0u32..200,
        height in 0u32..200,
        side in 1u32..48,
        overlap in 0.0f64..0.95,
    ) {
        prop_assume!(patch_step(side, overlap).is_ok());
        for bounds in plan_patches(width, height, side, overlap).unwrap() {
            prop_assert!(bounds.x2 <= width);
            prop_assert!(bounds.y2 <= height);
            prop_assert_eq!(bounds.width(), side);
            prop_assert_eq!(bounds.height(), side);
        }
    }

    #[test]
    fn consecutive_starts_differ_by_the_step(
        width in 1u32..200,
        height in 1u32..200,
        side in 1u32..48,
        overlap in 0.0f64..0.95,
    ) {
        prop_assume!(patch_step(side, overlap).is_ok());
        let step = (f64::from(side) * (1.0 - overlap)).floor() as u32;
        let boxes = plan_patches(width, height, side, overlap).unwrap();

        for pair in boxes.windows(2) {
            if pair[0].y1 == pair[1].y1 {
                prop_assert_eq!(pair[1].x1 - pair[0].x1, step);
            } else {
                prop_assert_eq!(pair[1].y1 - pair[0].y1, step);
                prop_assert_eq!(pair[1].x1, 0);
            }
        }
    }

    #[test]
    fn patch_count_matches_row_and_column_counts(
        width in 0u32..200,
        height in 0u32..200,
        side in 1u32..48,
        overlap in 0.0f64..0.95,
    ) {
        prop_assume!(patch_step(side, overlap).is_ok());
        let step = patch_step(side, overlap).unwrap();
        let per_axis = |len: u32| if len < side { 0 } else { (len - side) / step + 1 };
        let boxes = plan_patches(width, height, side, overlap).unwrap();
        prop_assert_eq!(boxes.len() as u32, per_axis(width) * per_axis(height));
    }

    #[test]
    fn overlap_of_one_or_more_never_extracts(overlap in 1.0f64..10.0, side in 1u32..64) {
        let result = plan_patches(128, 128, side, overlap);
        prop_assert!(matches!(result, Err(ViewerError::Configuration(_))));
    }
}

#[test]
fn four_quadrants_of_a_64_pixel_square() {
    let boxes: Vec<(u32, u32, u32, u32)> = plan_patches(64, 64, 32, 0.0)
        .unwrap()
        .into_iter()
        .map(|b| (b.x1, b.y1, b.x2, b.y2))
        .collect();
    assert_eq!(
        boxes,
        vec![(0, 0, 32, 32), (32, 0, 64, 32), (0, 32, 32, 64), (32, 32, 64, 64)]
    );
}
