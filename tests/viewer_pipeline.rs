//! End-to-end tests of a viewer session with the Spatial Pooler as learner.

use approx::assert_relative_eq;
use htm_viewer::{
    config::ViewerConfig,
    core::{
        learner::Learner,
        spatial_pooler::{SpatialPooler, SpatialPoolerParams},
    },
    viewer::{present::Headless, Viewer},
    ViewerError,
};
use image::{Rgb, RgbImage};

/// A 64x64 image whose four 32x32 quadrants hold different stripe patterns.
fn quadrant_image() -> RgbImage {
    RgbImage::from_fn(64, 64, |x, y| {
        let dark = match (x / 32, y / 32) {
            (0, 0) => x % 4 == 0,
            (1, 0) => y % 4 == 0,
            (0, 1) => (x + y) % 6 == 0,
            _ => false,
        };
        if dark {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

fn config() -> ViewerConfig {
    ViewerConfig {
        replay_delay_ms: 0,
        ..Default::default()
    }
}

fn pooler(side: usize) -> SpatialPooler {
    SpatialPooler::new(SpatialPoolerParams {
        input_dimensions: vec![side, side],
        verbosity: 0,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn full_session_runs_every_epoch_over_every_patch() {
    let mut viewer = Viewer::new(config(), quadrant_image(), pooler(32)).unwrap();
    assert_eq!(viewer.patches().len(), 4);
    assert!(viewer.vectors().iter().all(|v| v.len() == 1024));

    let outcome = viewer.run(Headless::new()).unwrap();

    assert_eq!(outcome.summary.epochs, 40);
    assert_eq!(outcome.summary.steps, 160);
    assert_eq!(viewer.learner().iteration_learn_num(), 160);
    // one frame before training, one per step, one per epoch
    assert_eq!(outcome.frames, 1 + 160 + 40);
    assert_eq!(outcome.frame.dimensions(), (512, 600));

    let maps = &outcome.summary.final_feature_maps;
    assert_eq!(maps.len(), 16);
    assert!(maps.iter().all(|m| m.grid_side == 2));
    // exactly one column is active per patch, so each grid cell is claimed once.
    for cell in 0..4 {
        let claimed = maps.iter().filter(|m| m.grid[cell] > 0.0).count();
        assert_eq!(claimed, 1);
        let total: f32 = maps.iter().map(|m| m.grid[cell]).sum();
        assert_relative_eq!(total, 1.0);
    }

    let permanences = viewer.learner().permanences();
    assert_eq!(permanences.column_count(), 16);
    for row in permanences.rows() {
        assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}

#[test]
fn image_smaller_than_the_patch_fails_fast() {
    let err = Viewer::new(config(), RgbImage::new(16, 16), pooler(32))
        .err()
        .unwrap();
    assert!(matches!(err, ViewerError::Configuration(_)));
}

#[test]
fn encoder_and_learner_lengths_must_agree() {
    let err = Viewer::new(config(), quadrant_image(), pooler(16))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ViewerError::ConfigurationMismatch {
            expected: 256,
            actual: 1024
        }
    ));
}

#[test]
fn missing_image_is_an_image_load_error() {
    let err = Viewer::open(config(), "does/not/exist.png", pooler(32))
        .err()
        .unwrap();
    assert!(matches!(err, ViewerError::ImageLoad { .. }));
}

#[test]
fn bad_overlap_is_rejected_before_the_image_is_read() {
    let config = ViewerConfig {
        overlap: 1.0,
        ..config()
    };
    let err = Viewer::open(config, "does/not/exist.png", pooler(32))
        .err()
        .unwrap();
    assert!(matches!(err, ViewerError::Configuration(_)));
}

#[test]
fn screenshot_is_written_after_the_run() {
    let path = std::env::temp_dir().join(format!("htm-viewer-final-{}.png", std::process::id()));
    let config = ViewerConfig {
        epoch_count: 2,
        screenshot: Some(path.clone()),
        ..config()
    };
    let mut viewer = Viewer::new(config, quadrant_image(), pooler(32)).unwrap();
    let outcome = viewer.run(Headless::new()).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved, outcome.frame);
    assert_eq!(viewer.learner().column_count(), 16);
    std::fs::remove_file(&path).unwrap();
}
