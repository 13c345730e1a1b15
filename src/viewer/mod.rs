//! The visualization pipeline: patches, encoding, training, feature maps and rendering.
//!
//! [`Viewer`] wires the pieces together for one run. All validation happens in
//! [`Viewer::open`] / [`Viewer::new`], before anything is drawn.

pub mod encoder;
pub mod feature_map;
pub mod layout;
pub mod patches;
pub mod present;
pub mod render;
pub mod training;

use crate::{
    config::ViewerConfig,
    core::learner::Learner,
    error::{Result, ViewerError},
};
use encoder::{BitVector, PatchEncoder};
use feature_map::{grid_side, FeatureMapAggregator};
use image::RgbImage;
use layout::{ContentSizes, Layout};
use patches::{extract_patches, Patch};
use present::Present;
use render::{RenderContext, Renderer, Visualizer};
use std::path::Path;
use tracing::info;
use training::{TrainingLoop, TrainingSummary};

/// Decodes an image file into RGB.
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| ViewerError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

/// What a finished run produced.
#[derive(Debug)]
pub struct ViewerOutcome {
    pub summary: TrainingSummary,
    /// Number of frames presented.
    pub frames: usize,
    /// The final frame buffer.
    pub frame: RgbImage,
}

/// One visualization session over a fixed image and learner.
pub struct Viewer<L: Learner> {
    config: ViewerConfig,
    image: RgbImage,
    patches: Vec<Patch>,
    vectors: Vec<BitVector>,
    learner: L,
}

impl<L: Learner> Viewer<L> {
    /// Validates `config`, then loads the image at `path`.
    pub fn open(config: ViewerConfig, path: impl AsRef<Path>, learner: L) -> Result<Self> {
        config.validate()?;
        let image = load_image(path)?;
        Self::new(config, image, learner)
    }

    /// Extracts and encodes the patches, and checks them against the learner.
    ///
    /// Fails if the image yields no patch at all, since there would be nothing to train on.
    pub fn new(config: ViewerConfig, image: RgbImage, learner: L) -> Result<Self> {
        config.validate()?;

        let patches = extract_patches(&image, config.patch_side, config.overlap)?;
        if patches.is_empty() {
            return Err(ViewerError::Configuration(format!(
                "image is {}x{}, smaller than the patch side {}; there is nothing to visualize",
                image.width(),
                image.height(),
                config.patch_side
            )));
        }

        let encoder = PatchEncoder::new(config.patch_side).with_threshold(config.luminance_threshold);
        if encoder.output_len() != learner.input_len() {
            return Err(ViewerError::ConfigurationMismatch {
                expected: learner.input_len(),
                actual: encoder.output_len(),
            });
        }
        let vectors = encoder.encode_all(&patches)?;

        info!(
            width = image.width(),
            height = image.height(),
            patches = patches.len(),
            input_len = encoder.output_len(),
            columns = learner.column_count(),
            "viewer ready"
        );

        Ok(Self {
            config,
            image,
            patches,
            vectors,
            learner,
        })
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn vectors(&self) -> &[BitVector] {
        &self.vectors
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Trains for the configured epochs, drawing every step and presenting it on `presenter`.
    /// Saves a screenshot of the final frame if one is configured.
    pub fn run<P: Present>(&mut self, presenter: P) -> Result<ViewerOutcome> {
        let config = &self.config;
        let canvas = (config.screen_width, config.screen_height);
        let input_len = self.learner.input_len();

        let content = ContentSizes {
            image_width: self.image.width(),
            image_height: self.image.height(),
            patch_side: config.patch_side,
            column_count: self.learner.column_count() as u32,
            column_cell: config.column_cell_size,
            permanence_side: grid_side(input_len),
            feature_map_side: config.feature_map_side,
        };
        let layout = Layout::compute(&config.layout, canvas, &content)?;
        let renderer = Renderer::new(
            layout,
            self.image.clone(),
            self.learner.connected_threshold(),
            config.column_cell_size,
            input_len,
            config.feature_map_side,
        );
        let mut visualizer = Visualizer::new(
            renderer,
            RenderContext::new(canvas.0, canvas.1),
            presenter,
            config.replay_delay(),
        );

        let training = TrainingLoop::new(
            config.epoch_count,
            FeatureMapAggregator::new(config.feature_map_side),
        );
        let summary = training.run(&mut self.learner, &self.patches, &self.vectors, &mut visualizer)?;

        let frames = visualizer.frames();
        let context = visualizer.finish();
        if let Some(path) = &self.config.screenshot {
            context.save_screenshot(path)?;
        }

        info!(epochs = summary.epochs, steps = summary.steps, frames, "run complete");

        Ok(ViewerOutcome {
            summary,
            frames,
            frame: context.into_frame(),
        })
    }
}
