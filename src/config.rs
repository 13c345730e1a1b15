//! Run configuration, loaded from JSON.
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```json
//! {
//!   "viewer": { "patch_side": 16, "overlap": 0.5, "replay_delay_ms": 0 },
//!   "pooler": { "input_dimensions": [16, 16], "column_dimensions": [9] }
//! }
//! ```

use crate::{
    core::spatial_pooler::SpatialPoolerParams,
    error::{Result, ViewerError},
    viewer::{encoder::LUMINANCE_THRESHOLD, layout::LayoutTable, patches::patch_step},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Settings of the visualization itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    pub patch_side: u32,
    /// Fraction of a patch shared with its neighbor, in `[0, 1)`.
    pub overlap: f64,
    pub epoch_count: usize,
    /// Pause after every presented training step.
    pub replay_delay_ms: u64,
    pub feature_map_side: u32,
    pub column_cell_size: u32,
    pub luminance_threshold: u8,
    /// Where to save the final frame, if anywhere.
    pub screenshot: Option<PathBuf>,
    /// Where to write every presented frame as PNG, if anywhere.
    pub frames_dir: Option<PathBuf>,
    pub frame_every: usize,
    pub layout: LayoutTable,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            screen_width: 512,
            screen_height: 600,
            patch_side: 32,
            overlap: 0.0,
            epoch_count: 40,
            replay_delay_ms: 200,
            feature_map_side: 32,
            column_cell_size: 16,
            luminance_threshold: LUMINANCE_THRESHOLD,
            screenshot: None,
            frames_dir: None,
            frame_every: 1,
            layout: LayoutTable::default(),
        }
    }
}

impl ViewerConfig {
    /// Rejects values that would make the run ill-defined. Nothing has been extracted or
    /// drawn when this fails.
    pub fn validate(&self) -> Result<()> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ViewerError::Configuration(format!(
                "canvas must be non-empty, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        if self.epoch_count == 0 {
            return Err(ViewerError::Configuration(
                "epoch_count must be at least 1".into(),
            ));
        }
        if self.feature_map_side == 0 || self.column_cell_size == 0 {
            return Err(ViewerError::Configuration(
                "feature_map_side and column_cell_size must be positive".into(),
            ));
        }
        patch_step(self.patch_side, self.overlap)?;
        Ok(())
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }
}

/// Everything the binary needs: viewer settings and learner parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewer: ViewerConfig,
    pub pooler: SpatialPoolerParams,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
