//! Display sinks. A sink receives the complete frame buffer each time a frame is finished.

use crate::error::Result;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Something that shows finished frames.
pub trait Present {
    fn present(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Discards frames, only counting them.
#[derive(Debug, Default)]
pub struct Headless {
    frames: usize,
}

impl Headless {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Present for Headless {
    fn present(&mut self, _frame: &RgbImage) -> Result<()> {
        self.frames += 1;
        Ok(())
    }
}

/// Writes every `every`-th frame as `frame_NNNNN.png` into a directory.
#[derive(Debug)]
pub struct PngSequence {
    dir: PathBuf,
    every: usize,
    presented: usize,
    written: usize,
}

impl PngSequence {
    /// Creates the directory if needed.
    pub fn create(dir: impl AsRef<Path>, every: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            every: every.max(1),
            presented: 0,
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl Present for PngSequence {
    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        let index = self.presented;
        self.presented += 1;
        if index % self.every != 0 {
            return Ok(());
        }

        let path = self.dir.join(format!("frame_{:05}.png", self.written));
        frame.save(&path)?;
        self.written += 1;
        debug!(path = %path.display(), "frame written");
        Ok(())
    }
}
