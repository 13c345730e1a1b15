//! Encodes a patch as a binary vector, one bit per pixel.
//!
//! A pixel is reduced to its luminance and becomes a 1 when it is darker than the threshold,
//! so ink on a light background turns into active input bits.

use super::patches::Patch;
use crate::error::{Result, ViewerError};
use image::imageops;

/// Luminance (0..=255) below which a pixel is encoded as an active bit.
pub const LUMINANCE_THRESHOLD: u8 = 100;

/// Binary encoding of a patch in row-major pixel order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitVector(Vec<bool>);

impl BitVector {
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of active bits.
    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|&&bit| bit).count()
    }
}

impl From<Vec<bool>> for BitVector {
    fn from(bits: Vec<bool>) -> Self {
        Self(bits)
    }
}

/// Turns patches of a fixed side into [`BitVector`]s of length `side²`.
#[derive(Debug, Clone, Copy)]
pub struct PatchEncoder {
    side: u32,
    threshold: u8,
}

impl PatchEncoder {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            threshold: LUMINANCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Length of every vector this encoder produces.
    pub fn output_len(&self) -> usize {
        (self.side as usize).pow(2)
    }

    pub fn encode(&self, patch: &Patch) -> Result<BitVector> {
        let (width, height) = patch.pixels.dimensions();
        if width != self.side || height != self.side {
            return Err(ViewerError::Configuration(format!(
                "encoder expects {0}x{0} patches, got {1}x{2}",
                self.side, width, height
            )));
        }

        let luma = imageops::grayscale(&patch.pixels);
        let bits = luma
            .pixels()
            .map(|pixel| pixel.0[0] < self.threshold)
            .collect();
        Ok(BitVector(bits))
    }

    pub fn encode_all(&self, patches: &[Patch]) -> Result<Vec<BitVector>> {
        patches.iter().map(|patch| self.encode(patch)).collect()
    }
}
