//! Tiles an image into square, possibly overlapping patches.
//!
//! Patches are produced in raster order (top to bottom, left to right). The index of a patch
//! in that sequence is how the training loop and the sliding-window overlay agree on which
//! region of the image is being shown, so the order is part of the contract.

use crate::error::{Result, ViewerError};
use image::{imageops, RgbImage};

/// Pixel bounds of a patch, half-open: `x1..x2`, `y1..y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, side: u32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x + side,
            y2: y + side,
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// A square region of the source image together with its pixels.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Position in raster order.
    pub index: usize,
    pub bounds: BoundingBox,
    pub pixels: RgbImage,
}

impl Patch {
    pub fn side(&self) -> u32 {
        self.bounds.width()
    }
}

/// Distance between consecutive patch origins: `floor(side * (1 - overlap))`.
///
/// Fails for an overlap outside `[0, 1)`, a zero side, or any combination that would leave
/// the step at zero, since extraction would never advance.
pub fn patch_step(side: u32, overlap: f64) -> Result<u32> {
    if side == 0 {
        return Err(ViewerError::Configuration(
            "patch side must be positive".into(),
        ));
    }
    if !(0.0..1.0).contains(&overlap) {
        return Err(ViewerError::Configuration(format!(
            "patch overlap must be in [0, 1), got {}",
            overlap
        )));
    }

    let step = (f64::from(side) * (1.0 - overlap)).floor() as u32;
    if step == 0 {
        return Err(ViewerError::Configuration(format!(
            "patch overlap {} leaves a step of zero for side {}",
            overlap, side
        )));
    }
    Ok(step)
}

/// Computes the bounding boxes of every patch of an image of the given size.
///
/// An image smaller than `side` in either dimension yields no patches.
pub fn plan_patches(width: u32, height: u32, side: u32, overlap: f64) -> Result<Vec<BoundingBox>> {
    let step = patch_step(side, overlap)?;

    let mut boxes = Vec::new();
    let mut y = 0u32;
    while y.saturating_add(side) <= height {
        let mut x = 0u32;
        while x.saturating_add(side) <= width {
            boxes.push(BoundingBox::new(x, y, side));
            x += step;
        }
        y += step;
    }
    Ok(boxes)
}

/// Cuts the image into patches following [`plan_patches`].
pub fn extract_patches(image: &RgbImage, side: u32, overlap: f64) -> Result<Vec<Patch>> {
    let patches = plan_patches(image.width(), image.height(), side, overlap)?
        .into_iter()
        .enumerate()
        .map(|(index, bounds)| Patch {
            index,
            bounds,
            pixels: imageops::crop_imm(image, bounds.x1, bounds.y1, side, side).to_image(),
        })
        .collect();
    Ok(patches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_four_quadrants_in_raster_order() {
        let boxes = plan_patches(64, 64, 32, 0.0).unwrap();
        assert_eq!(
            boxes,
            vec![
                BoundingBox { x1: 0, y1: 0, x2: 32, y2: 32 },
                BoundingBox { x1: 32, y1: 0, x2: 64, y2: 32 },
                BoundingBox { x1: 0, y1: 32, x2: 32, y2: 64 },
                BoundingBox { x1: 32, y1: 32, x2: 64, y2: 64 },
            ]
        );
    }

    #[test]
    fn test_half_overlap_steps_by_half_side() {
        let boxes = plan_patches(64, 64, 32, 0.5).unwrap();
        assert_eq!(boxes.len(), 9);
        assert_eq!(boxes[1].x1 - boxes[0].x1, 16);
        assert_eq!(boxes[3].y1, 16);
    }

    #[test]
    fn test_overlap_of_one_is_rejected() {
        assert!(matches!(
            plan_patches(64, 64, 32, 1.0),
            Err(ViewerError::Configuration(_))
        ));
        assert!(plan_patches(64, 64, 32, 1.5).is_err());
        assert!(plan_patches(64, 64, 32, -0.1).is_err());
        assert!(plan_patches(64, 64, 32, f64::NAN).is_err());
    }

    #[test]
    fn test_zero_step_is_rejected() {
        assert!(patch_step(1, 0.5).is_err());
        assert!(patch_step(0, 0.0).is_err());
    }

    #[test]
    fn test_image_smaller_than_patch_is_empty() {
        let image = RgbImage::new(16, 64);
        assert!(extract_patches(&image, 32, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_patch_pixels_come_from_bounds() {
        let mut image = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        image.put_pixel(5, 6, Rgb([0, 0, 0]));
        let patches = extract_patches(&image, 4, 0.0).unwrap();
        assert_eq!(patches.len(), 4);
        assert_eq!(patches[3].index, 3);
        assert_eq!(patches[3].side(), 4);
        assert_eq!(*patches[3].pixels.get_pixel(1, 2), Rgb([0, 0, 0]));
        assert_eq!(*patches[0].pixels.get_pixel(1, 2), Rgb([255, 255, 255]));
    }
}
