//! Draws the training state onto a frame buffer.
//!
//! [`RenderContext`] is the frame buffer. It is created white, handed by `&mut` to every
//! drawing operation, and consumed with [`RenderContext::into_frame`] when the run is over.
//! [`Renderer`] knows where things go and how they look; [`Visualizer`] ties a renderer,
//! a context and a display sink together and follows the training loop.

use super::{
    feature_map::{grid_side, FeatureMap},
    layout::{Element, Layout, Placement},
    present::Present,
    training::{ActivationVector, EpochEvent, StepEvent, TrainingObserver},
    patches::BoundingBox,
};
use crate::{core::learner::PermanenceMatrix, error::Result};
use image::{imageops, GrayImage, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
    rect::Rect,
};
use std::{path::Path, thread, time::Duration};
use tracing::info;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// The single frame buffer every drawing operation writes into.
#[derive(Debug, Clone)]
pub struct RenderContext {
    frame: RgbImage,
}

impl RenderContext {
    /// A blank white canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: RgbImage::from_pixel(width, height, WHITE),
        }
    }

    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    /// Writes the current frame to an image file; the format follows the extension.
    pub fn save_screenshot(&self, path: impl AsRef<Path>) -> Result<()> {
        self.frame.save(path.as_ref())?;
        info!(path = %path.as_ref().display(), "screenshot saved");
        Ok(())
    }

    pub fn into_frame(self) -> RgbImage {
        self.frame
    }

    /// Copies `image` with its top-left corner at (x, y), clipped to the frame.
    pub fn blit(&mut self, image: &RgbImage, x: i32, y: i32) {
        imageops::replace(&mut self.frame, image, i64::from(x), i64::from(y));
    }

    pub fn outline(&mut self, x: i32, y: i32, width: u32, height: u32) {
        if width > 0 && height > 0 {
            draw_hollow_rect_mut(&mut self.frame, Rect::at(x, y).of_size(width, height), BLACK);
        }
    }

    /// A 1-pixel black box just outside the given area.
    pub fn outline_around(&mut self, area: Placement) {
        self.outline(area.x - 1, area.y - 1, area.width + 2, area.height + 2);
    }

    pub fn fill(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb<u8>) {
        if width > 0 && height > 0 {
            draw_filled_rect_mut(&mut self.frame, Rect::at(x, y).of_size(width, height), color);
        }
    }
}

/// Grayscale tile where 0 maps to white and 1 to black.
fn inverted_tile(values: &[f32], side: u32) -> RgbImage {
    RgbImage::from_fn(side, side, |x, y| {
        let v = values
            .get((y * side + x) as usize)
            .copied()
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);
        let level = ((1.0 - v) * 255.0) as u8;
        Rgb([level, level, level])
    })
}

fn gray_to_rgb(image: &GrayImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let level = image.get_pixel(x, y).0[0];
        Rgb([level, level, level])
    })
}

/// Knows the layout and draws each visual element.
#[derive(Debug, Clone)]
pub struct Renderer {
    layout: Layout,
    base: RgbImage,
    connected_threshold: f32,
    column_cell: u32,
    permanence_side: u32,
    feature_map_side: u32,
}

impl Renderer {
    pub fn new(
        layout: Layout,
        base: RgbImage,
        connected_threshold: f32,
        column_cell: u32,
        input_len: usize,
        feature_map_side: u32,
    ) -> Self {
        Self {
            layout,
            base,
            connected_threshold,
            column_cell,
            permanence_side: grid_side(input_len),
            feature_map_side,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Base image with its outline.
    pub fn draw_base(&self, ctx: &mut RenderContext) {
        if let Some(area) = self.layout.get(Element::InputImage) {
            ctx.blit(&self.base, area.x, area.y);
            ctx.outline_around(area);
        }
    }

    /// Sliding window over the base image at the patch's bounds.
    pub fn draw_window(&self, ctx: &mut RenderContext, bounds: BoundingBox) {
        if let Some(area) = self.layout.get(Element::InputImage) {
            ctx.outline(
                area.x + bounds.x1 as i32,
                area.y + bounds.y1 as i32,
                bounds.width(),
                bounds.height(),
            );
        }
    }

    pub fn draw_patch(&self, ctx: &mut RenderContext, pixels: &RgbImage) {
        if let Some(area) = self.layout.get(Element::PatchThumbnail) {
            ctx.blit(pixels, area.x, area.y);
            ctx.outline_around(Placement {
                width: pixels.width(),
                height: pixels.height(),
                ..area
            });
        }
    }

    /// One square per column: filled when active, outlined otherwise.
    pub fn draw_activity(&self, ctx: &mut RenderContext, activation: &ActivationVector) {
        let Some(area) = self.layout.get(Element::ColumnActivity) else {
            return;
        };
        let cell = self.column_cell;
        for column in 0..activation.len() {
            let slot = area.row(column, cell);
            ctx.fill(slot.x, slot.y, cell, cell, WHITE);
            if activation.is_active(column) {
                ctx.fill(slot.x, slot.y, cell, cell, BLACK);
            } else {
                ctx.outline(slot.x, slot.y, cell, cell);
            }
        }
    }

    /// Per column: raw permanences in grayscale, and the connected synapses in black.
    pub fn draw_permanences(&self, ctx: &mut RenderContext, permanences: &PermanenceMatrix) {
        let side = self.permanence_side;
        let raw_area = self.layout.get(Element::Permanences);
        let mask_area = self.layout.get(Element::ConnectedMask);

        for (column, row) in permanences.rows().enumerate() {
            if let Some(area) = raw_area {
                let slot = area.row(column, side);
                ctx.blit(&inverted_tile(row, side), slot.x, slot.y);
            }
            if let Some(area) = mask_area {
                let connected: Vec<f32> = permanences
                    .connected_mask(column, self.connected_threshold)
                    .into_iter()
                    .map(|on| if on { 1.0 } else { 0.0 })
                    .collect();
                let slot = area.row(column, side);
                ctx.blit(&inverted_tile(&connected, side), slot.x, slot.y);
            }
        }
    }

    pub fn draw_feature_maps(&self, ctx: &mut RenderContext, maps: &[FeatureMap]) {
        let Some(area) = self.layout.get(Element::FeatureMaps) else {
            return;
        };
        for (i, map) in maps.iter().enumerate() {
            let slot = area.row(i, self.feature_map_side);
            ctx.blit(&gray_to_rgb(&map.image), slot.x, slot.y);
            ctx.outline_around(Placement {
                width: map.image.width(),
                height: map.image.height(),
                ..slot
            });
        }
    }

    /// Everything that changes on a training step.
    pub fn draw_step(&self, ctx: &mut RenderContext, event: &StepEvent<'_>) {
        self.draw_base(ctx);
        self.draw_window(ctx, event.patch.bounds);
        self.draw_patch(ctx, &event.patch.pixels);
        self.draw_activity(ctx, event.activation);
    }
}

/// Follows a training run: draws each step into its context and presents complete frames.
pub struct Visualizer<P: Present> {
    renderer: Renderer,
    context: RenderContext,
    presenter: P,
    replay_delay: Duration,
    frames: usize,
}

impl<P: Present> Visualizer<P> {
    pub fn new(renderer: Renderer, context: RenderContext, presenter: P, replay_delay: Duration) -> Self {
        Self {
            renderer,
            context,
            presenter,
            replay_delay,
            frames: 0,
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Number of frames presented so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn present(&mut self) -> Result<()> {
        self.presenter.present(self.context.frame())?;
        self.frames += 1;
        Ok(())
    }

    /// Ends the run and hands back the frame buffer.
    pub fn finish(self) -> RenderContext {
        self.context
    }
}

impl<P: Present> TrainingObserver for Visualizer<P> {
    fn on_start(&mut self, permanences: &PermanenceMatrix) -> Result<()> {
        self.renderer.draw_base(&mut self.context);
        self.renderer.draw_permanences(&mut self.context, permanences);
        self.present()
    }

    fn on_step(&mut self, event: &StepEvent<'_>) -> Result<()> {
        self.renderer.draw_step(&mut self.context, event);
        self.present()?;
        if !self.replay_delay.is_zero() {
            thread::sleep(self.replay_delay);
        }
        Ok(())
    }

    fn on_epoch_end(&mut self, event: &EpochEvent<'_>) -> Result<()> {
        self.renderer.draw_permanences(&mut self.context, event.permanences);
        self.renderer.draw_feature_maps(&mut self.context, event.feature_maps);
        self.present()
    }
}
