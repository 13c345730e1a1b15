//! Declarative screen layout.
//!
//! A [`LayoutTable`] lists the visual elements left to right. Each entry says where the element
//! starts horizontally (a fixed offset, or a gap after an earlier element) and how it is placed
//! vertically. Element sizes come from the content: the image, the patch side, the number of
//! columns. [`Layout::compute`] resolves the table into pixel placements for one canvas.

use crate::error::{Result, ViewerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Every visual element the renderer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    InputImage,
    PatchThumbnail,
    ColumnActivity,
    Permanences,
    ConnectedMask,
    FeatureMaps,
}

/// Horizontal anchor of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    /// Fixed offset from the left edge of the canvas.
    Left(i32),
    /// `gap` pixels right of an element placed earlier in the table.
    After(Element, i32),
}

/// Vertical placement rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Vertical {
    Centered,
    Top(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutRule {
    pub element: Element,
    pub anchor: Anchor,
    pub vertical: Vertical,
}

/// Ordered layout rules; later rules may anchor on earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTable(pub Vec<LayoutRule>);

impl Default for LayoutTable {
    fn default() -> Self {
        let centered = |element, anchor| LayoutRule {
            element,
            anchor,
            vertical: Vertical::Centered,
        };
        Self(vec![
            centered(Element::InputImage, Anchor::Left(0)),
            centered(Element::PatchThumbnail, Anchor::After(Element::InputImage, 32)),
            centered(Element::ColumnActivity, Anchor::After(Element::PatchThumbnail, 32)),
            centered(Element::Permanences, Anchor::After(Element::ColumnActivity, 32)),
            centered(Element::ConnectedMask, Anchor::After(Element::Permanences, 32)),
            centered(Element::FeatureMaps, Anchor::After(Element::ConnectedMask, 32)),
        ])
    }
}

/// The content sizes that element sizes derive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSizes {
    pub image_width: u32,
    pub image_height: u32,
    pub patch_side: u32,
    pub column_count: u32,
    /// Side of one column's activity indicator.
    pub column_cell: u32,
    /// Side of one column's permanence image (`sqrt` of the input length).
    pub permanence_side: u32,
    pub feature_map_side: u32,
}

impl ContentSizes {
    /// Width and height of an element. Per-column elements stack one row per column.
    pub fn size_of(&self, element: Element) -> (u32, u32) {
        let columns = self.column_count;
        match element {
            Element::InputImage => (self.image_width, self.image_height),
            Element::PatchThumbnail => (self.patch_side, self.patch_side),
            Element::ColumnActivity => (self.column_cell, self.column_cell * columns),
            Element::Permanences | Element::ConnectedMask => {
                (self.permanence_side, self.permanence_side * columns)
            }
            Element::FeatureMaps => (self.feature_map_side, self.feature_map_side * columns),
        }
    }
}

/// Where an element lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// The `index`-th row of height `row_height` inside this placement.
    pub fn row(&self, index: usize, row_height: u32) -> Placement {
        Placement {
            x: self.x,
            y: self.y + (index as u32 * row_height) as i32,
            width: self.width,
            height: row_height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Resolved placements for one canvas.
#[derive(Debug, Clone)]
pub struct Layout {
    canvas: (u32, u32),
    placements: HashMap<Element, Placement>,
}

impl Layout {
    /// Resolves `table` against a canvas of `canvas` (width, height) pixels.
    ///
    /// Fails if a rule anchors on an element that is not placed before it. Elements that do
    /// not fit the canvas are kept, and clipped when drawn.
    pub fn compute(table: &LayoutTable, canvas: (u32, u32), content: &ContentSizes) -> Result<Self> {
        let mut placements = HashMap::new();

        for rule in &table.0 {
            let (width, height) = content.size_of(rule.element);
            let x = match rule.anchor {
                Anchor::Left(offset) => offset,
                Anchor::After(previous, gap) => {
                    let previous: &Placement = placements.get(&previous).ok_or_else(|| {
                        ViewerError::Configuration(format!(
                            "layout rule for {:?} anchors on {:?}, which is not placed before it",
                            rule.element, previous
                        ))
                    })?;
                    previous.right() + gap
                }
            };
            let y = match rule.vertical {
                Vertical::Centered => (canvas.1 as i32 - height as i32) / 2,
                Vertical::Top(offset) => offset,
            };

            let placement = Placement {
                x,
                y,
                width,
                height,
            };
            if placement.x < 0
                || placement.y < 0
                || placement.right() > canvas.0 as i32
                || placement.bottom() > canvas.1 as i32
            {
                warn!(element = ?rule.element, ?placement, "element does not fit the canvas");
            }
            placements.insert(rule.element, placement);
        }

        Ok(Self { canvas, placements })
    }

    pub fn canvas(&self) -> (u32, u32) {
        self.canvas
    }

    pub fn get(&self, element: Element) -> Option<Placement> {
        self.placements.get(&element).copied()
    }
}
