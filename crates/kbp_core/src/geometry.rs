//! Subtitle canvas geometry.
//!
//! The subtitle canvas keeps its configured aspect ratio and is centered
//! inside the background frame, pillarboxed or letterboxed as needed.

use serde::{Deserialize, Serialize};

use crate::models::ass_ratio;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Top-left position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

impl Offset {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Subtitle canvas placed on a background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub canvas: Size,
    pub offset: Offset,
}

impl Geometry {
    /// Canvas covers the whole background.
    pub fn identity(background: Size) -> Self {
        Self {
            canvas: background,
            offset: Offset::default(),
        }
    }

    /// Whether the canvas is exactly the background frame.
    pub fn is_identity(&self, background: Size) -> bool {
        self.canvas == background && self.offset == Offset::default()
    }
}

/// Resolve the canvas for a background and a subtitle target width.
pub fn resolve(background: Size, target_width: u32, border: bool) -> Geometry {
    resolve_ratio(background, ass_ratio(target_width, border))
}

/// Resolve the canvas for a background and an explicit canvas ratio.
pub fn resolve_ratio(background: Size, ratio: f64) -> Geometry {
    if background.width == 0 || background.height == 0 || !(ratio.is_finite() && ratio > 0.0) {
        return Geometry::identity(background);
    }

    let (bg_w, bg_h) = (background.width as f64, background.height as f64);

    let pillar_width = (bg_h * ratio).round() as u32;
    if pillar_width < background.width {
        return Geometry {
            canvas: Size::new(pillar_width, background.height),
            offset: Offset::new(((bg_w - pillar_width as f64) / 2.0).round() as u32, 0),
        };
    }

    let letter_height = (bg_w / ratio).round() as u32;
    if letter_height < background.height {
        return Geometry {
            canvas: Size::new(background.width, letter_height),
            offset: Offset::new(0, ((bg_h - letter_height as f64) / 2.0).round() as u32),
        };
    }

    Geometry::identity(background)
}
