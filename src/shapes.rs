// src/shapes.rs

//! Single-threaded drawing helpers: solid and gradient rectangles, full-canvas
//! floods, and a rectangle that jumps to a random spot at a fixed interval.
//!
//! None of these read the canvas; they only issue sets and flush at the end.

use crate::canvas::{CanvasLink, Coord, LinkError};
use crate::cancel::CancelToken;
use crate::color::Rgb;
use crate::config::{CanvasConfig, JumpConfig};
use log::*;
use rand::Rng;
use std::time::Instant;

/// An axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Coordinates column by column, top to bottom.
    pub fn coords(&self) -> impl Iterator<Item = Coord> {
        let Rect {
            x,
            y,
            width,
            height,
        } = *self;
        (x..x + width).flat_map(move |cx| (y..y + height).map(move |cy| Coord::new(cx, cy)))
    }
}

impl From<crate::config::RectConfig> for Rect {
    fn from(rect: crate::config::RectConfig) -> Self {
        Rect::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// Paints every pixel of `rect` with `color`.
pub fn fill_rect(link: &dyn CanvasLink, rect: Rect, color: Rgb) -> Result<(), LinkError> {
    for coord in rect.coords() {
        link.set_pixel(coord, color)?;
    }
    link.flush()
}

/// Color of gradient cell `(i, j)` inside a `width x height` rectangle.
///
/// Red grows from left to right and green from top to bottom; blue stays 0.
pub fn gradient_color(i: u32, j: u32, width: u32, height: u32) -> Rgb {
    let red = (u64::from(i) * 255 / u64::from(width.max(1))) as u8;
    let green = (u64::from(j) * 255 / u64::from(height.max(1))) as u8;
    Rgb::from_channels(red, green, 0)
}

/// Paints `rect` with the red/green gradient of [`gradient_color`].
pub fn gradient_rect(link: &dyn CanvasLink, rect: Rect) -> Result<(), LinkError> {
    for i in 0..rect.width {
        for j in 0..rect.height {
            let color = gradient_color(i, j, rect.width, rect.height);
            link.set_pixel(Coord::new(rect.x + i, rect.y + j), color)?;
        }
    }
    link.flush()
}

/// Paints the whole canvas with `color`.
pub fn flood(link: &dyn CanvasLink, canvas: CanvasConfig, color: Rgb) -> Result<(), LinkError> {
    info!(
        "Shapes: Flooding {}x{} canvas with {}",
        canvas.width, canvas.height, color
    );
    fill_rect(link, Rect::new(0, 0, canvas.width, canvas.height), color)
}

/// Redraws a `jump.width x jump.height` rectangle in a fresh random color at a
/// random position every `jump.interval`, until `jump.duration` has passed or
/// `cancel` fires. Earlier rectangles are left on the canvas.
///
/// Returns the number of rectangles drawn.
pub fn jumping_rect<R: Rng>(
    link: &dyn CanvasLink,
    canvas: CanvasConfig,
    jump: &JumpConfig,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<u32, LinkError> {
    let width = jump.width.min(canvas.width);
    let height = jump.height.min(canvas.height);
    let deadline = Instant::now() + jump.duration();
    let mut drawn = 0;

    while Instant::now() < deadline && !cancel.is_cancelled() {
        let x = rng.gen_range(0..=canvas.width - width);
        let y = rng.gen_range(0..=canvas.height - height);
        let color = Rgb::random(rng);
        debug!("Shapes: Jumping rectangle to ({}, {}) in {}", x, y, color);
        fill_rect(link, Rect::new(x, y, width, height), color)?;
        drawn += 1;

        if !cancel.sleep(jump.interval()) {
            info!("Shapes: Jumping rectangle interrupted.");
            break;
        }
    }
    Ok(drawn)
}
