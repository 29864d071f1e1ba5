// src/canvas/memory.rs

//! An in-memory `CanvasLink`, used to exercise drawing code without a server.

use super::{CanvasError, CanvasLink, Coord, LinkError, ProtocolError};
use crate::color::Rgb;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

struct Grid {
    pixels: Vec<Rgb>,
    set_log: Vec<(Coord, Rgb)>,
    corrupt: HashSet<Coord>,
}

/// A canvas backed by a `width * height` grid.
///
/// Every set is appended to a log so tests can check ordering, and selected
/// coordinates can be marked corrupt so reading them yields a
/// [`ProtocolError`], as a misbehaving server would.
pub struct MemoryCanvas {
    width: u32,
    height: u32,
    grid: Mutex<Grid>,
    gets: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgb::BLACK)
    }

    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        MemoryCanvas {
            width,
            height,
            grid: Mutex::new(Grid {
                pixels: vec![color; width as usize * height as usize],
                set_log: Vec::new(),
                corrupt: HashSet::new(),
            }),
            gets: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a canvas whose pixels are produced by `paint`.
    pub fn painted(width: u32, height: u32, paint: impl Fn(Coord) -> Rgb) -> Self {
        let canvas = Self::new(width, height);
        {
            let mut grid = canvas.lock();
            for y in 0..height {
                for x in 0..width {
                    let idx = (y * width + x) as usize;
                    grid.pixels[idx] = paint(Coord::new(x, y));
                }
            }
        }
        canvas
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the current color at `coord` without counting as a get.
    pub fn pixel(&self, coord: Coord) -> Option<Rgb> {
        self.index(coord).map(|idx| self.lock().pixels[idx])
    }

    /// Makes subsequent gets of `coord` fail with a protocol error.
    pub fn corrupt(&self, coord: Coord) {
        self.lock().corrupt.insert(coord);
    }

    pub fn set_count(&self) -> usize {
        self.lock().set_log.len()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Every set issued so far, in order.
    pub fn set_log(&self) -> Vec<(Coord, Rgb)> {
        self.lock().set_log.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        (coord.x < self.width && coord.y < self.height)
            .then(|| (coord.y * self.width + coord.x) as usize)
    }

    fn lock(&self) -> MutexGuard<'_, Grid> {
        self.grid.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.is_closed() {
            Err(LinkError::Closed)
        } else {
            Ok(())
        }
    }
}

impl CanvasLink for MemoryCanvas {
    /// Out-of-range sets are logged but otherwise dropped, as a server would.
    fn set_pixel(&self, coord: Coord, color: Rgb) -> Result<(), LinkError> {
        self.ensure_open()?;
        let idx = self.index(coord);
        let mut grid = self.lock();
        if let Some(idx) = idx {
            grid.pixels[idx] = color;
        }
        grid.set_log.push((coord, color));
        Ok(())
    }

    fn get_pixel(&self, coord: Coord) -> Result<Rgb, CanvasError> {
        self.ensure_open()?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        let grid = self.lock();
        let response = format!("PX {} {}", coord.x, coord.y);
        if grid.corrupt.contains(&coord) {
            return Err(ProtocolError::TooFewFields(response).into());
        }
        match self.index(coord) {
            Some(idx) => Ok(grid.pixels[idx]),
            None => Err(ProtocolError::InvalidCoordinate(response).into()),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
