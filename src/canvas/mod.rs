// src/canvas/mod.rs

//! The canvas link: everything needed to talk to a pixelflut canvas.
//!
//! `CanvasLink` is the seam between drawing code and the transport. The real
//! implementation is [`TcpCanvasLink`]; [`MemoryCanvas`] backs the same trait
//! with an in-memory grid so drawing logic can be exercised without a server.

pub mod memory;
pub mod protocol;
pub mod tcp;


pub use memory::MemoryCanvas;
pub use tcp::TcpCanvasLink;

use crate::color::Rgb;
use std::fmt;
use std::io;
use thiserror::Error;

/// A pixel position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    pub const fn new(x: u32, y: u32) -> Self {
        Coord { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Transport-level failure. Fatal to the operation that hit it.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("canvas link is closed")]
    Closed,
    #[error("server closed the connection")]
    Disconnected,
    #[error("no answer for {requested} after skipping {skipped} answers for other pixels")]
    OutOfSync { requested: Coord, skipped: usize },
    #[error("failed to connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("canvas connection I/O error")]
    Io(#[from] io::Error),
}

/// A server response that could not be understood. Recoverable: callers
/// substitute [`Rgb::BLACK`] and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("response {0:?} has fewer than 4 fields")]
    TooFewFields(String),
    #[error("response {0:?} does not start with PX")]
    UnexpectedKeyword(String),
    #[error("response {0:?} has an invalid coordinate")]
    InvalidCoordinate(String),
    #[error("response {0:?} has an invalid color")]
    InvalidColor(String),
}

/// Error returned by [`CanvasLink::get_pixel`].
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A connection to a pixelflut canvas.
///
/// Implementations are shared between the scroll driver and its restore
/// workers, so every method takes `&self` and the implementation serializes
/// writes internally.
pub trait CanvasLink: Send + Sync {
    /// Sets one pixel. No acknowledgment is expected from the server.
    fn set_pixel(&self, coord: Coord, color: Rgb) -> Result<(), LinkError>;

    /// Reads one pixel, blocking until the server answers.
    fn get_pixel(&self, coord: Coord) -> Result<Rgb, CanvasError>;

    /// Pushes any buffered commands to the server.
    fn flush(&self) -> Result<(), LinkError> {
        Ok(())
    }

    /// Releases the connection. Calling it again is a no-op.
    fn close(&self);
}
