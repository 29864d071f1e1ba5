//! Pixelflut client library.
//!
//! Exposes the canvas link, the scrolling line with its restore workers, and
//! the simple shape helpers for the binary and for integration tests.

pub mod cancel;
pub mod canvas;
pub mod color;
pub mod config;
pub mod scroller;
pub mod shapes;
pub mod snapshot;
