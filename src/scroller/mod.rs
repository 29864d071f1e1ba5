// src/scroller/mod.rs

//! The scrolling line: a band of columns that moves across the canvas one
//! column per frame, remembering the pixels it covers and putting them back
//! shortly afterwards.
//!
//! Each frame the [`ScrollDriver`]:
//!
//! 1. clears the [`SnapshotCache`],
//! 2. for every pixel of the band reads its current color, stores it in the
//!    cache and paints it with the draw color,
//! 3. schedules a restore wave on its [`RestorePool`],
//! 4. moves the band one column right (wrapping at the canvas width),
//! 5. sleeps for the frame interval.
//!
//! The driver does not wait for a frame's wave before starting the next frame.
//! See `restore` for what that means for late workers.

pub mod restore;


use crate::canvas::{CanvasError, CanvasLink, Coord, LinkError};
use crate::cancel::CancelToken;
use crate::color::Rgb;
use crate::config::{CanvasConfig, ScrollConfig};
use crate::snapshot::SnapshotCache;
use anyhow::{bail, Context, Result};
use log::*;
use restore::{RestorePool, RestoreTiming};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Columns covered by a band of `band_width` starting at `offset`, wrapping
/// at `width`.
pub fn band_columns(offset: u32, band_width: u32, width: u32) -> impl Iterator<Item = u32> {
    (0..band_width).map(move |dx| ((u64::from(offset) + u64::from(dx)) % u64::from(width)) as u32)
}

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub offset: u32,
    /// Pixels painted with the draw color.
    pub painted: usize,
    /// Pixels whose previous color could not be parsed and was recorded as black.
    pub unreadable: usize,
}

/// Drives the scrolling line on the calling thread.
pub struct ScrollDriver {
    link: Arc<dyn CanvasLink>,
    cache: Arc<SnapshotCache>,
    pool: RestorePool,
    cancel: CancelToken,
    width: u32,
    height: u32,
    band_width: u32,
    frame_interval: Duration,
    max_frames: Option<u64>,
    draw_color: Rgb,
    offset: u32,
    frame: u64,
}

impl ScrollDriver {
    /// Builds a driver and spawns its restore workers.
    ///
    /// The draw color is `scroll.draw_color`, or a random color when unset.
    pub fn new(
        link: Arc<dyn CanvasLink>,
        canvas: CanvasConfig,
        scroll: &ScrollConfig,
        cancel: CancelToken,
    ) -> Result<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            bail!("Canvas {}x{} has no pixels", canvas.width, canvas.height);
        }
        if scroll.band_width == 0 || scroll.band_width > canvas.width {
            bail!(
                "Band width {} must be between 1 and the canvas width {}",
                scroll.band_width,
                canvas.width
            );
        }

        let draw_color = scroll
            .draw_color
            .unwrap_or_else(|| Rgb::random(&mut rand::thread_rng()));
        let cache = Arc::new(SnapshotCache::new());
        let timing = RestoreTiming {
            worker_count: scroll.worker_count,
            base_delay: scroll.restore_base_delay(),
            worker_skew: scroll.restore_worker_skew(),
        };
        let pool = RestorePool::spawn(Arc::clone(&link), Arc::clone(&cache), timing, cancel.clone())
            .context("Failed to start restore workers")?;

        info!(
            "ScrollDriver: {}x{} canvas, band of {} columns, color {}, {} restore workers",
            canvas.width,
            canvas.height,
            scroll.band_width,
            draw_color,
            pool.worker_count()
        );

        Ok(ScrollDriver {
            link,
            cache,
            pool,
            cancel,
            width: canvas.width,
            height: canvas.height,
            band_width: scroll.band_width,
            frame_interval: scroll.frame_interval(),
            max_frames: scroll.max_frames,
            draw_color,
            offset: 0,
            frame: 0,
        })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn draw_color(&self) -> Rgb {
        self.draw_color
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frame
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Starts the band at `offset` instead of the left edge.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset % self.width;
        self
    }

    /// Paints the band at the current offset and schedules its restore wave.
    ///
    /// For each pixel the old color is read and cached before the new one is
    /// written. A transport error aborts the frame; the wave is not scheduled.
    pub fn run_frame(&mut self) -> Result<FrameReport, LinkError> {
        self.cache.clear();
        let mut unreadable = 0;

        for x in band_columns(self.offset, self.band_width, self.width) {
            for y in 0..self.height {
                let coord = Coord::new(x, y);
                let old = match self.link.get_pixel(coord) {
                    Ok(color) => color,
                    Err(CanvasError::Protocol(e)) => {
                        warn!(
                            "ScrollDriver: Could not read pixel {}: {}. Restoring it as {}.",
                            coord,
                            e,
                            Rgb::BLACK
                        );
                        unreadable += 1;
                        Rgb::BLACK
                    }
                    Err(CanvasError::Link(e)) => return Err(e),
                };
                self.cache.put(coord, old);
                self.link.set_pixel(coord, self.draw_color)?;
            }
        }
        self.link.flush()?;

        // Every pixel of the band is cached by now; only then may workers look.
        self.pool.schedule_wave(self.frame);

        let report = FrameReport {
            frame: self.frame,
            offset: self.offset,
            painted: self.band_width as usize * self.height as usize,
            unreadable,
        };
        debug!("ScrollDriver: {:?}", report);

        self.offset = (self.offset + 1) % self.width;
        self.frame += 1;
        Ok(report)
    }

    /// Runs frames until cancelled or `max_frames` is reached.
    ///
    /// Returns the number of frames drawn. Cancellation is checked before each
    /// frame and during the pause between frames.
    pub fn run(&mut self) -> Result<u64, LinkError> {
        let mut drawn = 0;
        loop {
            if self.cancel.is_cancelled() {
                info!("ScrollDriver: Cancelled after {} frames.", drawn);
                break;
            }
            if self.max_frames.is_some_and(|max| self.frame >= max) {
                info!("ScrollDriver: Reached the frame limit after {} frames.", drawn);
                break;
            }

            self.run_frame()?;
            drawn += 1;
            if let Some(e) = self.pool.take_failure() {
                return Err(e);
            }

            if self.max_frames.is_some_and(|max| self.frame >= max) {
                continue;
            }
            self.cancel.sleep(self.frame_interval);
        }

        match self.pool.take_failure() {
            Some(e) => Err(e),
            None => Ok(drawn),
        }
    }

    /// Waits for outstanding restore waves and stops the workers.
    ///
    /// After cancellation, waves still waiting out their delay are dropped.
    pub fn finish(self) -> Result<(), LinkError> {
        self.pool.finish()
    }
}

/// A scroll driver running on its own thread.
pub struct ScrollLine {
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<u64, LinkError>>>,
}

impl ScrollLine {
    /// Builds a driver and starts it on a `scroll-driver` thread.
    ///
    /// On a transport error the thread cancels the restore workers and closes
    /// the link before reporting the error through [`ScrollLine::join`].
    pub fn start(
        link: Arc<dyn CanvasLink>,
        canvas: CanvasConfig,
        scroll: &ScrollConfig,
        cancel: CancelToken,
    ) -> Result<Self> {
        let mut driver = ScrollDriver::new(Arc::clone(&link), canvas, scroll, cancel.clone())?;
        let thread_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("scroll-driver".to_string())
            .spawn(move || {
                let result = match driver.run() {
                    Ok(frames) => driver.finish().map(|()| frames),
                    Err(e) => {
                        // Cancel first so dropping the driver does not wait out pending waves.
                        thread_cancel.cancel();
                        drop(driver);
                        Err(e)
                    }
                };
                if let Err(e) = &result {
                    error!("ScrollLine: Stopping after transport error: {}", e);
                    link.close();
                }
                result
            })
            .context("Failed to spawn scroll driver thread")?;

        info!("ScrollLine: Started");
        Ok(ScrollLine {
            cancel,
            handle: Some(handle),
        })
    }

    /// Asks the driver to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the driver thread and returns the number of frames drawn.
    pub fn join(mut self) -> Result<u64> {
        let handle = self.handle.take().context("Scroll driver already joined")?;
        match handle.join() {
            Ok(result) => result.context("Scrolling line stopped"),
            Err(e) => bail!("Scroll driver thread panicked: {:?}", e),
        }
    }
}

impl Drop for ScrollLine {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.cancel();
            if let Err(e) = handle.join() {
                error!("ScrollLine: Driver thread panicked: {:?}", e);
            }
        }
    }
}
