// src/scroller/restore.rs

//! Staggered restore workers.
//!
//! A `RestorePool` owns one long-lived thread per worker index. Every frame the
//! driver schedules a *wave*: each worker `i` sleeps until
//! `wave start + base_delay + i * skew`, then writes the whole snapshot cache
//! back onto the canvas. Workers of a wave are redundant on purpose; each one
//! restores the full set, so a wave costs `worker_count` times the band's
//! traffic.
//!
//! Workers read the cache when their delay expires, not when the wave was
//! scheduled. By then the driver may have cleared and refilled the cache for a
//! later frame, and the worker restores those colors instead.

use crate::canvas::{CanvasLink, LinkError};
use crate::cancel::CancelToken;
use crate::snapshot::SnapshotCache;
use anyhow::{Context, Result};
use log::*;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Waves a worker may have queued before `schedule_wave` blocks the driver.
const WAVE_QUEUE_DEPTH: usize = 64;

/// Timing of one wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreTiming {
    pub worker_count: usize,
    pub base_delay: Duration,
    pub worker_skew: Duration,
}

impl RestoreTiming {
    /// Delay between scheduling a wave and worker `index` restoring it, or
    /// `None` if it does not fit in a `Duration`.
    pub fn delay_for(&self, index: usize) -> Option<Duration> {
        let index = u32::try_from(index).ok()?;
        self.worker_skew.checked_mul(index)?.checked_add(self.base_delay)
    }
}

#[derive(Debug, Clone, Copy)]
struct Wave {
    frame: u64,
    scheduled_at: Instant,
}

/// Fixed set of restore worker threads fed by the scroll driver.
pub struct RestorePool {
    senders: Vec<SyncSender<Wave>>,
    workers: Vec<JoinHandle<()>>,
    failure: Arc<Mutex<Option<LinkError>>>,
}

impl RestorePool {
    /// Spawns `timing.worker_count` worker threads.
    ///
    /// Workers stop sleeping early and skip their pending waves once `cancel`
    /// is triggered. A worker that hits a transport error records it, cancels
    /// the token and exits.
    pub fn spawn(
        link: Arc<dyn CanvasLink>,
        cache: Arc<SnapshotCache>,
        timing: RestoreTiming,
        cancel: CancelToken,
    ) -> Result<Self> {
        // Delays grow with the index, so the last worker bounds them all.
        if let Some(last) = timing.worker_count.checked_sub(1) {
            timing
                .delay_for(last)
                .and_then(|delay| Instant::now().checked_add(delay))
                .with_context(|| {
                    format!(
                        "Restore delay of {:?} + {} x {:?} is out of range",
                        timing.base_delay, last, timing.worker_skew
                    )
                })?;
        }

        let failure = Arc::new(Mutex::new(None));
        let mut senders = Vec::with_capacity(timing.worker_count);
        let mut workers = Vec::with_capacity(timing.worker_count);

        for index in 0..timing.worker_count {
            let (tx, rx) = mpsc::sync_channel::<Wave>(WAVE_QUEUE_DEPTH);
            let delay = timing
                .delay_for(index)
                .with_context(|| format!("Restore delay of worker {} is out of range", index))?;
            let worker = RestoreWorker {
                index,
                delay,
                link: Arc::clone(&link),
                cache: Arc::clone(&cache),
                cancel: cancel.clone(),
                failure: Arc::clone(&failure),
            };
            let handle = thread::Builder::new()
                .name(format!("restore-{}", index))
                .spawn(move || worker.run(rx))
                .with_context(|| format!("Failed to spawn restore worker {}", index))?;
            senders.push(tx);
            workers.push(handle);
        }

        debug!("RestorePool: Spawned {} workers ({:?})", workers.len(), timing);
        Ok(RestorePool {
            senders,
            workers,
            failure,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Starts the delay clock of every worker for one frame.
    ///
    /// Blocks if a worker already has a full queue of pending waves.
    pub fn schedule_wave(&self, frame: u64) {
        let wave = Wave {
            frame,
            scheduled_at: Instant::now(),
        };
        for (index, tx) in self.senders.iter().enumerate() {
            let sent = match tx.try_send(wave) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(wave)) => {
                    warn!(
                        "RestorePool: Worker {} is {} waves behind, waiting for it.",
                        index, WAVE_QUEUE_DEPTH
                    );
                    tx.send(wave).map_err(|_| ())
                }
                Err(TrySendError::Disconnected(_)) => Err(()),
            };
            if sent.is_err() {
                debug!("RestorePool: Worker {} has exited, wave {} dropped.", index, frame);
            }
        }
        trace!("RestorePool: Scheduled wave for frame {}", frame);
    }

    /// Takes the first transport error a worker ran into, if any.
    pub fn take_failure(&self) -> Option<LinkError> {
        lock_failure(&self.failure).take()
    }

    /// Lets every worker finish its queued waves, joins them, and returns any
    /// transport error they hit.
    pub fn finish(mut self) -> Result<(), LinkError> {
        self.shutdown();
        match self.take_failure() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) {
        // Closing the channels ends each worker's loop once its queue is empty.
        self.senders.clear();
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("restore").to_string();
            if let Err(e) = handle.join() {
                error!("RestorePool: {} panicked: {:?}", name, e);
            }
        }
    }
}

impl Drop for RestorePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct RestoreWorker {
    index: usize,
    delay: Duration,
    link: Arc<dyn CanvasLink>,
    cache: Arc<SnapshotCache>,
    cancel: CancelToken,
    failure: Arc<Mutex<Option<LinkError>>>,
}

impl RestoreWorker {
    fn run(self, waves: Receiver<Wave>) {
        while let Ok(wave) = waves.recv() {
            if !self.cancel.sleep_until(wave.scheduled_at + self.delay) {
                trace!(
                    "RestoreWorker {}: Cancelled, skipping wave for frame {}",
                    self.index,
                    wave.frame
                );
                continue;
            }
            if let Err(e) = self.restore(wave.frame) {
                error!("RestoreWorker {}: Restore failed: {}", self.index, e);
                lock_failure(&self.failure).get_or_insert(e);
                self.cancel.cancel();
                break;
            }
        }
        trace!("RestoreWorker {}: Exiting", self.index);
    }

    fn restore(&self, frame: u64) -> Result<(), LinkError> {
        let entries = self.cache.snapshot();
        for (coord, color) in &entries {
            self.link.set_pixel(*coord, *color)?;
        }
        self.link.flush()?;
        debug!(
            "RestoreWorker {}: Restored {} pixels for frame {}",
            self.index,
            entries.len(),
            frame
        );
        Ok(())
    }
}

fn lock_failure(failure: &Mutex<Option<LinkError>>) -> std::sync::MutexGuard<'_, Option<LinkError>> {
    failure.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
