// src/snapshot.rs

//! The snapshot cache: colors displaced by the scrolling line that are still
//! owed back to the canvas.
//!
//! The scroll driver clears and repopulates the cache every frame while
//! restore workers from earlier frames may be reading it. Every public
//! operation takes the same lock, which keeps the map consistent but does not
//! tie a reader to a particular frame: a late worker sees whatever the cache
//! holds when it reads.

use crate::canvas::Coord;
use crate::color::Rgb;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<Coord, Rgb>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Records the color `coord` had before it was overwritten.
    pub fn put(&self, coord: Coord, color: Rgb) {
        self.lock().insert(coord, color);
    }

    /// Copies out every entry. Entries stay in the cache, so concurrent
    /// readers each get the full set.
    pub fn snapshot(&self) -> Vec<(Coord, Rgb)> {
        self.lock().iter().map(|(coord, color)| (*coord, *color)).collect()
    }

    pub fn get(&self, coord: Coord) -> Option<Rgb> {
        self.lock().get(&coord).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Coord, Rgb>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
