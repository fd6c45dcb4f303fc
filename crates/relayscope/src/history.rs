//! Bounded, insertion-ordered store of detection results.

use crate::verdict::DetectionResult;
use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Fixed-capacity history; the oldest result is evicted first.
///
/// Readers receive owned copies, so a snapshot is never affected by later
/// appends.
#[derive(Debug)]
pub struct History {
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    results: VecDeque<DetectionResult>,
    capacity: usize,
}

impl Inner {
    fn trim(&mut self) {
        while self.results.len() > self.capacity {
            self.results.pop_front();
        }
    }
}

impl History {
    /// Create an empty history. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                results: VecDeque::with_capacity(capacity.clamp(1, 1024)),
                capacity: capacity.max(1),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append a result, evicting from the front when over capacity.
    pub fn append(&self, result: DetectionResult) {
        let mut inner = self.write();
        inner.results.push_back(result);
        inner.trim();
    }

    /// Most recent result.
    pub fn latest(&self) -> Option<DetectionResult> {
        self.read().results.back().cloned()
    }

    /// All retained results, oldest first.
    pub fn all(&self) -> Vec<DetectionResult> {
        self.read().results.iter().cloned().collect()
    }

    /// Number of retained results.
    pub fn len(&self) -> usize {
        self.read().results.len()
    }

    /// Whether no result is retained.
    pub fn is_empty(&self) -> bool {
        self.read().results.is_empty()
    }

    /// Current capacity.
    pub fn capacity(&self) -> usize {
        self.read().capacity
    }

    /// Change the capacity, dropping the oldest results if it shrinks.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.write();
        inner.capacity = capacity.max(1);
        inner.trim();
    }
}
