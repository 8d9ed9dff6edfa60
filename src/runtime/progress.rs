use std::sync::atomic::{AtomicUsize, Ordering};

const UNINITIALIZED: usize = usize::MAX;

/// Tracks the last case position the sequencer finished, skipped cases included.
#[derive(Debug)]
pub struct ProgressTracker {
    total: AtomicUsize,
    last_completed: AtomicUsize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total: AtomicUsize::new(total),
            last_completed: AtomicUsize::new(UNINITIALIZED),
        }
    }

    pub fn reset(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.last_completed.store(UNINITIALIZED, Ordering::SeqCst);
    }

    pub fn mark_completed(&self, position: usize) {
        self.last_completed.store(position, Ordering::SeqCst);
    }

    pub fn last_completed(&self) -> Option<usize> {
        match self.last_completed.load(Ordering::SeqCst) {
            UNINITIALIZED => None,
            value => Some(value),
        }
    }

    /// Number of cases finished so far.
    pub fn completed(&self) -> usize {
        self.last_completed().map_or(0, |position| position + 1)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}
