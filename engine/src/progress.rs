//! Byte-level progress accounting for a single run.
//!
//! A run owns exactly one `ProgressState`; every mutation happens on the run
//! worker, and consumers only ever see immutable `ProgressSnapshot` copies
//! attached to events.

/// Running byte counters of one backup run.
///
/// `attempted` is an optimistic ledger: it advances by the candidate's size
/// before each physical copy, so visible progress moves deterministically
/// even when a copy fails. `copied` advances only on confirmed success and is
/// the counter throughput is derived from. After scanning completes,
/// `copied <= planned` holds by construction of the increment sites.
#[derive(Debug, Default)]
pub struct ProgressState {
    planned: u64,
    attempted: u64,
    copied: u64,
}

impl ProgressState {
    pub fn new() -> Self {
        ProgressState::default()
    }

    /// Adds a completed location's byte total during the selection phase.
    /// `planned` is fixed once scanning ends.
    pub fn add_planned(&mut self, bytes: u64) {
        self.planned += bytes;
    }

    /// Records that a copy of `bytes` is about to be attempted.
    pub fn begin_copy(&mut self, bytes: u64) {
        self.attempted += bytes;
    }

    /// Records a confirmed successful copy of `bytes`.
    pub fn copy_succeeded(&mut self, bytes: u64) {
        self.copied += bytes;
    }

    pub fn planned(&self) -> u64 {
        self.planned
    }

    pub fn copied(&self) -> u64 {
        self.copied
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            planned: self.planned,
            attempted: self.attempted,
            copied: self.copied,
        }
    }
}

/// Immutable view of the counters at the time an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Total bytes selected for the run.
    pub planned: u64,

    /// Bytes whose copy has been attempted, successful or not.
    pub attempted: u64,

    /// Bytes confirmed copied.
    pub copied: u64,
}

impl ProgressSnapshot {
    /// Normalized completion in `0..=1`, driven by the attempted ledger.
    /// Defined as 0 while nothing is planned.
    pub fn ratio(&self) -> f64 {
        if self.planned == 0 {
            0.0
        } else {
            self.attempted as f64 / self.planned as f64
        }
    }
}
