//! Core data model for backup runs.
//!
//! This module defines the value types shared across the engine:
//! - BackupLocation: a configured source directory with its copy-order priority
//! - BackupMode: full vs. incremental selection
//! - FileCandidate: a file discovered during scanning
//! - CopiedFile: a (source, destination) pair recorded after a successful copy
//! - RunState: lifecycle of a single backup run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A directory that participates in backups.
///
/// Locations are owned by the configuration store and handed to the engine
/// for the duration of a run. `priority` orders the copy sequence (lower runs
/// earlier); values are unique within the configured set but not necessarily
/// contiguous, because reordering swaps priority values pairwise instead of
/// renumbering the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupLocation {
    /// Absolute directory path.
    pub path: PathBuf,

    /// Copy-order priority; the lower the number, the earlier the location
    /// is scanned and copied.
    pub priority: i32,
}

impl BackupLocation {
    pub fn new(path: impl Into<PathBuf>, priority: i32) -> Self {
        BackupLocation {
            path: path.into(),
            priority,
        }
    }
}

impl fmt::Display for BackupLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.priority)
    }
}

/// How files are selected for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupMode {
    /// Copies every discovered file regardless of the archive attribute.
    #[default]
    Full,
    /// Copies only files whose archive attribute is currently set.
    Incremental,
}

impl fmt::Display for BackupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupMode::Full => write!(f, "Full"),
            BackupMode::Incremental => write!(f, "Incremental"),
        }
    }
}

/// A file discovered during scanning.
///
/// Candidates are produced by the file selector and consumed exactly once by
/// the copy loop; the source file is never touched afterwards except for
/// clearing its archive attribute after a confirmed successful copy.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    /// Full source path.
    pub path: PathBuf,

    /// Size in bytes at scan time.
    pub size: u64,

    /// Whether the archive attribute was set at scan time.
    pub archive_set: bool,
}

/// A successfully backed-up file, recorded for post-run persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Lifecycle of a single backup run.
///
/// A run moves strictly forward; failed scans and copies still advance to
/// `Finalizing` so the successful subset gets recorded. Only a destination
/// that cannot be created ends a run early, and even then the finished event
/// is still emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in progress.
    Idle,
    /// Start event emitted, counters reset.
    Started,
    /// Resolving the common root and enumerating locations.
    Scanning,
    /// Draining the backlog.
    Copying,
    /// Writing the configuration snapshot into the destination.
    Finalizing,
    /// Finished event emitted; the run object is discarded.
    Finished,
}
