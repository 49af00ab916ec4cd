//! Error types for the backup engine.
//!
//! `EngineError` covers run-level failures only: conditions that prevent a
//! run from starting or that the caller must act on. Per-file and
//! per-location failures during a run are reported through the event stream
//! and never surface as `Err`; a single bad file must not stop the backlog.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Run-level errors of the backup engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No target folder is configured; there is nowhere to back up to.
    #[error("no backup target folder is configured")]
    TargetFolderUnset,

    /// The destination root or the timestamped run subdirectory could not be
    /// created. This is the one condition that aborts a run before copying.
    #[error("could not create backup directory {path}")]
    DestinationUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two location paths have no shared ancestor (e.g. different drive
    /// roots); their relative structure cannot be mirrored together.
    #[error("no common ancestor between {left} and {right}")]
    NoCommonRoot { left: PathBuf, right: PathBuf },

    /// The resolver was handed an empty location set.
    #[error("cannot resolve a common root without any locations")]
    NoLocations,

    /// A location path was not found in the configuration store.
    #[error("unknown backup location {path}")]
    UnknownLocation { path: PathBuf },

    /// Another run is already active on this orchestrator.
    #[error("a backup run is already in progress")]
    RunInProgress,

    /// The configuration document could not be written.
    #[error("failed to persist configuration to {path}")]
    ConfigPersist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration document could not be read or parsed.
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },
}
