//! # Backup Engine
//!
//! A headless engine that backs up a prioritized set of directories into a
//! timestamped destination folder. Designed as the foundation for multiple
//! front ends (CLI, GUI, automation).
//!
//! ## Overview
//!
//! The engine provides:
//! - An ordered location list with swappable priorities, persisted as JSON
//! - Full and incremental (archive-attribute driven) file selection
//! - Common-root resolution so divergent source subtrees mirror consistently
//! - A sequential copy loop that isolates per-file and per-location failures
//! - Byte-level progress tracking and a typed event stream over a channel
//! - Best-effort external run registration that can never fail a backup
//!
//! A run executes on its own worker thread; the caller drains the event
//! channel from wherever it likes and is never blocked by the run.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use engine::{BackupConfig, BackupEvent, BackupManager, NoRunLog};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = BackupConfig::new();
//! config.add_location("/home/me/documents");
//! config.set_target_folder("/mnt/backup");
//!
//! let manager = BackupManager::new(Arc::new(Mutex::new(config)), Arc::new(NoRunLog));
//! let run = manager.start_run()?;
//! for event in run.events().iter() {
//!     if let BackupEvent::RunFinished { summary, .. } = event {
//!         println!("copied {} bytes", summary.bytes_copied);
//!     }
//! }
//! run.wait();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: core value types (locations, modes, candidates, run state)
//! - **error**: run-level error types
//! - **config**: configuration store trait and the JSON-backed document
//! - **common_root**: shared-ancestor resolution across locations
//! - **selector**: per-location enumeration and mode filtering
//! - **attrs**: archive-attribute access per platform
//! - **fs_ops**: mirrored-path computation and the low-level copy
//! - **progress**: byte counters and completion ratio
//! - **events**: the typed event stream
//! - **manager**: run orchestration on a background worker
//! - **runlog**: best-effort external run registry

pub mod attrs;
pub mod common_root;
pub mod config;
pub mod error;
pub mod events;
pub mod fs_ops;
pub mod manager;
pub mod model;
pub mod progress;
pub mod runlog;
pub mod selector;

// Re-export main types and functions
pub use config::{BackupConfig, ConfigStore};
pub use error::EngineError;
pub use events::{BackupEvent, RunSummary};
pub use manager::{BackupManager, RunHandle, SNAPSHOT_FILE_NAME};
pub use model::{BackupLocation, BackupMode, CopiedFile, FileCandidate, RunState};
pub use progress::{ProgressSnapshot, ProgressState};
pub use runlog::{NoRunLog, RunLog, RunLogError};
