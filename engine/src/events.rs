//! Typed events describing the progress of a backup run.
//!
//! The run worker is the only producer; the caller drains the receiving end
//! of the channel from whatever context it likes (UI loop, test thread,
//! CLI main). Events are ordered and each carries a progress snapshot taken
//! at the time of emission.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::model::BackupMode;
use crate::progress::ProgressSnapshot;

/// One event in the stream a run emits.
///
/// Relative order within a run: `RunStarted` once, then `SizeCalculated`
/// (batched, during scanning) interleaved with `FileSucceeded`/`FileFailed`
/// (one per candidate, during copying), then `RunFinished` once, always last.
#[derive(Debug, Clone)]
pub enum BackupEvent {
    /// The run worker has started and the counters were reset.
    RunStarted {
        run_id: Uuid,
        mode: BackupMode,
        progress: ProgressSnapshot,
    },

    /// Intermediate or final size total from the selection phase. The final
    /// emission after enumeration always carries the exact total.
    SizeCalculated {
        total_bytes: u64,
        progress: ProgressSnapshot,
    },

    /// A file was copied to its mirrored destination.
    FileSucceeded {
        source: PathBuf,
        destination: PathBuf,
        progress: ProgressSnapshot,
    },

    /// A file or an entire location could not be backed up. Location-level
    /// failures carry the location as `source` and no destination.
    FileFailed {
        source: Option<PathBuf>,
        destination: Option<PathBuf>,
        message: String,
        progress: ProgressSnapshot,
    },

    /// The run is over; emitted exactly once, after finalization.
    RunFinished {
        summary: RunSummary,
        progress: ProgressSnapshot,
    },
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The timestamped subdirectory this run wrote into, when it got far
    /// enough to create one.
    pub destination: Option<PathBuf>,

    /// Files copied successfully.
    pub files_copied: usize,

    /// Failure events emitted during the run: failed files, skipped
    /// locations, and setup failures alike.
    pub files_failed: usize,

    /// Success-only byte count; the basis for throughput.
    pub bytes_copied: u64,

    pub elapsed: Duration,
}

impl RunSummary {
    /// Mean throughput in bytes per second over the whole run.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_copied as f64 / secs
        } else {
            0.0
        }
    }
}

/// Single-producer side of the event stream.
///
/// Send failures are ignored: a caller that dropped its receiver has walked
/// away from the run, which must still complete and record its results.
pub(crate) struct Notifier {
    tx: Sender<BackupEvent>,
}

impl Notifier {
    pub(crate) fn channel() -> (Notifier, Receiver<BackupEvent>) {
        let (tx, rx) = unbounded();
        (Notifier { tx }, rx)
    }

    pub(crate) fn run_started(&self, run_id: Uuid, mode: BackupMode, progress: ProgressSnapshot) {
        let _ = self.tx.send(BackupEvent::RunStarted {
            run_id,
            mode,
            progress,
        });
    }

    pub(crate) fn size_calculated(&self, total_bytes: u64, progress: ProgressSnapshot) {
        let _ = self.tx.send(BackupEvent::SizeCalculated {
            total_bytes,
            progress,
        });
    }

    pub(crate) fn file_succeeded(&self, source: &Path, destination: &Path, progress: ProgressSnapshot) {
        let _ = self.tx.send(BackupEvent::FileSucceeded {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            progress,
        });
    }

    pub(crate) fn file_failed(
        &self,
        source: Option<&Path>,
        destination: Option<&Path>,
        message: impl Into<String>,
        progress: ProgressSnapshot,
    ) {
        let _ = self.tx.send(BackupEvent::FileFailed {
            source: source.map(Path::to_path_buf),
            destination: destination.map(Path::to_path_buf),
            message: message.into(),
            progress,
        });
    }

    pub(crate) fn run_finished(&self, summary: RunSummary, progress: ProgressSnapshot) {
        let _ = self.tx.send(BackupEvent::RunFinished { summary, progress });
    }
}
