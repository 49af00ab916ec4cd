//! File selection for a backup run.
//!
//! Locations are enumerated one after another in priority order. A location
//! is all-or-nothing: if its enumeration fails (most commonly because the
//! configured directory no longer exists), it contributes zero files and
//! zero bytes and is reported with a single failure event, while the
//! remaining locations proceed.

use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::attrs;
use crate::events::Notifier;
use crate::model::{BackupLocation, BackupMode, FileCandidate};
use crate::progress::ProgressState;

/// One intermediate size event per this many accumulated files, so a long
/// enumeration phase is not silent.
pub const SIZE_EVENT_BATCH: usize = 50;

/// Enumerates a single location and returns the candidates its mode selects.
///
/// Entries are visited in directory order with names sorted, which keeps the
/// backlog stable for a given file-system snapshot. Full mode selects every
/// file; Incremental selects only files whose archive attribute is set at
/// scan time.
pub fn select_location(
    root: &Path,
    mode: BackupMode,
) -> Result<Vec<FileCandidate>, walkdir::Error> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata()?;
        let archive_set = attrs::archive_flag(&metadata);
        if mode == BackupMode::Incremental && !archive_set {
            continue;
        }
        candidates.push(FileCandidate {
            path: entry.into_path(),
            size: metadata.len(),
            archive_set,
        });
    }

    Ok(candidates)
}

/// Scans every location into one ordered backlog.
///
/// Completed locations fold their byte totals into `progress`; intermediate
/// size events are batched per [`SIZE_EVENT_BATCH`], and one final event with
/// the exact total is always emitted after enumeration, even when the
/// cadence already landed on the boundary. Returns the backlog together with
/// the number of locations that failed to enumerate.
pub(crate) fn scan_locations(
    locations: &[BackupLocation],
    mode: BackupMode,
    progress: &mut ProgressState,
    notifier: &Notifier,
) -> (Vec<FileCandidate>, usize) {
    let mut backlog = Vec::new();
    let mut failed_locations = 0;

    for location in locations {
        match select_location(&location.path, mode) {
            Ok(selected) => {
                debug!(
                    location = %location.path.display(),
                    files = selected.len(),
                    "location enumerated"
                );

                let mut location_bytes = 0u64;
                for (index, candidate) in selected.iter().enumerate() {
                    location_bytes += candidate.size;
                    if (index + 1) % SIZE_EVENT_BATCH == 0 {
                        notifier.size_calculated(
                            progress.planned() + location_bytes,
                            progress.snapshot(),
                        );
                    }
                }

                progress.add_planned(location_bytes);
                backlog.extend(selected);
            }
            Err(err) => {
                failed_locations += 1;
                warn!(location = %location.path.display(), error = %err, "location skipped");
                notifier.file_failed(
                    Some(location.path.as_path()),
                    None,
                    format!(
                        "{}. Check your backup configuration; this directory will not be \
                         included in the backup.",
                        err
                    ),
                    progress.snapshot(),
                );
            }
        }
    }

    // The client always gets the final, exact number.
    notifier.size_calculated(progress.planned(), progress.snapshot());

    (backlog, failed_locations)
}
