//! Backup orchestration.
//!
//! `BackupManager` drives one run end to end on a background worker thread:
//! destination setup, common-root resolution, file selection, the sequential
//! copy loop, and finalization. The caller keeps the receiving end of the
//! event channel and is never blocked while the run executes. One manager
//! allows one active run at a time; a second request is rejected while the
//! first is still running.

use chrono::Local;
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::attrs;
use crate::common_root;
use crate::config::ConfigStore;
use crate::error::EngineError;
use crate::events::{BackupEvent, Notifier, RunSummary};
use crate::fs_ops;
use crate::model::{BackupLocation, BackupMode, FileCandidate, RunState};
use crate::progress::ProgressState;
use crate::runlog::RunLog;
use crate::selector;

/// Name of the configuration snapshot written into each run directory.
pub const SNAPSHOT_FILE_NAME: &str = "Backup.json";

/// Orchestrates backup runs against a configuration store.
pub struct BackupManager<C: ConfigStore> {
    config: Arc<Mutex<C>>,
    run_log: Arc<dyn RunLog>,
    active: Arc<AtomicBool>,
}

/// Caller's handle to an in-flight run.
pub struct RunHandle {
    events: Receiver<BackupEvent>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl RunHandle {
    /// Ordered event stream of the run. The stream disconnects once the
    /// finished event has been emitted and the worker is gone.
    pub fn events(&self) -> &Receiver<BackupEvent> {
        &self.events
    }

    /// Requests cancellation. The worker checks between backlog items, so a
    /// copy already underway still finishes or fails as a whole; the run then
    /// proceeds to finalization and emits its finished event.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Blocks until the worker has finished.
    pub fn wait(self) {
        let _ = self.worker.join();
    }
}

// Clears the busy flag even when the worker exits early.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: ConfigStore + 'static> BackupManager<C> {
    pub fn new(config: Arc<Mutex<C>>, run_log: Arc<dyn RunLog>) -> Self {
        BackupManager {
            config,
            run_log,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts a backup run on a background worker.
    ///
    /// Returns [`EngineError::RunInProgress`] while a previous run on this
    /// manager is still active.
    pub fn start_run(&self) -> Result<RunHandle, EngineError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(EngineError::RunInProgress);
        }

        let (notifier, events) = Notifier::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let config = Arc::clone(&self.config);
        let run_log = Arc::clone(&self.run_log);
        let active = Arc::clone(&self.active);
        let cancel_flag = Arc::clone(&cancel);

        let worker = thread::spawn(move || {
            let _guard = ActiveGuard(active);
            let mut runner = Runner {
                config,
                run_log,
                notifier,
                cancel: cancel_flag,
                progress: ProgressState::new(),
                state: RunState::Idle,
                started: Instant::now(),
                files_copied: 0,
                files_failed: 0,
            };
            runner.execute();
        });

        Ok(RunHandle {
            events,
            cancel,
            worker,
        })
    }
}

/// Worker-side state of one run.
struct Runner<C: ConfigStore> {
    config: Arc<Mutex<C>>,
    run_log: Arc<dyn RunLog>,
    notifier: Notifier,
    cancel: Arc<AtomicBool>,
    progress: ProgressState,
    state: RunState,
    started: Instant,
    files_copied: usize,
    files_failed: usize,
}

impl<C: ConfigStore> Runner<C> {
    fn execute(&mut self) {
        let run_id = Uuid::new_v4();

        let (locations, target, mode, archive_reset) = {
            let cfg = lock(&self.config);
            (
                cfg.locations(),
                cfg.target_folder(),
                cfg.mode(),
                cfg.archive_reset(),
            )
        };

        self.transition(RunState::Started);
        self.notifier.run_started(run_id, mode, self.progress.snapshot());
        self.register_run(run_id);

        let target = match target {
            Some(target) => target,
            None => {
                self.files_failed += 1;
                self.notifier.file_failed(
                    None,
                    None,
                    EngineError::TargetFolderUnset.to_string(),
                    self.progress.snapshot(),
                );
                self.finish(None);
                return;
            }
        };

        let destination = match self.create_run_directory(&target, mode) {
            Ok(destination) => destination,
            Err(err) => {
                // The one fatal condition: nowhere to copy into.
                self.files_failed += 1;
                self.notifier.file_failed(
                    None,
                    Some(target.as_path()),
                    format!(
                        "Could not create the backup directory; the backup has not been \
                         performed. Make sure the destination drive is available and has \
                         enough space, then try again. ({})",
                        err
                    ),
                    self.progress.snapshot(),
                );
                self.finish(None);
                return;
            }
        };

        if locations.is_empty() {
            self.finalize(&destination);
            self.finish(Some(destination));
            return;
        }

        self.transition(RunState::Scanning);
        let (common_root, included) = self.resolve_root(locations);
        let (candidates, failed_locations) =
            selector::scan_locations(&included, mode, &mut self.progress, &self.notifier);
        self.files_failed += failed_locations;
        let mut backlog: VecDeque<FileCandidate> = candidates.into();

        // A fresh run invalidates the previous run's record.
        lock(&self.config).clear_copied_files();

        self.transition(RunState::Copying);
        while let Some(candidate) = backlog.pop_front() {
            if self.cancel.load(Ordering::Relaxed) {
                debug!(remaining = backlog.len() + 1, "cancellation requested");
                break;
            }
            self.copy_one(&candidate, &common_root, &destination, archive_reset);
        }

        self.finalize(&destination);
        self.finish(Some(destination));
    }

    /// Seeds the common root with the first location and folds the rest in.
    /// A location whose parent chain never meets the candidate root is
    /// excluded from the run with a single failure event.
    fn resolve_root(&mut self, mut locations: Vec<BackupLocation>) -> (PathBuf, Vec<BackupLocation>) {
        // Caller guarantees a non-empty set.
        let first = locations.remove(0);
        let mut root = first.path.clone();
        let mut included = vec![first];

        for location in locations {
            if location.path == root {
                included.push(location);
                continue;
            }
            match common_root::common_ancestor(&root, &location.path) {
                Some(next) => {
                    root = next;
                    included.push(location);
                }
                None => {
                    self.files_failed += 1;
                    warn!(location = %location.path.display(), "location shares no common root");
                    self.notifier.file_failed(
                        Some(location.path.as_path()),
                        None,
                        format!(
                            "{}. Check your backup configuration; this directory will not \
                             be included in the backup.",
                            EngineError::NoCommonRoot {
                                left: root.clone(),
                                right: location.path.clone(),
                            }
                        ),
                        self.progress.snapshot(),
                    );
                }
            }
        }

        (root, included)
    }

    fn create_run_directory(
        &self,
        target: &Path,
        mode: BackupMode,
    ) -> Result<PathBuf, EngineError> {
        fs::create_dir_all(target).map_err(|source| EngineError::DestinationUnavailable {
            path: target.to_path_buf(),
            source,
        })?;

        let stamp = Local::now().format("%Y-%m-%d hour %H.%M.%S");
        let directory = target.join(format!("{} backup on {}", mode, stamp));
        fs::create_dir_all(&directory).map_err(|source| EngineError::DestinationUnavailable {
            path: directory.clone(),
            source,
        })?;

        debug!(directory = %directory.display(), "run directory created");
        Ok(directory)
    }

    fn copy_one(
        &mut self,
        candidate: &FileCandidate,
        common_root: &Path,
        destination_dir: &Path,
        archive_reset: bool,
    ) {
        // Visible progress advances even when the copy fails below.
        self.progress.begin_copy(candidate.size);

        let destination =
            match fs_ops::mirror_destination(&candidate.path, common_root, destination_dir) {
                Some(destination) => destination,
                None => {
                    self.files_failed += 1;
                    self.notifier.file_failed(
                        Some(candidate.path.as_path()),
                        None,
                        format!(
                            "{} is outside the resolved common root {}",
                            candidate.path.display(),
                            common_root.display()
                        ),
                        self.progress.snapshot(),
                    );
                    return;
                }
            };

        match fs_ops::copy_file(&candidate.path, &destination) {
            Ok(_) => {
                self.progress.copy_succeeded(candidate.size);
                self.files_copied += 1;
                lock(&self.config).record_copied_file(&candidate.path, &destination);
                self.notifier.file_succeeded(
                    &candidate.path,
                    &destination,
                    self.progress.snapshot(),
                );
                if archive_reset {
                    if let Err(err) = attrs::clear_archive_flag(&candidate.path) {
                        warn!(
                            file = %candidate.path.display(),
                            error = %err,
                            "could not clear archive attribute"
                        );
                    }
                }
            }
            Err(err) => {
                self.files_failed += 1;
                self.notifier.file_failed(
                    Some(candidate.path.as_path()),
                    Some(destination.as_path()),
                    format!(
                        "Failed to copy {} to {}: {}",
                        candidate.path.display(),
                        destination.display(),
                        err
                    ),
                    self.progress.snapshot(),
                );
            }
        }
    }

    /// Writes the configuration snapshot into the run directory. A missing
    /// destination at this point (removable media detached) is reported as a
    /// failure event; the finished event still follows.
    fn finalize(&mut self, destination: &Path) {
        self.transition(RunState::Finalizing);
        let snapshot_path = destination.join(SNAPSHOT_FILE_NAME);
        if let Err(err) = lock(&self.config).persist(&snapshot_path) {
            warn!(error = %err, "could not write configuration snapshot");
            self.notifier.file_failed(
                None,
                Some(snapshot_path.as_path()),
                format!(
                    "Backup state could not be written to the target backup directory: {}",
                    err
                ),
                self.progress.snapshot(),
            );
        }
    }

    fn finish(&mut self, destination: Option<PathBuf>) {
        self.transition(RunState::Finished);
        let summary = RunSummary {
            destination,
            files_copied: self.files_copied,
            files_failed: self.files_failed,
            bytes_copied: self.progress.copied(),
            elapsed: self.started.elapsed(),
        };
        self.notifier.run_finished(summary, self.progress.snapshot());
    }

    /// Best-effort external registration; failures are logged and ignored.
    fn register_run(&self, run_id: Uuid) {
        let user = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        match self.run_log.new_run_id(&user) {
            Ok(id) => debug!(%run_id, external_id = id, "run registered"),
            Err(err) => debug!(%run_id, error = %err, "run registry unavailable; continuing"),
        }
    }

    fn transition(&mut self, to: RunState) {
        debug!(from = ?self.state, to = ?to, "run state");
        self.state = to;
    }
}
