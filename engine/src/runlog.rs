//! Best-effort external run registry.
//!
//! Deployments can register each run in an external system and get back a
//! numeric run id. The engine treats this strictly as best effort: a failing
//! or absent registry is logged at debug level and otherwise ignored, and
//! never affects the outcome of a backup.

use thiserror::Error;

/// The registry could not produce a run id.
#[derive(Debug, Error)]
#[error("run registry unavailable: {0}")]
pub struct RunLogError(pub String);

/// External run registry interface.
pub trait RunLog: Send + Sync {
    /// Registers a new run on behalf of `user` and returns its id.
    fn new_run_id(&self, user: &str) -> Result<i64, RunLogError>;
}

/// Registry used when none is configured; every request is unavailable.
#[derive(Debug, Default)]
pub struct NoRunLog;

impl RunLog for NoRunLog {
    fn new_run_id(&self, _user: &str) -> Result<i64, RunLogError> {
        Err(RunLogError("no run registry configured".into()))
    }
}
