//! Persistent backup configuration.
//!
//! [`ConfigStore`] is the collaborator boundary the orchestrator works
//! against: an ordered location list plus a handful of parameters and the
//! ledger of backed-up files. [`BackupConfig`] is the JSON-backed
//! implementation the CLI uses; a front end with its own settings storage
//! can provide a different store without touching the engine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::model::{BackupLocation, BackupMode, CopiedFile};

/// Read/write interface of the configuration collaborator.
pub trait ConfigStore: Send {
    /// Configured locations, ordered by ascending priority.
    fn locations(&self) -> Vec<BackupLocation>;

    /// Root folder backups are written under. `None` until configured.
    fn target_folder(&self) -> Option<PathBuf>;

    fn mode(&self) -> BackupMode;

    /// Whether the archive attribute is cleared after each successful copy.
    fn archive_reset(&self) -> bool;

    /// Records one successfully backed-up (source, destination) pair.
    fn record_copied_file(&mut self, source: &Path, destination: &Path);

    /// Empties the backed-up-files ledger; a fresh run invalidates the
    /// previous run's record.
    fn clear_copied_files(&mut self);

    /// Serializes the full configuration state to `path`. Callable
    /// repeatedly; the caller is responsible for creating the parent
    /// directory first.
    fn persist(&self, path: &Path) -> Result<(), EngineError>;
}

/// JSON-backed configuration document.
///
/// Location paths are compared case-insensitively, matching how the backup
/// targets (FAT/NTFS volumes) treat them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    locations: Vec<BackupLocation>,
    target_folder: Option<PathBuf>,
    mode: BackupMode,
    reset_archive: bool,
    copied_files: Vec<CopiedFile>,
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

impl BackupConfig {
    pub fn new() -> Self {
        BackupConfig::default()
    }

    /// Loads a previously persisted document.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|e| EngineError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| EngineError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Adds a location with the next free priority. Empty paths and
    /// duplicates (case-insensitive) are ignored; returns whether the
    /// location was added.
    pub fn add_location(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return false;
        }
        let key = path_key(&path);
        if self.locations.iter().any(|loc| path_key(&loc.path) == key) {
            return false;
        }
        let priority = self
            .locations
            .iter()
            .map(|loc| loc.priority)
            .max()
            .unwrap_or(0)
            + 1;
        self.locations.push(BackupLocation::new(path, priority));
        true
    }

    /// Removes a location by path. Unknown paths are a no-op; returns
    /// whether anything was removed.
    pub fn remove_location(&mut self, path: &Path) -> bool {
        let key = path_key(path);
        let before = self.locations.len();
        self.locations.retain(|loc| path_key(&loc.path) != key);
        self.locations.len() != before
    }

    /// Looks a location up by path (case-insensitive).
    pub fn find_location(&self, path: &Path) -> Option<BackupLocation> {
        let key = path_key(path);
        self.locations
            .iter()
            .find(|loc| path_key(&loc.path) == key)
            .cloned()
    }

    /// Exchanges the priority values of two locations. The values swap while
    /// the entries keep their identity; the list is never renumbered.
    pub fn swap_priorities(&mut self, first: &Path, second: &Path) -> Result<(), EngineError> {
        let a = self.index_of(first)?;
        let b = self.index_of(second)?;
        let tmp = self.locations[a].priority;
        self.locations[a].priority = self.locations[b].priority;
        self.locations[b].priority = tmp;
        Ok(())
    }

    fn index_of(&self, path: &Path) -> Result<usize, EngineError> {
        let key = path_key(path);
        self.locations
            .iter()
            .position(|loc| path_key(&loc.path) == key)
            .ok_or_else(|| EngineError::UnknownLocation {
                path: path.to_path_buf(),
            })
    }

    /// The location ordered immediately before `of`: nearest priority below.
    pub fn location_above(&self, of: &BackupLocation) -> Option<BackupLocation> {
        self.locations
            .iter()
            .filter(|loc| loc.priority < of.priority)
            .max_by_key(|loc| loc.priority)
            .cloned()
    }

    /// The location ordered immediately after `of`: nearest priority above.
    pub fn location_below(&self, of: &BackupLocation) -> Option<BackupLocation> {
        self.locations
            .iter()
            .filter(|loc| loc.priority > of.priority)
            .min_by_key(|loc| loc.priority)
            .cloned()
    }

    pub fn set_target_folder(&mut self, path: impl Into<PathBuf>) {
        self.target_folder = Some(path.into());
    }

    pub fn set_mode(&mut self, mode: BackupMode) {
        self.mode = mode;
    }

    pub fn set_reset_archive(&mut self, reset: bool) {
        self.reset_archive = reset;
    }

    pub fn copied_files(&self) -> &[CopiedFile] {
        &self.copied_files
    }
}

impl ConfigStore for BackupConfig {
    fn locations(&self) -> Vec<BackupLocation> {
        let mut ordered = self.locations.clone();
        ordered.sort_by_key(|loc| loc.priority);
        ordered
    }

    fn target_folder(&self) -> Option<PathBuf> {
        self.target_folder.clone()
    }

    fn mode(&self) -> BackupMode {
        self.mode
    }

    fn archive_reset(&self) -> bool {
        self.reset_archive
    }

    fn record_copied_file(&mut self, source: &Path, destination: &Path) {
        self.copied_files.push(CopiedFile {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }

    fn clear_copied_files(&mut self) {
        self.copied_files.clear();
    }

    fn persist(&self, path: &Path) -> Result<(), EngineError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| EngineError::ConfigPersist {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        fs::write(path, text).map_err(|source| EngineError::ConfigPersist {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_increasing_priorities() {
        let mut config = BackupConfig::new();
        assert!(config.add_location("/data/docs"));
        assert!(config.add_location("/data/photos"));

        let locations = config.locations();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].priority, 1);
        assert_eq!(locations[1].priority, 2);
    }

    #[test]
    fn add_rejects_empty_and_duplicate_paths() {
        let mut config = BackupConfig::new();
        assert!(!config.add_location(""));
        assert!(config.add_location("/data/docs"));
        assert!(!config.add_location("/data/docs"));
        assert!(!config.add_location("/DATA/Docs"));
        assert_eq!(config.locations().len(), 1);
    }

    #[test]
    fn remove_unknown_location_is_a_noop() {
        let mut config = BackupConfig::new();
        config.add_location("/data/docs");
        assert!(!config.remove_location(Path::new("/data/photos")));
        assert!(config.remove_location(Path::new("/data/DOCS")));
        assert!(config.locations().is_empty());
    }

    #[test]
    fn swap_exchanges_priority_values_not_positions() {
        let mut config = BackupConfig::new();
        config.add_location("/a"); // priority 1
        config.add_location("/b"); // priority 2
        config.add_location("/c"); // priority 3

        config
            .swap_priorities(Path::new("/b"), Path::new("/c"))
            .expect("swap");

        assert_eq!(config.find_location(Path::new("/b")).unwrap().priority, 3);
        assert_eq!(config.find_location(Path::new("/c")).unwrap().priority, 2);

        let ordered: Vec<_> = config
            .locations()
            .into_iter()
            .map(|loc| loc.path)
            .collect();
        assert_eq!(
            ordered,
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/c"),
                PathBuf::from("/b")
            ]
        );
    }

    #[test]
    fn swap_with_unknown_location_fails() {
        let mut config = BackupConfig::new();
        config.add_location("/a");
        let result = config.swap_priorities(Path::new("/a"), Path::new("/nope"));
        assert!(matches!(result, Err(EngineError::UnknownLocation { .. })));
    }

    #[test]
    fn neighbor_lookup_skips_priority_gaps() {
        let mut config = BackupConfig::new();
        config.add_location("/a");
        config.add_location("/b");
        config.add_location("/c");
        // Swapping leaves gaps in the middle of the order.
        config
            .swap_priorities(Path::new("/a"), Path::new("/c"))
            .expect("swap");

        let b = config.find_location(Path::new("/b")).unwrap();
        assert_eq!(config.location_above(&b).unwrap().path, PathBuf::from("/c"));
        assert_eq!(config.location_below(&b).unwrap().path, PathBuf::from("/a"));

        let c = config.find_location(Path::new("/c")).unwrap();
        assert!(config.location_above(&c).is_none());
    }

    #[test]
    fn ledger_records_and_clears() {
        let mut config = BackupConfig::new();
        config.record_copied_file(Path::new("/data/a.txt"), Path::new("/backup/a.txt"));
        config.record_copied_file(Path::new("/data/b.txt"), Path::new("/backup/b.txt"));
        assert_eq!(config.copied_files().len(), 2);

        config.clear_copied_files();
        assert!(config.copied_files().is_empty());
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("backup.json");

        let mut config = BackupConfig::new();
        config.add_location("/data/docs");
        config.set_target_folder("/backup");
        config.set_mode(BackupMode::Incremental);
        config.set_reset_archive(true);
        config.record_copied_file(Path::new("/data/docs/a.txt"), Path::new("/backup/a.txt"));

        config.persist(&path).expect("Failed to persist");
        let reloaded = BackupConfig::load(&path).expect("Failed to load");

        assert_eq!(reloaded.locations(), config.locations());
        assert_eq!(reloaded.target_folder(), Some(PathBuf::from("/backup")));
        assert_eq!(reloaded.mode(), BackupMode::Incremental);
        assert!(reloaded.archive_reset());
        assert_eq!(reloaded.copied_files(), config.copied_files());
    }

    #[test]
    fn persist_into_missing_parent_fails() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("absent").join("backup.json");
        let config = BackupConfig::new();
        assert!(matches!(
            config.persist(&path),
            Err(EngineError::ConfigPersist { .. })
        ));
    }

    #[test]
    fn load_rejects_malformed_document() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("backup.json");
        fs::write(&path, b"not json").expect("Failed to write file");
        assert!(matches!(
            BackupConfig::load(&path),
            Err(EngineError::ConfigLoad { .. })
        ));
    }
}
