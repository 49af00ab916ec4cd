//! Filesystem operations for the copy engine.
//!
//! Everything here works on one file at a time and reports failures as plain
//! `io::Error`; the orchestrator turns them into failure events instead of
//! aborting the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Computes the mirrored destination path for a source file.
///
/// The common-root prefix of the source's containing directory is replaced
/// with the run's destination directory, then the file name is appended.
/// Returns `None` when the source does not live under `common_root`; the
/// selector only produces candidates below the resolved root, so a miss here
/// means the file cannot be mirrored.
pub fn mirror_destination(
    source: &Path,
    common_root: &Path,
    destination_dir: &Path,
) -> Option<PathBuf> {
    let parent = source.parent()?;
    let relative = parent.strip_prefix(common_root).ok()?;
    let name = source.file_name()?;
    Some(destination_dir.join(relative).join(name))
}

/// Ensures the parent directory of `path` exists, creating intermediate
/// directories as needed. Idempotent: an already-present directory is fine.
pub fn ensure_parent_dir_exists(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Copies one file, overwriting any existing destination file of the same
/// name and preserving the source modification time.
///
/// Returns the number of bytes copied.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<u64> {
    ensure_parent_dir_exists(dst)?;

    let mut src_file = fs::File::open(src)?;
    let src_mtime = src_file.metadata()?.modified().ok();

    let mut dst_file = fs::File::create(dst)?;
    let bytes_copied = io::copy(&mut src_file, &mut dst_file)?;
    drop(dst_file);

    // The copy itself already succeeded; a failed mtime update is not worth
    // failing the file over.
    if let Some(mtime) = src_mtime {
        let _ = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime));
    }

    Ok(bytes_copied)
}
