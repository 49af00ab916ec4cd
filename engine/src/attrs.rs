//! Archive-attribute access.
//!
//! The archive flag is the file system's "changed since last backup" marker:
//! set on modification, cleared by us after a successful copy when the run
//! asks for it. Windows has the real `FILE_ATTRIBUTE_ARCHIVE` bit; Unix file
//! systems have no archive bit, so the owner-execute permission bit stands
//! in, following the Samba DOS-attribute mapping.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Whether the archive attribute was set in the given metadata.
pub fn archive_flag(metadata: &Metadata) -> bool {
    imp::is_set(metadata)
}

/// Clears the archive attribute on `path`. Idempotent.
pub fn clear_archive_flag(path: &Path) -> io::Result<()> {
    imp::clear(path)
}

/// Sets the archive attribute on `path`, marking it as changed. Idempotent.
pub fn set_archive_flag(path: &Path) -> io::Result<()> {
    imp::set(path)
}

#[cfg(windows)]
mod imp {
    use std::fs::Metadata;
    use std::io;
    use std::iter;
    use std::os::windows::ffi::OsStrExt;
    use std::os::windows::fs::MetadataExt;
    use std::path::Path;

    use windows::core::PCWSTR;
    use windows::Win32::Storage::FileSystem::{
        GetFileAttributesW, SetFileAttributesW, FILE_FLAGS_AND_ATTRIBUTES,
        INVALID_FILE_ATTRIBUTES,
    };

    const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;

    fn wide(path: &Path) -> Vec<u16> {
        path.as_os_str().encode_wide().chain(iter::once(0)).collect()
    }

    fn update(path: &Path, apply: impl FnOnce(u32) -> u32) -> io::Result<()> {
        let w = wide(path);
        let attrs = unsafe { GetFileAttributesW(PCWSTR(w.as_ptr())) };
        if attrs == INVALID_FILE_ATTRIBUTES {
            return Err(io::Error::last_os_error());
        }
        let wanted = apply(attrs);
        if wanted == attrs {
            return Ok(());
        }
        unsafe { SetFileAttributesW(PCWSTR(w.as_ptr()), FILE_FLAGS_AND_ATTRIBUTES(wanted)) }
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    pub(super) fn is_set(metadata: &Metadata) -> bool {
        metadata.file_attributes() & FILE_ATTRIBUTE_ARCHIVE != 0
    }

    pub(super) fn clear(path: &Path) -> io::Result<()> {
        update(path, |attrs| attrs & !FILE_ATTRIBUTE_ARCHIVE)
    }

    pub(super) fn set(path: &Path) -> io::Result<()> {
        update(path, |attrs| attrs | FILE_ATTRIBUTE_ARCHIVE)
    }
}

#[cfg(unix)]
mod imp {
    use std::fs::{self, Metadata};
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    // Owner-execute, per the Samba mapping of the DOS archive attribute.
    const ARCHIVE_BIT: u32 = 0o100;

    pub(super) fn is_set(metadata: &Metadata) -> bool {
        metadata.permissions().mode() & ARCHIVE_BIT != 0
    }

    pub(super) fn clear(path: &Path) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        let mode = permissions.mode();
        if mode & ARCHIVE_BIT != 0 {
            permissions.set_mode(mode & !ARCHIVE_BIT);
            fs::set_permissions(path, permissions)?;
        }
        Ok(())
    }

    pub(super) fn set(path: &Path) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        let mode = permissions.mode();
        if mode & ARCHIVE_BIT == 0 {
            permissions.set_mode(mode | ARCHIVE_BIT);
            fs::set_permissions(path, permissions)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn set_then_clear_round_trips() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = dir.path().join("file.txt");
        fs::write(&file, b"data").expect("Failed to write file");

        set_archive_flag(&file).expect("Failed to set flag");
        assert!(archive_flag(&fs::metadata(&file).expect("metadata")));

        clear_archive_flag(&file).expect("Failed to clear flag");
        assert!(!archive_flag(&fs::metadata(&file).expect("metadata")));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = dir.path().join("file.txt");
        fs::write(&file, b"data").expect("Failed to write file");

        clear_archive_flag(&file).expect("first clear");
        clear_archive_flag(&file).expect("second clear");
        assert!(!archive_flag(&fs::metadata(&file).expect("metadata")));
    }

    #[test]
    fn missing_file_reports_an_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let missing = dir.path().join("absent.txt");
        assert!(clear_archive_flag(&missing).is_err());
    }
}
