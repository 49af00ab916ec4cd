//! Common-root resolution across backup locations.
//!
//! The destination mirrors every file's path relative to the nearest shared
//! ancestor of all configured locations, so locations on divergent subtrees
//! still land in one consistent layout. Resolution walks parent chains
//! iteratively; paths whose chains never meet (different drive roots) are a
//! defined failure, not a silent default.

use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// Nearest shared ancestor of two paths, where a path counts as its own
/// ancestor. Returns `None` when both parent chains are exhausted without
/// meeting. The empty path produced at the end of a relative chain is not a
/// real directory and never unifies anything.
pub fn common_ancestor(left: &Path, right: &Path) -> Option<PathBuf> {
    left.ancestors()
        .filter(|candidate| !candidate.as_os_str().is_empty())
        .find(|candidate| right.starts_with(candidate))
        .map(Path::to_path_buf)
}

/// Resolves the common root of a whole location set.
///
/// Seeds the candidate with the first path and folds the remaining paths
/// into it pairwise. Any pair without a shared ancestor fails the resolution
/// with [`EngineError::NoCommonRoot`] naming the offending pair.
pub fn resolve<'a, I>(paths: I) -> Result<PathBuf, EngineError>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let first = iter.next().ok_or(EngineError::NoLocations)?;
    let mut root = first.to_path_buf();

    for path in iter {
        if path == root {
            continue;
        }
        root = common_ancestor(&root, path).ok_or_else(|| EngineError::NoCommonRoot {
            left: root.clone(),
            right: path.to_path_buf(),
        })?;
    }

    Ok(root)
}
