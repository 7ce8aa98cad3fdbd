//! Overflow directory layout and locking.
//!
//! ```text
//! <overflow_dir>/
//! ├─ LOCK                       # Advisory lock, one store per directory
//! ├─ 00000000000000000001.seg   # Oldest segment
//! └─ 00000000000000000002.seg
//! ```

use crate::error::{StoreError, StoreResult};
use crate::types::SegmentId;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const SEGMENT_EXT: &str = "seg";

/// An overflow directory held exclusively by one store.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct OverflowDir {
    path: PathBuf,
    _lock_file: File,
}

impl OverflowDir {
    /// Creates the directory if needed and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DirectoryLocked`] if another process holds the
    /// lock, or an I/O error.
    pub fn open(path: &Path) -> StoreResult<Self> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(StoreError::invalid_config(format!(
                "overflow path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::DirectoryLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Root of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File that holds segment `id`.
    #[must_use]
    pub fn segment_path(&self, id: SegmentId) -> PathBuf {
        segment_file(&self.path, id)
    }
}

/// File that holds segment `id` under `dir`.
#[must_use]
pub fn segment_file(dir: &Path, id: SegmentId) -> PathBuf {
    dir.join(format!("{:020}.{SEGMENT_EXT}", id.as_u64()))
}

/// Lists the segment files under `dir`, oldest first.
///
/// Files that do not look like segments are ignored. Does not take the lock.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read.
pub fn list_segments(dir: &Path) -> StoreResult<Vec<(SegmentId, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SEGMENT_EXT) {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&id| id > 0);
        if let Some(id) = id {
            found.push((SegmentId::new(id), path));
        }
    }
    found.sort_by_key(|(id, _)| *id);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_open_is_locked_out() {
        let dir = tempdir().unwrap();
        let first = OverflowDir::open(dir.path()).unwrap();
        assert!(matches!(
            OverflowDir::open(dir.path()),
            Err(StoreError::DirectoryLocked)
        ));
        drop(first);
        assert!(OverflowDir::open(dir.path()).is_ok());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let overflow = OverflowDir::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(overflow.path(), nested);
    }

    #[test]
    fn lists_segments_in_id_order() {
        let dir = tempdir().unwrap();
        for id in [10, 2, 7] {
            File::create(segment_file(dir.path(), SegmentId::new(id))).unwrap();
        }
        File::create(dir.path().join("notes.txt")).unwrap();
        File::create(dir.path().join("garbage.seg")).unwrap();

        let ids: Vec<_> = list_segments(dir.path())
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.as_u64())
            .collect();
        assert_eq!(ids, vec![2, 7, 10]);
    }
}
