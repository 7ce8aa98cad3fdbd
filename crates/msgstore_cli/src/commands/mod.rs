//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod verify;

use msgstore_core::segment::{list_segments, scan_chunks, ChunkScan};
use msgstore_core::SegmentId;
use msgstore_storage::{FileBackend, StorageBackend};
use std::path::Path;

/// One segment file read from disk.
pub struct SegmentFile {
    /// Segment identifier parsed from the file name.
    pub id: SegmentId,
    /// File size in bytes.
    pub bytes: u64,
    /// Frames found in the file.
    pub scan: ChunkScan,
}

/// Reads every segment in `dir`, oldest first.
pub fn read_segments(dir: &Path) -> Result<Vec<SegmentFile>, Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("No overflow directory at {:?}", dir).into());
    }

    let mut out = Vec::new();
    for (id, path) in list_segments(dir)? {
        let backend = FileBackend::open_existing(&path)?;
        let data = backend.read_all()?;
        out.push(SegmentFile {
            id,
            bytes: data.len() as u64,
            scan: scan_chunks(&data),
        });
    }
    Ok(out)
}
