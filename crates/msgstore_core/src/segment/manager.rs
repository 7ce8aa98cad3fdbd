//! Segment log implementation.

use super::chunk::{scan_chunks, Chunk};
use super::dir::{list_segments, OverflowDir};
use super::{LoadedSegment, SegmentLog};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::types::SegmentId;
use msgstore_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

type SharedBackend = Arc<RwLock<Box<dyn StorageBackend>>>;

struct Segment {
    backend: SharedBackend,
    chunks: u64,
    size: u64,
    /// Sealed segments never receive another append.
    sealed: bool,
}

struct LogState {
    open: bool,
    dir: Option<OverflowDir>,
    segments: BTreeMap<SegmentId, Segment>,
    next_id: SegmentId,
}

/// Summary of one segment, for probes and tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Segment identifier.
    pub id: SegmentId,
    /// Number of chunks written.
    pub chunks: u64,
    /// Size in bytes.
    pub bytes: u64,
    /// Whether appends have moved on to a newer segment.
    pub sealed: bool,
}

/// Manages the numbered segments of the overflow log.
///
/// Segments live either in a locked directory (one file per segment) or,
/// without a directory, in memory. Appends go to the newest segment until
/// it reaches `max_chunks_per_segment` chunks or `max_segment_size` bytes,
/// or until [`SegmentLog::peek_oldest`] seals it.
pub struct SegmentManager {
    /// Overflow directory; `None` keeps segments in memory.
    path: Option<PathBuf>,
    max_segment_size: u64,
    max_chunks_per_segment: u64,
    sync_on_append: bool,
    state: Mutex<LogState>,
}

impl SegmentManager {
    /// Creates a segment manager. Call [`SegmentLog::start`] before use.
    #[must_use]
    pub fn new(
        path: Option<PathBuf>,
        max_segment_size: u64,
        max_chunks_per_segment: usize,
        sync_on_append: bool,
    ) -> Self {
        Self {
            path,
            max_segment_size,
            max_chunks_per_segment: max_chunks_per_segment as u64,
            sync_on_append,
            state: Mutex::new(LogState {
                open: false,
                dir: None,
                segments: BTreeMap::new(),
                next_id: SegmentId::FIRST,
            }),
        }
    }

    /// Creates a manager with the limits and directory of `config`.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.overflow_dir.clone(),
            config.max_segment_size,
            config.max_chunks_per_segment,
            config.sync_on_append,
        )
    }

    /// Creates an in-memory manager with default limits.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_config(&StoreConfig::default())
    }

    /// Creates a manager persisting segments under `dir` with default limits.
    #[must_use]
    pub fn on_disk(dir: &Path) -> Self {
        Self::from_config(&StoreConfig::default().overflow_dir(dir))
    }

    /// The overflow directory, if segments are persisted.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Describes every held segment, oldest first.
    #[must_use]
    pub fn info(&self) -> Vec<SegmentInfo> {
        self.state
            .lock()
            .segments
            .iter()
            .map(|(&id, seg)| SegmentInfo {
                id,
                chunks: seg.chunks,
                bytes: seg.size,
                sealed: seg.sealed,
            })
            .collect()
    }

    fn needs_new_segment(&self, state: &LogState, framed_len: u64) -> bool {
        match state.segments.values().next_back() {
            None => true,
            Some(seg) => {
                seg.sealed
                    || seg.chunks >= self.max_chunks_per_segment
                    || (seg.size > 0 && seg.size + framed_len > self.max_segment_size)
            }
        }
    }

    fn open_segment(state: &mut LogState) -> StoreResult<()> {
        let id = state.next_id;
        let backend: Box<dyn StorageBackend> = match &state.dir {
            Some(dir) => Box::new(FileBackend::open(&dir.segment_path(id))?),
            None => Box::new(InMemoryBackend::new()),
        };

        if let Some(previous) = state.segments.values_mut().next_back() {
            previous.sealed = true;
        }
        state.segments.insert(
            id,
            Segment {
                backend: Arc::new(RwLock::new(backend)),
                chunks: 0,
                size: 0,
                sealed: false,
            },
        );
        state.next_id = id.next();
        debug!(segment = %id, "opened overflow segment");
        Ok(())
    }

    fn recover_segments(dir: &OverflowDir, state: &mut LogState) -> StoreResult<()> {
        for (id, file) in list_segments(dir.path())? {
            let backend = FileBackend::open_existing(&file)?;
            let size = backend.size()?;
            let chunks = match backend.read_all() {
                Ok(data) => scan_chunks(&data).chunks.len() as u64,
                Err(e) => {
                    warn!(segment = %id, error = %e, "could not read segment while counting chunks");
                    0
                }
            };

            let backend: Box<dyn StorageBackend> = Box::new(backend);
            state.segments.insert(
                id,
                Segment {
                    backend: Arc::new(RwLock::new(backend)),
                    chunks,
                    size,
                    sealed: true,
                },
            );
            if id >= state.next_id {
                state.next_id = id.next();
            }
        }
        Ok(())
    }
}

impl SegmentLog for SegmentManager {
    fn start(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        if state.open {
            return Ok(());
        }

        if let Some(path) = &self.path {
            let dir = OverflowDir::open(path)?;
            Self::recover_segments(&dir, &mut state)?;
            if !state.segments.is_empty() {
                info!(
                    segments = state.segments.len(),
                    dir = %path.display(),
                    "found overflow segments from a previous run"
                );
            }
            state.dir = Some(dir);
        }

        state.open = true;
        Ok(())
    }

    fn append(&self, payload: &[u8]) -> StoreResult<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StoreError::LogClosed);
        }

        let framed_len = Chunk::framed_len(payload.len()) as u64;
        if self.needs_new_segment(&state, framed_len) {
            Self::open_segment(&mut state)?;
        }
        let Some(segment) = state.segments.values_mut().next_back() else {
            return Err(StoreError::LogClosed);
        };

        let framed = Chunk::encode(segment.chunks, payload)?;
        {
            let mut backend = segment.backend.write();
            backend.append(&framed)?;
            if self.sync_on_append {
                backend.flush()?;
            }
        }
        segment.chunks += 1;
        segment.size += framed.len() as u64;
        Ok(())
    }

    fn peek_oldest(&self) -> StoreResult<Option<LoadedSegment>> {
        let (id, backend) = {
            let mut state = self.state.lock();
            if !state.open {
                return Err(StoreError::LogClosed);
            }
            let Some((&id, segment)) = state.segments.iter_mut().next() else {
                return Ok(None);
            };
            segment.sealed = true;
            (id, Arc::clone(&segment.backend))
        };

        // Sealed, so the read below cannot race an append.
        let data = backend.read().read_all()?;
        let scan = scan_chunks(&data);
        if !scan.is_clean() {
            warn!(
                segment = %id,
                corrupt = scan.corrupt,
                trailing_bytes = scan.trailing_bytes,
                "skipped damaged chunks"
            );
        }

        Ok(Some(LoadedSegment {
            id,
            chunks: scan.chunks,
        }))
    }

    fn remove(&self, id: SegmentId) -> StoreResult<()> {
        let segment = {
            let mut state = self.state.lock();
            if !state.open {
                return Err(StoreError::LogClosed);
            }
            state.segments.remove(&id)
        };
        let Some(segment) = segment else {
            return Ok(());
        };

        match Arc::try_unwrap(segment.backend) {
            Ok(backend) => backend.into_inner().discard()?,
            Err(_) => warn!(segment = %id, "segment still referenced, leaving its data in place"),
        }
        debug!(segment = %id, "removed overflow segment");
        Ok(())
    }

    fn segment_count(&self) -> usize {
        self.state.lock().segments.len()
    }

    fn close(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Ok(());
        }

        let mut first_error = None;
        for (id, segment) in &state.segments {
            let mut backend = segment.backend.write();
            let synced = backend.flush().and_then(|()| backend.sync());
            if let Err(e) = synced {
                warn!(segment = %id, error = %e, "failed to sync segment on close");
                if first_error.is_none() {
                    first_error = Some(StoreError::from(e));
                }
            }
        }

        state.segments.clear();
        state.dir = None;
        state.open = false;
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for SegmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentManager")
            .field("path", &self.path)
            .field("max_segment_size", &self.max_segment_size)
            .field("max_chunks_per_segment", &self.max_chunks_per_segment)
            .field("segment_count", &self.segment_count())
            .finish_non_exhaustive()
    }
}
