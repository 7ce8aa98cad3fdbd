//! Inspect command implementation.

use super::read_segments;
use serde::Serialize;
use std::path::Path;

/// Overflow directory summary.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Directory path.
    pub path: String,
    /// Number of segments.
    pub segment_count: usize,
    /// Total chunks over all segments.
    pub total_chunks: usize,
    /// Total size in bytes.
    pub total_bytes: u64,
    /// Per-segment details, oldest first.
    pub segments: Vec<SegmentSummary>,
}

/// Summary of one segment file.
#[derive(Debug, Serialize)]
pub struct SegmentSummary {
    /// Segment identifier.
    pub id: u64,
    /// File size in bytes.
    pub bytes: u64,
    /// Chunks with a valid checksum.
    pub chunks: usize,
    /// Chunks with a bad checksum.
    pub corrupt: usize,
    /// Bytes after the last complete frame.
    pub trailing_bytes: usize,
}

/// Collects the summary for `dir`.
pub fn inspect(dir: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let segments: Vec<SegmentSummary> = read_segments(dir)?
        .into_iter()
        .map(|seg| SegmentSummary {
            id: seg.id.as_u64(),
            bytes: seg.bytes,
            chunks: seg.scan.chunks.len(),
            corrupt: seg.scan.corrupt,
            trailing_bytes: seg.scan.trailing_bytes,
        })
        .collect();

    Ok(InspectResult {
        path: dir.display().to_string(),
        segment_count: segments.len(),
        total_chunks: segments.iter().map(|s| s.chunks).sum(),
        total_bytes: segments.iter().map(|s| s.bytes).sum(),
        segments,
    })
}

/// Runs the inspect command.
pub fn run(dir: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(dir)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Overflow directory: {}", result.path);
    println!("Segments:           {}", result.segment_count);
    println!("Chunks:             {}", result.total_chunks);
    println!("Size:               {} bytes", result.total_bytes);

    if result.segments.is_empty() {
        return;
    }

    println!();
    println!("{:>20}  {:>12}  {:>8}  {:>8}  {:>8}", "segment", "bytes", "chunks", "corrupt", "trailing");
    for seg in &result.segments {
        println!(
            "{:>20}  {:>12}  {:>8}  {:>8}  {:>8}",
            seg.id, seg.bytes, seg.chunks, seg.corrupt, seg.trailing_bytes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgstore_core::{SegmentLog, SegmentManager, StoreConfig};
    use tempfile::tempdir;

    #[test]
    fn summarizes_segments() {
        let dir = tempdir().unwrap();
        let log = SegmentManager::from_config(
            &StoreConfig::default()
                .overflow_dir(dir.path())
                .max_chunks_per_segment(2),
        );
        log.start().unwrap();
        for payload in [b"a", b"b", b"c"] {
            log.append(payload).unwrap();
        }
        log.close().unwrap();

        let result = inspect(dir.path()).unwrap();
        assert_eq!(result.segment_count, 2);
        assert_eq!(result.total_chunks, 3);
        assert_eq!(result.segments[0].id, 1);
        assert_eq!(result.segments[1].chunks, 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(inspect(&dir.path().join("absent")).is_err());
    }
}
