//! Dump command implementation.

use super::read_segments;
use msgstore_core::MessageEntity;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

/// Decodes the entities stored in `dir`, oldest first, up to `limit`.
pub fn collect(
    dir: &Path,
    limit: Option<usize>,
) -> Result<Vec<MessageEntity>, Box<dyn std::error::Error>> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut entities = Vec::new();

    'segments: for seg in read_segments(dir)? {
        for chunk in &seg.scan.chunks {
            if entities.len() >= limit {
                break 'segments;
            }
            match MessageEntity::decode(&chunk.payload) {
                Ok(entity) => entities.push(entity),
                Err(e) => warn!(segment = %seg.id, sequence = chunk.sequence, error = %e, "skipping chunk"),
            }
        }
    }

    Ok(entities)
}

/// Runs the dump command.
pub fn run(dir: &Path, limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entity in collect(dir, limit)? {
        serde_json::to_writer(&mut out, &entity)?;
        writeln!(out)?;
    }
    Ok(())
}
