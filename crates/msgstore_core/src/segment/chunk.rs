//! Chunk framing inside a segment.

use crate::error::{StoreError, StoreResult};

/// Frame header: record_len (4) + sequence (8).
const HEADER_SIZE: usize = 12;
/// Trailing CRC32.
const CRC_SIZE: usize = 4;

/// One framed payload read back from a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk within its segment, starting at 0.
    pub sequence: u64,
    /// Serialized entity.
    pub payload: Vec<u8>,
}

impl Chunk {
    /// Frames `payload` as chunk number `sequence`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SegmentCorruption`] if the framed chunk would
    /// not fit the 32-bit length field.
    pub fn encode(sequence: u64, payload: &[u8]) -> StoreResult<Vec<u8>> {
        let record_len = u32::try_from(HEADER_SIZE + payload.len() + CRC_SIZE)
            .map_err(|_| StoreError::segment_corruption("chunk payload too large"))?;
        let mut buf = Vec::with_capacity(record_len as usize);

        buf.extend_from_slice(&record_len.to_le_bytes());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(payload);

        let crc = compute_crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decodes the single chunk at the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SegmentCorruption`] for a short or malformed
    /// frame and [`StoreError::ChecksumMismatch`] if the CRC does not match.
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        let record_len = frame_len(data)
            .ok_or_else(|| StoreError::segment_corruption("chunk header truncated"))?;
        if record_len < HEADER_SIZE + CRC_SIZE {
            return Err(StoreError::segment_corruption("chunk length below minimum"));
        }
        if data.len() < record_len {
            return Err(StoreError::segment_corruption("chunk truncated"));
        }

        let body_end = record_len - CRC_SIZE;
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&data[body_end..record_len]);
        let expected = u32::from_le_bytes(crc_bytes);
        let actual = compute_crc32(&data[..body_end]);
        if expected != actual {
            return Err(StoreError::ChecksumMismatch { expected, actual });
        }

        let mut seq_bytes = [0u8; 8];
        seq_bytes.copy_from_slice(&data[4..HEADER_SIZE]);

        Ok(Self {
            sequence: u64::from_le_bytes(seq_bytes),
            payload: data[HEADER_SIZE..body_end].to_vec(),
        })
    }

    /// Size of the framed chunk in bytes.
    #[must_use]
    pub fn framed_len(payload_len: usize) -> usize {
        HEADER_SIZE + payload_len + CRC_SIZE
    }
}

/// Result of walking every frame of a segment.
#[derive(Debug, Default)]
pub struct ChunkScan {
    /// Chunks whose checksum verified, in file order.
    pub chunks: Vec<Chunk>,
    /// Frames skipped because of a checksum mismatch.
    pub corrupt: usize,
    /// Trailing bytes that did not form a complete frame.
    pub trailing_bytes: usize,
}

impl ChunkScan {
    /// Whether every byte of the segment formed a valid chunk.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.corrupt == 0 && self.trailing_bytes == 0
    }
}

/// Walks the frames of a whole segment.
///
/// A frame with a bad checksum is skipped using its length field. A
/// truncated tail or an impossible length ends the walk; the remaining
/// bytes are reported in [`ChunkScan::trailing_bytes`].
#[must_use]
pub fn scan_chunks(data: &[u8]) -> ChunkScan {
    let mut scan = ChunkScan::default();
    let mut offset = 0usize;

    while offset < data.len() {
        let rest = &data[offset..];
        let record_len = match frame_len(rest) {
            Some(len) if len >= HEADER_SIZE + CRC_SIZE && len <= rest.len() => len,
            _ => {
                scan.trailing_bytes = rest.len();
                break;
            }
        };

        match Chunk::decode(&rest[..record_len]) {
            Ok(chunk) => scan.chunks.push(chunk),
            Err(_) => scan.corrupt += 1,
        }
        offset += record_len;
    }

    scan
}

fn frame_len(data: &[u8]) -> Option<usize> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes) as usize)
}

/// Computes the IEEE CRC32 of `data`.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    !data.iter().fold(0xFFFF_FFFF_u32, |crc, &byte| {
        (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize]
    })
}
