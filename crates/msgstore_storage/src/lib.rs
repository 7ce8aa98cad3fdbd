//! # msgstore storage
//!
//! Byte-store backends underneath the msgstore overflow log.
//!
//! Every overflow segment owns exactly one backend. Backends are **opaque
//! append-only byte stores**: they know nothing about chunk framing or
//! message entities, which are interpreted by `msgstore_core`.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - Segments that live and die with the process
//! - [`FileBackend`] - One file per segment, survives restarts
//!
//! ## Example
//!
//! ```rust
//! use msgstore_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"chunk").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"chunk");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
