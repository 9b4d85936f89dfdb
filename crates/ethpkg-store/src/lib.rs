//! Content-addressed storage for ethpkg.
//!
//! This crate provides the storage layer: an on-disk `ObjectCache` keyed by
//! blake3 digest with atomic writes, the `ContentTransport` trait that pinning
//! backends implement, filesystem and in-memory transports, and the
//! `ContentStore` client that wraps a transport with content addressing,
//! verification on read, and deduplication by identifier.

pub mod client;
pub mod integrity;
pub mod layout;
pub mod objects;
pub mod transport;

pub use client::ContentStore;
pub use integrity::{verify_cache, IntegrityFailure, IntegrityReport};
pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use objects::ObjectCache;
pub use transport::{FsTransport, MemoryTransport};

use ethpkg_schema::{ContentUri, SchemaError};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Write `data` to `dest` through a temp file in the same directory, then
/// fsync the directory so the rename survives a crash.
pub(crate) fn write_atomic(dest: &Path, data: &[u8]) -> Result<(), StoreError> {
    let dir = dest
        .parent()
        .ok_or_else(|| StoreError::Transport(format!("no parent for {}", dest.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("integrity check failed for '{uri}': expected {expected}, got {actual}")]
    IntegrityFailure {
        uri: String,
        expected: String,
        actual: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Schema(#[from] SchemaError),
}

/// Byte-level pinning backend wrapped by [`ContentStore`].
///
/// Implementations are addressed by the caller-computed uri and need not
/// hash anything themselves. `put_bytes` must be idempotent.
pub trait ContentTransport: Send + Sync {
    fn put_bytes(&self, uri: &ContentUri, data: &[u8]) -> Result<(), StoreError>;

    /// `Ok(None)` when the transport has never seen `uri`.
    fn get_bytes(&self, uri: &ContentUri) -> Result<Option<Vec<u8>>, StoreError>;
}

impl<T: ContentTransport + ?Sized> ContentTransport for std::sync::Arc<T> {
    fn put_bytes(&self, uri: &ContentUri, data: &[u8]) -> Result<(), StoreError> {
        (**self).put_bytes(uri, data)
    }

    fn get_bytes(&self, uri: &ContentUri) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get_bytes(uri)
    }
}
