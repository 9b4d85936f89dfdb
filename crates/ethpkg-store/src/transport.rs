use crate::layout::StoreLayout;
use crate::objects::ObjectCache;
use crate::{ContentTransport, StoreError};
use ethpkg_schema::ContentUri;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Pins blobs into a shared directory, laid out like a local object cache.
pub struct FsTransport {
    objects: ObjectCache,
}

impl FsTransport {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let layout = StoreLayout::new(root);
        Ok(Self {
            objects: ObjectCache::open(layout)?,
        })
    }
}

impl ContentTransport for FsTransport {
    fn put_bytes(&self, uri: &ContentUri, data: &[u8]) -> Result<(), StoreError> {
        debug!("pinning {} bytes as {uri}", data.len());
        self.objects.put_bytes(uri, data)
    }

    fn get_bytes(&self, uri: &ContentUri) -> Result<Option<Vec<u8>>, StoreError> {
        self.objects.get_bytes(uri)
    }
}

/// In-process transport. Counts the puts that actually reached it.
#[derive(Default)]
pub struct MemoryTransport {
    blobs: Mutex<HashMap<ContentUri, Vec<u8>>>,
    puts: Mutex<usize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().map_or(0, |n| *n)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map_or(0, |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentTransport for MemoryTransport {
    fn put_bytes(&self, uri: &ContentUri, data: &[u8]) -> Result<(), StoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| StoreError::Transport(format!("mutex poisoned: {e}")))?;
        blobs.entry(uri.clone()).or_insert_with(|| data.to_vec());
        let mut puts = self
            .puts
            .lock()
            .map_err(|e| StoreError::Transport(format!("mutex poisoned: {e}")))?;
        *puts += 1;
        Ok(())
    }

    fn get_bytes(&self, uri: &ContentUri) -> Result<Option<Vec<u8>>, StoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| StoreError::Transport(format!("mutex poisoned: {e}")))?;
        Ok(blobs.get(uri).cloned())
    }
}
