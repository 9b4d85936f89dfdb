use crate::objects::ObjectCache;
use crate::{ContentTransport, StoreError};
use ethpkg_schema::{ContentUri, Digest};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Content-addressing client over a [`ContentTransport`].
///
/// `put` derives the uri from the bytes, so identical bytes always map to the
/// same uri. Identifiers already pinned through this client, or present in the
/// optional local cache, are never sent to the transport again. `get` verifies
/// that the returned bytes hash back to the requested uri.
pub struct ContentStore {
    transport: Box<dyn ContentTransport>,
    cache: Option<ObjectCache>,
    pinned: Mutex<HashSet<Digest>>,
}

impl ContentStore {
    pub fn new(transport: impl ContentTransport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            cache: None,
            pinned: Mutex::new(HashSet::new()),
        }
    }

    /// Keep a local copy of every blob pinned or fetched through this client.
    #[must_use]
    pub fn with_cache(mut self, cache: ObjectCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn put(&self, data: &[u8]) -> Result<ContentUri, StoreError> {
        let uri = ContentUri::for_bytes(data);
        if self.already_pinned(&uri)? {
            debug!("{uri} already pinned, skipping transport");
            return Ok(uri);
        }

        self.transport.put_bytes(&uri, data)?;
        if let Some(cache) = &self.cache {
            cache.put(data)?;
        }
        self.mark_pinned(&uri)?;
        Ok(uri)
    }

    pub fn get(&self, uri: &ContentUri) -> Result<Vec<u8>, StoreError> {
        if let Some(cache) = &self.cache {
            match cache.get(uri.digest()) {
                Ok(data) => return Ok(data),
                Err(StoreError::NotFound(_)) => {}
                Err(e) => warn!("ignoring unusable cached copy of {uri}: {e}"),
            }
        }

        let data = self
            .transport
            .get_bytes(uri)?
            .ok_or_else(|| StoreError::NotFound(uri.to_string()))?;

        let actual = Digest::of(&data);
        if actual != *uri.digest() {
            return Err(StoreError::IntegrityFailure {
                uri: uri.to_string(),
                expected: uri.digest().to_string(),
                actual: actual.into_inner(),
            });
        }

        if let Some(cache) = &self.cache {
            cache.put(&data)?;
        }
        self.mark_pinned(uri)?;
        Ok(data)
    }

    /// Parse `uri` and fetch it.
    pub fn get_str(&self, uri: &str) -> Result<Vec<u8>, StoreError> {
        self.get(&ContentUri::parse(uri)?)
    }

    fn already_pinned(&self, uri: &ContentUri) -> Result<bool, StoreError> {
        let pinned = self
            .pinned
            .lock()
            .map_err(|e| StoreError::Transport(format!("mutex poisoned: {e}")))?;
        if pinned.contains(uri.digest()) {
            return Ok(true);
        }
        Ok(self
            .cache
            .as_ref()
            .is_some_and(|cache| cache.exists(uri.digest())))
    }

    fn mark_pinned(&self, uri: &ContentUri) -> Result<(), StoreError> {
        self.pinned
            .lock()
            .map_err(|e| StoreError::Transport(format!("mutex poisoned: {e}")))?
            .insert(uri.digest().clone());
        Ok(())
    }
}
