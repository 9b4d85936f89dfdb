use crate::layout::StoreLayout;
use crate::{write_atomic, ContentTransport, StoreError};
use ethpkg_schema::{ContentUri, Digest};
use std::fs;

/// On-disk object cache keyed by blake3 digest.
///
/// Objects are stored as files named by their digest. Writes go through a
/// temp file and rename, and reads verify integrity by recomputing the hash.
#[derive(Debug, Clone)]
pub struct ObjectCache {
    layout: StoreLayout,
}

impl ObjectCache {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Open a cache rooted at `layout`, creating it if needed.
    pub fn open(layout: StoreLayout) -> Result<Self, StoreError> {
        layout.initialize()?;
        Ok(Self::new(layout))
    }

    /// Store data and return its digest. Existing objects are skipped.
    pub fn put(&self, data: &[u8]) -> Result<Digest, StoreError> {
        let digest = Digest::of(data);
        let dest = self.layout.object_path(&digest);
        if dest.exists() {
            return Ok(digest);
        }

        write_atomic(&dest, data)?;
        Ok(digest)
    }

    /// Retrieve data by digest, verifying integrity on read.
    pub fn get(&self, digest: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.layout.object_path(digest);
        if !path.exists() {
            return Err(StoreError::NotFound(digest.to_owned()));
        }
        let data = fs::read(&path)?;

        let actual = Digest::of(&data);
        if actual != digest {
            return Err(StoreError::IntegrityFailure {
                uri: digest.to_owned(),
                expected: digest.to_owned(),
                actual: actual.into_inner(),
            });
        }
        Ok(data)
    }

    pub fn exists(&self, digest: &str) -> bool {
        self.layout.object_path(digest).exists()
    }

    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.objects_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut digests = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    digests.push(name.to_owned());
                }
            }
        }
        digests.sort();
        Ok(digests)
    }
}

impl ContentTransport for ObjectCache {
    fn put_bytes(&self, uri: &ContentUri, data: &[u8]) -> Result<(), StoreError> {
        let digest = self.put(data)?;
        if digest != *uri.digest() {
            return Err(StoreError::IntegrityFailure {
                uri: uri.to_string(),
                expected: uri.digest().to_string(),
                actual: digest.into_inner(),
            });
        }
        Ok(())
    }

    fn get_bytes(&self, uri: &ContentUri) -> Result<Option<Vec<u8>>, StoreError> {
        match self.get(uri.digest()) {
            Ok(data) => Ok(Some(data)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache() -> (tempfile::TempDir, ObjectCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ObjectCache::open(StoreLayout::new(dir.path())).unwrap();
        (dir, cache)
    }

    #[test]
    fn put_and_get_roundtrip() {
        let (_dir, cache) = test_cache();
        let digest = cache.put(b"contract Token {}").unwrap();
        assert_eq!(cache.get(&digest).unwrap(), b"contract Token {}");
    }

    #[test]
    fn put_is_idempotent() {
        let (_dir, cache) = test_cache();
        let d1 = cache.put(b"hello").unwrap();
        let d2 = cache.put(b"hello").unwrap();
        assert_eq!(d1, d2);
        assert_eq!(cache.list().unwrap().len(), 1);
    }

    #[test]
    fn get_nonexistent_is_not_found() {
        let (_dir, cache) = test_cache();
        assert!(matches!(
            cache.get("nonexistent"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn integrity_check_on_read() {
        let (dir, cache) = test_cache();
        let digest = cache.put(b"test data").unwrap();
        fs::write(
            StoreLayout::new(dir.path()).object_path(&digest),
            b"corrupted",
        )
        .unwrap();
        assert!(matches!(
            cache.get(&digest),
            Err(StoreError::IntegrityFailure { .. })
        ));
    }

    #[test]
    fn exists_after_put() {
        let (_dir, cache) = test_cache();
        let digest = Digest::of(b"data");
        assert!(!cache.exists(&digest));
        cache.put(b"data").unwrap();
        assert!(cache.exists(&digest));
    }

    #[test]
    fn put_empty_data() {
        let (_dir, cache) = test_cache();
        let digest = cache.put(b"").unwrap();
        assert!(cache.get(&digest).unwrap().is_empty());
    }

    #[test]
    fn transport_get_of_unknown_uri_is_none() {
        let (_dir, cache) = test_cache();
        let uri = ContentUri::for_bytes(b"never stored");
        assert!(cache.get_bytes(&uri).unwrap().is_none());
    }

    #[test]
    fn transport_put_rejects_mismatched_uri() {
        let (_dir, cache) = test_cache();
        let uri = ContentUri::for_bytes(b"one thing");
        assert!(cache.put_bytes(&uri, b"another thing").is_err());
    }
}
