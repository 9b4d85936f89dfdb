use crate::{write_atomic, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current store format version. Incremented on incompatible layout changes.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Where a local ethpkg store keeps its pinned sources and manifests.
///
/// ```text
/// <root>/store/version           {"format_version": 1}
/// <root>/store/objects/<digest>  raw bytes, named by blake3 hex digest
/// ```
///
/// Nothing is created until [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct VersionStamp {
    format_version: u32,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.store_dir().join("objects")
    }

    pub fn object_path(&self, digest: &str) -> PathBuf {
        self.objects_dir().join(digest)
    }

    pub fn version_path(&self) -> PathBuf {
        self.store_dir().join("version")
    }

    /// Create the object directory and stamp a fresh store with the current
    /// format version. An existing stamp must match.
    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.objects_dir())?;
        if self.version_path().is_file() {
            return self.verify_version();
        }
        let stamp = serde_json::to_vec_pretty(&VersionStamp {
            format_version: STORE_FORMAT_VERSION,
        })?;
        write_atomic(&self.version_path(), &stamp)
    }

    pub fn verify_version(&self) -> Result<(), StoreError> {
        let stamp: VersionStamp = serde_json::from_slice(&fs::read(self.version_path())?)?;
        match stamp.format_version {
            STORE_FORMAT_VERSION => Ok(()),
            found => Err(StoreError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found,
            }),
        }
    }
}
