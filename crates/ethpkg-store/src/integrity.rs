use crate::layout::StoreLayout;
use crate::objects::ObjectCache;
use crate::StoreError;
use ethpkg_schema::{ContentUri, Digest};

/// Outcome of re-hashing a local object cache.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<IntegrityFailure>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct IntegrityFailure {
    /// File name under the objects directory.
    pub digest: String,
    pub reason: String,
}

/// Re-hash every cached object and report those whose content no longer
/// matches their name, plus any file that is not named by a digest at all.
///
/// A cache written by another format version is an error, not a report.
pub fn verify_cache(layout: &StoreLayout) -> Result<IntegrityReport, StoreError> {
    if layout.version_path().is_file() {
        layout.verify_version()?;
    }

    let cache = ObjectCache::new(layout.clone());
    let names = cache.list()?;
    let mut report = IntegrityReport::default();

    for name in names {
        report.checked += 1;
        if ContentUri::from_digest(Digest::new(name.as_str())).is_err() {
            report.failed.push(IntegrityFailure {
                digest: name,
                reason: "not a content object".to_owned(),
            });
            continue;
        }
        let reason = match cache.get(&name) {
            Ok(_) => {
                report.passed += 1;
                continue;
            }
            Err(StoreError::IntegrityFailure { actual, .. }) => {
                format!("content hashes to {actual}")
            }
            Err(e) => format!("unreadable: {e}"),
        };
        report.failed.push(IntegrityFailure {
            digest: name,
            reason,
        });
    }

    Ok(report)
}
