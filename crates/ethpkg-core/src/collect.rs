use crate::collaborators::ArtifactSource;
use crate::CoreError;
use ethpkg_schema::{ContentUri, ContractTypeRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A source file with its content digest and the contract types compiled from it.
#[derive(Debug, Clone)]
pub struct CollectedSource {
    pub key: String,
    pub file: PathBuf,
    /// Content uri of the file's bytes at collection time.
    pub digest: ContentUri,
    pub content: Vec<u8>,
    pub contract_types: Vec<ContractTypeRecord>,
}

impl CollectedSource {
    /// `sources` value: the inline source text, or the content uri when
    /// sources are pinned alongside the manifest. Content that is not UTF-8
    /// cannot be inlined and is always recorded by uri.
    pub fn manifest_entry(&self, by_reference: bool) -> String {
        match std::str::from_utf8(&self.content) {
            Ok(text) if !by_reference => text.to_owned(),
            _ => self.digest.to_string(),
        }
    }

    /// Re-key under `./<package>/` for inlining into another package.
    #[must_use]
    pub fn nest_under(mut self, package: &str) -> Self {
        self.key = nested_key(package, &self.key);
        for ty in &mut self.contract_types {
            ty.source_path = nested_key(package, &ty.source_path);
        }
        self
    }
}

fn nested_key(package: &str, key: &str) -> String {
    let rest = key.strip_prefix("./").unwrap_or(key);
    format!("./{package}/{rest}")
}

/// Enumerate the sources under `root` and the contract types built from each.
///
/// Sources without a compiled artifact are still returned, with no types.
pub fn collect(
    artifacts: &dyn ArtifactSource,
    root: &Path,
) -> Result<Vec<CollectedSource>, CoreError> {
    let compiled = artifacts.contract_artifacts(root)?;
    let mut collected = Vec::new();
    for source in artifacts.source_files(root)? {
        let content = fs::read(&source.file)?;
        let contract_types: Vec<ContractTypeRecord> = compiled
            .get(&source.key)
            .into_iter()
            .flatten()
            .map(|a| a.to_contract_type(&source.key))
            .collect();
        if contract_types.is_empty() {
            debug!("{} has no compiled artifact", source.key);
        }
        if std::str::from_utf8(&content).is_err() {
            warn!("{} is not UTF-8 text, recording it by content uri", source.key);
        }
        collected.push(CollectedSource {
            digest: ContentUri::for_bytes(&content),
            key: source.key,
            file: source.file,
            content,
            contract_types,
        });
    }
    collected.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(collected)
}
