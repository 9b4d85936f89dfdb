use crate::collaborators::{ArtifactSource, DependencyRecord};
use crate::CoreError;
use ethpkg_schema::ContentUri;
use std::collections::BTreeSet;
use std::fs;

/// Differences between a dependency's recorded manifest sources and its tree on disk.
#[derive(Debug)]
pub struct DriftReport {
    pub package: String,
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub has_drift: bool,
}

impl DriftReport {
    /// Fail with an integrity error naming the first drifted path, if any.
    pub fn ensure_clean(&self) -> Result<(), CoreError> {
        let first = [
            (&self.modified, "source modified since its manifest was produced"),
            (&self.removed, "source removed since its manifest was produced"),
            (&self.added, "source added since its manifest was produced"),
        ]
        .into_iter()
        .find_map(|(paths, reason)| paths.first().map(|p| (p, reason)));

        match first {
            Some((path, reason)) => Err(CoreError::Integrity {
                package: self.package.clone(),
                path: path.clone(),
                reason: reason.to_owned(),
            }),
            None => Ok(()),
        }
    }
}

/// Compare every source recorded by `dep`'s manifest against the current file.
///
/// A dependency with no manifest has nothing recorded and never drifts.
pub fn check_drift(
    artifacts: &dyn ArtifactSource,
    dep: &DependencyRecord,
) -> Result<DriftReport, CoreError> {
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut removed = Vec::new();

    for recorded in &dep.recorded_sources {
        if !recorded.file.is_file() {
            removed.push(recorded.key.clone());
            continue;
        }
        let current = fs::read(&recorded.file)?;
        let matches = match ContentUri::parse(&recorded.recorded) {
            Ok(uri) => uri == ContentUri::for_bytes(&current),
            Err(_) => recorded.recorded.as_bytes() == current.as_slice(),
        };
        if !matches {
            modified.push(recorded.key.clone());
        }
    }

    if dep.manifest.is_some() {
        let known: BTreeSet<&str> = dep
            .recorded_sources
            .iter()
            .map(|r| r.key.as_str())
            .collect();
        for source in artifacts.source_files(&dep.path)? {
            if !known.contains(source.key.as_str()) {
                added.push(source.key);
            }
        }
    }

    added.sort();
    modified.sort();
    removed.sort();
    let has_drift = !added.is_empty() || !modified.is_empty() || !removed.is_empty();

    Ok(DriftReport {
        package: dep.name.clone(),
        added,
        modified,
        removed,
        has_drift,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CompiledContracts, RecordedSource, SourceFile};
    use ethpkg_schema::Manifest;
    use std::path::Path;

    struct Tree;

    impl ArtifactSource for Tree {
        fn source_files(&self, root: &Path) -> Result<Vec<SourceFile>, CoreError> {
            let mut files = Vec::new();
            for entry in fs::read_dir(root)? {
                let entry = entry?;
                files.push(SourceFile {
                    key: format!("./{}", entry.file_name().to_string_lossy()),
                    file: entry.path(),
                });
            }
            files.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(files)
        }

        fn contract_artifacts(&self, _root: &Path) -> Result<CompiledContracts, CoreError> {
            Ok(CompiledContracts::new())
        }
    }

    fn dep_with(dir: &Path, recorded: &[(&str, String)]) -> DependencyRecord {
        DependencyRecord {
            name: "utils".to_owned(),
            version: "1.0.0".to_owned(),
            path: dir.to_path_buf(),
            manifest: Some(Manifest::new("utils", "1.0.0")),
            uri: None,
            recorded_sources: recorded
                .iter()
                .map(|(name, value)| RecordedSource {
                    key: format!("./{name}"),
                    file: dir.join(name),
                    recorded: value.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn unchanged_sources_report_no_drift() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Arrays.sol"), "library Arrays {}").unwrap();
        let dep = dep_with(
            dir.path(),
            &[("Arrays.sol", ContentUri::for_bytes(b"library Arrays {}").to_string())],
        );
        let report = check_drift(&Tree, &dep).unwrap();
        assert!(!report.has_drift);
        report.ensure_clean().unwrap();
    }

    #[test]
    fn appended_newline_is_drift() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Arrays.sol"), "library Arrays {}\n").unwrap();
        let dep = dep_with(
            dir.path(),
            &[("Arrays.sol", ContentUri::for_bytes(b"library Arrays {}").to_string())],
        );
        let report = check_drift(&Tree, &dep).unwrap();
        assert_eq!(report.modified, vec!["./Arrays.sol"]);
        assert!(matches!(
            report.ensure_clean(),
            Err(CoreError::Integrity { ref path, .. }) if path == "./Arrays.sol"
        ));
    }

    #[test]
    fn inline_recorded_content_is_compared_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Math.sol"), "library Math {}").unwrap();
        let clean = dep_with(dir.path(), &[("Math.sol", "library Math {}".to_owned())]);
        assert!(!check_drift(&Tree, &clean).unwrap().has_drift);

        let stale = dep_with(dir.path(), &[("Math.sol", "library Math { }".to_owned())]);
        assert!(check_drift(&Tree, &stale).unwrap().has_drift);
    }

    #[test]
    fn removed_and_added_sources_are_drift() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("New.sol"), "contract New {}").unwrap();
        let dep = dep_with(dir.path(), &[("Gone.sol", "contract Gone {}".to_owned())]);
        let report = check_drift(&Tree, &dep).unwrap();
        assert_eq!(report.removed, vec!["./Gone.sol"]);
        assert_eq!(report.added, vec!["./New.sol"]);
    }

    #[test]
    fn dependency_without_manifest_never_drifts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Any.sol"), "contract Any {}").unwrap();
        let mut dep = dep_with(dir.path(), &[]);
        dep.manifest = None;
        assert!(!check_drift(&Tree, &dep).unwrap().has_drift);
    }
}
