use super::{build_dir, contracts_dir};
use crate::collaborators::{ArtifactSource, CompiledContracts, ContractArtifact, SourceFile};
use crate::CoreError;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Extensions of compilable source files.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["sol", "vy"];

/// Sources under `contracts/` and compiler output under `build/contracts/`.
///
/// Holds no state: every lookup reads the tree as it is on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectArtifacts;

impl ProjectArtifacts {
    pub fn new() -> Self {
        Self
    }

    fn load(root: &Path) -> Result<CompiledContracts, CoreError> {
        let dir = build_dir(root).join("contracts");
        let mut by_source = CompiledContracts::new();
        if !dir.is_dir() {
            debug!("no compiler output at {}", dir.display());
            return Ok(by_source);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        for file in files {
            let artifact: ContractArtifact = serde_json::from_slice(&fs::read(&file)?)?;
            match source_key(root, &artifact.source_path) {
                Some(key) => by_source.entry(key).or_default().push(artifact),
                None => debug!(
                    "{} is built from {}, outside contracts/",
                    artifact.contract_name, artifact.source_path
                ),
            }
        }
        Ok(by_source)
    }
}

/// Key of an artifact's `sourcePath`, which may be project-relative or absolute.
fn source_key(root: &Path, source_path: &str) -> Option<String> {
    let normalized = source_path.replace('\\', "/");
    let path = Path::new(&normalized);
    let rel = if path.is_absolute() {
        path.strip_prefix(contracts_dir(root)).ok()?
    } else {
        path.strip_prefix("contracts").ok()?
    };
    Some(format!("./{}", slash_path(rel)))
}

fn slash_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn walk_sources(base: &Path, current: &Path, out: &mut Vec<SourceFile>) -> Result<(), CoreError> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_sources(base, &path, out)?;
            continue;
        }
        let compilable = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
        if !compilable {
            continue;
        }
        let rel = path.strip_prefix(base).unwrap_or(&path);
        out.push(SourceFile {
            key: format!("./{}", slash_path(rel)),
            file: path.clone(),
        });
    }
    Ok(())
}

impl ArtifactSource for ProjectArtifacts {
    fn source_files(&self, root: &Path) -> Result<Vec<SourceFile>, CoreError> {
        let base = contracts_dir(root);
        let mut files = Vec::new();
        if base.is_dir() {
            walk_sources(&base, &base, &mut files)?;
        }
        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    fn contract_artifacts(&self, root: &Path) -> Result<CompiledContracts, CoreError> {
        Self::load(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn artifact(name: &str, source: &str) -> String {
        json!({
            "contractName": name,
            "sourcePath": source,
            "bytecode": "0x6080",
            "deployedBytecode": "0x6080",
            "abi": [],
            "compiler": {"version": "0.8.19", "optimize": true, "runs": 200, "evm_version": "paris"},
        })
        .to_string()
    }

    #[test]
    fn walks_nested_sources_only() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("contracts/Token.sol"), "contract Token {}");
        write(&dir.path().join("contracts/lib/Math.vy"), "# math");
        write(&dir.path().join("contracts/README.md"), "notes");

        let files = ProjectArtifacts::new().source_files(dir.path()).unwrap();
        let keys: Vec<&str> = files.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["./Token.sol", "./lib/Math.vy"]);
    }

    #[test]
    fn missing_contracts_dir_has_no_sources() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectArtifacts::new()
            .source_files(dir.path())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn artifacts_grouped_by_source_key() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build/contracts");
        write(&build.join("Token.json"), &artifact("Token", "contracts/Token.sol"));
        write(&build.join("TokenLib.json"), &artifact("TokenLib", "contracts/Token.sol"));
        write(&build.join("Math.json"), &artifact("Math", "contracts/lib/Math.sol"));

        let compiled = ProjectArtifacts::new().contract_artifacts(dir.path()).unwrap();
        assert_eq!(compiled["./Token.sol"].len(), 2);
        assert_eq!(compiled["./lib/Math.sol"][0].contract_name, "Math");
        assert!(!compiled.contains_key("./Other.sol"));
    }

    #[test]
    fn absolute_source_paths_are_keyed_relative_to_contracts() {
        let dir = tempfile::tempdir().unwrap();
        let abs = dir.path().join("contracts/Token.sol");
        write(
            &dir.path().join("build/contracts/Token.json"),
            &artifact("Token", &abs.to_string_lossy()),
        );
        let compiled = ProjectArtifacts::new().contract_artifacts(dir.path()).unwrap();
        assert_eq!(compiled["./Token.sol"].len(), 1);
    }

    #[test]
    fn rebuilt_artifact_is_seen_on_next_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("build/contracts/Token.json");
        write(&file, &artifact("Token", "contracts/Token.sol"));

        let source = ProjectArtifacts::new();
        let before = source.contract_artifacts(dir.path()).unwrap();
        assert_eq!(before["./Token.sol"][0].bytecode, "0x6080");

        let mut rebuilt: serde_json::Value =
            serde_json::from_str(&artifact("Token", "contracts/Token.sol")).unwrap();
        rebuilt["bytecode"] = json!("0x6080ffff");
        write(&file, &rebuilt.to_string());
        let after = source.contract_artifacts(dir.path()).unwrap();
        assert_eq!(after["./Token.sol"][0].bytecode, "0x6080ffff");
    }

    #[test]
    fn malformed_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("build/contracts/Broken.json"), "{not json");
        assert!(matches!(
            ProjectArtifacts::new().contract_artifacts(dir.path()),
            Err(CoreError::Serialization(_))
        ));
    }
}
