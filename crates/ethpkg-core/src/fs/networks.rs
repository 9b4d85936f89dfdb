use super::{build_dir, join_within};
use crate::collaborators::{DeploymentRecord, NetworkRegistry};
use crate::CoreError;
use ethpkg_schema::{bytecode_digest, NetworkUri, SchemaError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Genesis and reference block hashes of one named network.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkEntry {
    pub genesis_hash: String,
    pub block_hash: String,
}

impl NetworkEntry {
    /// `blockchain://<genesis>/block/<block>`, hashes lowercase without `0x`.
    pub fn uri(&self) -> NetworkUri {
        NetworkUri::new(format!(
            "blockchain://{}/block/{}",
            bare_hex(&self.genesis_hash),
            bare_hex(&self.block_hash)
        ))
    }
}

fn bare_hex(hash: &str) -> String {
    let trimmed = hash.trim();
    trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Network name to identity, loaded from a `networks.toml` table.
///
/// ```toml
/// [mainnet]
/// genesis_hash = "0xd4e5..."
/// block_hash = "0x88e9..."
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct NetworkTable {
    networks: BTreeMap<String, NetworkEntry>,
}

impl NetworkTable {
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(input)?)
    }

    /// Load from `path`; a missing file is an empty table.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.is_file() {
            debug!("no network table at {}", path.display());
            return Ok(Self::default());
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn get(&self, name: &str) -> Option<&NetworkEntry> {
        self.networks.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFile {
    contract_name: String,
    bytecode: String,
}

/// Deployment records under `build/deployments/<network>/<address>.json`,
/// classified through a [`NetworkTable`].
#[derive(Debug, Clone, Default)]
pub struct ProjectNetworks {
    table: NetworkTable,
}

impl ProjectNetworks {
    pub fn new(table: NetworkTable) -> Self {
        Self { table }
    }

    fn deployments_dir(root: &Path) -> PathBuf {
        build_dir(root).join("deployments")
    }

    fn record_files(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

impl NetworkRegistry for ProjectNetworks {
    fn genesis_uri(&self, network: &str) -> Result<Option<NetworkUri>, CoreError> {
        Ok(self.table.get(network).map(NetworkEntry::uri))
    }

    fn deployment_networks(&self, root: &Path) -> Result<Vec<String>, CoreError> {
        let dir = Self::deployments_dir(root);
        let mut names = Vec::new();
        if !dir.is_dir() {
            return Ok(names);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !Self::record_files(&entry.path())?.is_empty() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn deployment_records(
        &self,
        root: &Path,
        network: &str,
    ) -> Result<Vec<(String, DeploymentRecord)>, CoreError> {
        let dir = join_within(&Self::deployments_dir(root), network).ok_or_else(|| {
            SchemaError::Validation(format!("network name '{network}' is not a plain name"))
        })?;
        let mut records = Vec::new();
        for file in Self::record_files(&dir)? {
            let Some(address) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let raw: RecordFile = match serde_json::from_slice(&fs::read(&file)?) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("skipping unreadable deployment record {}: {e}", file.display());
                    continue;
                }
            };
            records.push((
                address,
                DeploymentRecord {
                    contract_type: raw.contract_name,
                    bytecode_digest: bytecode_digest(&raw.bytecode),
                },
            ));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
[mainnet]
genesis_hash = "0xD4E56740F876AEF8C010B86A40D5F56745A118D0906A34E69AEC8C0DB1CB8FA3"
block_hash = "0x88e96d4537bea4d9c05d12549907b32561d3bf31f45aae734cdc119f13406cb6"

[ropsten]
genesis_hash = "41941023680923e0fe4d74a34bdac8141f2540e3ae90623718e47d66d1ca4a2d"
block_hash = "41941023680923e0fe4d74a34bdac8141f2540e3ae90623718e47d66d1ca4a2d"
"#;

    #[test]
    fn uri_is_lowercase_without_prefix() {
        let table = NetworkTable::parse(TABLE).unwrap();
        assert_eq!(
            table.get("mainnet").unwrap().uri(),
            "blockchain://d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3/block/88e96d4537bea4d9c05d12549907b32561d3bf31f45aae734cdc119f13406cb6"
        );
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["mainnet", "ropsten"]);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = NetworkTable::parse("[mainnet]\ngenesis = \"00\"\n").unwrap_err();
        assert!(matches!(err, CoreError::NetworkTable(_)));
    }

    #[test]
    fn missing_table_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = NetworkTable::load(&dir.path().join("networks.toml")).unwrap();
        assert_eq!(table, NetworkTable::default());
    }

    #[test]
    fn records_read_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let net = dir.path().join("build/deployments/mainnet");
        fs::create_dir_all(&net).unwrap();
        fs::create_dir_all(dir.path().join("build/deployments/empty")).unwrap();
        for (addr, name) in [("0xbb", "Foo"), ("0xaa", "Foo")] {
            fs::write(
                net.join(format!("{addr}.json")),
                format!(r#"{{"contractName": "{name}", "bytecode": "0x6080"}}"#),
            )
            .unwrap();
        }

        let networks = ProjectNetworks::new(NetworkTable::parse(TABLE).unwrap());
        assert_eq!(networks.deployment_networks(dir.path()).unwrap(), vec!["mainnet"]);

        let records = networks.deployment_records(dir.path(), "mainnet").unwrap();
        assert_eq!(records[0].0, "0xaa");
        assert_eq!(records[1].0, "0xbb");
        assert_eq!(records[0].1.bytecode_digest, bytecode_digest("6080"));
        assert!(networks
            .deployment_records(dir.path(), "nosuchnet")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unparsable_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let net = dir.path().join("build/deployments/mainnet");
        fs::create_dir_all(&net).unwrap();
        fs::write(net.join("0xaa.json"), "{broken").unwrap();
        fs::write(
            net.join("0xbb.json"),
            r#"{"contractName": "Token", "bytecode": "0x6080"}"#,
        )
        .unwrap();

        let networks = ProjectNetworks::default();
        let records = networks.deployment_records(dir.path(), "mainnet").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "0xbb");
    }

    #[test]
    fn network_name_cannot_leave_deployments_dir() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(
            outside.join("0xaa.json"),
            r#"{"contractName": "Token", "bytecode": "0x6080"}"#,
        )
        .unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(root.join("build/deployments")).unwrap();

        let networks = ProjectNetworks::default();
        for name in ["../../outside", "/etc"] {
            assert!(matches!(
                networks.deployment_records(&root, name),
                Err(CoreError::Schema(SchemaError::Validation(_)))
            ));
        }
    }

    #[test]
    fn unknown_network_has_no_uri() {
        let networks = ProjectNetworks::new(NetworkTable::default());
        assert!(networks.genesis_uri("mainnet").unwrap().is_none());
    }
}
