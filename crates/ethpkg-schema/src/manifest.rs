use crate::canonical::{bytecode_digest, canonical_bytes};
use crate::types::{ContentUri, Digest, NetworkUri};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed `manifest_version` of every manifest this crate produces.
pub const MANIFEST_VERSION: &str = "2";

/// Normalized, open-schema package metadata (`description`, `authors`, ...).
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Content-addressable package manifest.
///
/// Every optional section is omitted from the serialized form when empty, so
/// a manifest without dependencies has no `build_dependencies` key at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub manifest_version: String,
    pub package_name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Meta,
    /// Relative source path to a content uri, or to the inline source text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contract_types: BTreeMap<String, ContractTypeRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_dependencies: BTreeMap<String, ContentUri>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deployments: BTreeMap<NetworkUri, BTreeMap<String, DeploymentInstance>>,
}

impl Manifest {
    pub fn new(package_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            manifest_version: MANIFEST_VERSION.to_owned(),
            package_name: package_name.into(),
            version: version.into(),
            meta: Meta::new(),
            sources: BTreeMap::new(),
            contract_types: BTreeMap::new(),
            build_dependencies: BTreeMap::new(),
            deployments: BTreeMap::new(),
        }
    }

    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        canonical_bytes(self)
    }

    /// The uri this manifest is stored under once pinned.
    pub fn content_uri(&self) -> Result<ContentUri, serde_json::Error> {
        Ok(ContentUri::for_bytes(&self.canonical_bytes()?))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractTypeRecord {
    pub contract_name: String,
    pub source_path: String,
    pub deployment_bytecode: Bytecode,
    pub runtime_bytecode: Bytecode,
    pub abi: Vec<serde_json::Value>,
    pub compiler: CompilerInfo,
}

impl ContractTypeRecord {
    /// Digest of the deployment bytecode, compared against deployment records.
    pub fn deployment_digest(&self) -> Digest {
        bytecode_digest(&self.deployment_bytecode.bytecode)
    }
}

/// `0x`-prefixed lowercase hex bytecode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bytecode {
    pub bytecode: String,
}

impl Bytecode {
    /// Accepts hex with or without a `0x` prefix, in any case.
    pub fn from_hex(raw: &str) -> Self {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        Self {
            bytecode: format!("0x{}", body.to_ascii_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilerInfo {
    pub name: String,
    pub version: String,
    pub settings: CompilerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilerSettings {
    pub optimizer: OptimizerSettings,
    #[serde(rename = "evmVersion")]
    pub evm_version: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

/// A live contract instance on one network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentInstance {
    pub address: String,
    /// Bare type name, or `dependency:Type` for a referenced dependency's type.
    pub contract_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_type(name: &str) -> ContractTypeRecord {
        ContractTypeRecord {
            contract_name: name.to_owned(),
            source_path: format!("./{name}.sol"),
            deployment_bytecode: Bytecode::from_hex("6080AABB"),
            runtime_bytecode: Bytecode::from_hex("0x6080"),
            abi: vec![serde_json::json!({"type": "constructor", "inputs": []})],
            compiler: CompilerInfo {
                name: "solc".to_owned(),
                version: "0.8.19+commit.7dd6d404".to_owned(),
                settings: CompilerSettings {
                    optimizer: OptimizerSettings {
                        enabled: true,
                        runs: 200,
                    },
                    evm_version: "paris".to_owned(),
                },
            },
        }
    }

    #[test]
    fn bytecode_is_prefixed_and_lowercased() {
        assert_eq!(Bytecode::from_hex("ABCD").bytecode, "0xabcd");
        assert_eq!(Bytecode::from_hex("0XAbCd").bytecode, "0xabcd");
        assert_eq!(Bytecode::from_hex("").bytecode, "0x");
    }

    #[test]
    fn empty_sections_are_omitted() {
        let manifest = Manifest::new("testpackage", "1.0.0");
        let value = serde_json::to_value(&manifest).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["manifest_version"], "2");
        assert!(!obj.contains_key("build_dependencies"));
        assert!(!obj.contains_key("deployments"));
        assert!(!obj.contains_key("meta"));
    }

    #[test]
    fn compiler_settings_use_wire_names() {
        let value = serde_json::to_value(sample_type("Token")).unwrap();
        assert_eq!(value["compiler"]["settings"]["evmVersion"], "paris");
        assert_eq!(value["compiler"]["settings"]["optimizer"]["runs"], 200);
        assert_eq!(value["deployment_bytecode"]["bytecode"], "0x6080aabb");
    }

    #[test]
    fn content_uri_tracks_content() {
        let mut a = Manifest::new("testpackage", "1.0.0");
        let b = a.clone();
        assert_eq!(a.content_uri().unwrap(), b.content_uri().unwrap());

        a.contract_types
            .insert("Token".to_owned(), sample_type("Token"));
        assert_ne!(a.content_uri().unwrap(), b.content_uri().unwrap());
    }

    #[test]
    fn from_bytes_reads_canonical_form() {
        let mut manifest = Manifest::new("testpackage", "1.0.0");
        manifest
            .sources
            .insert("./Token.sol".to_owned(), "contract Token {}".to_owned());
        let bytes = manifest.canonical_bytes().unwrap();
        assert_eq!(Manifest::from_bytes(&bytes).unwrap(), manifest);
    }

    #[test]
    fn deployment_digest_ignores_hex_case() {
        let mut upper = sample_type("Token");
        upper.deployment_bytecode = Bytecode {
            bytecode: "0x6080AABB".to_owned(),
        };
        assert_eq!(
            upper.deployment_digest(),
            sample_type("Token").deployment_digest()
        );
    }
}
