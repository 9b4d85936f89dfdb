//! Interfaces to the systems the assembler reads from but does not own: the
//! compiler's artifact cache, the installed-dependency layout, and the
//! network client.

use crate::CoreError;
use ethpkg_schema::{
    Bytecode, CompilerInfo, CompilerSettings, ContentUri, ContractTypeRecord, Digest, Manifest,
    NetworkUri, OptimizerSettings,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source key to the contracts compiled from that source.
pub type CompiledContracts = HashMap<String, Vec<ContractArtifact>>;

/// A source file of a project, keyed the way it appears in `sources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// `./`-prefixed path relative to the project's source tree.
    pub key: String,
    pub file: PathBuf,
}

/// One compiled contract as recorded by the compiler's artifact cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub source_path: String,
    pub bytecode: String,
    pub deployed_bytecode: String,
    #[serde(default)]
    pub abi: Vec<serde_json::Value>,
    pub compiler: ArtifactCompiler,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactCompiler {
    pub version: String,
    pub optimize: bool,
    pub runs: u32,
    pub evm_version: String,
}

impl ContractArtifact {
    fn compiler_name(&self) -> &'static str {
        let vyper = self
            .language
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case("vyper"))
            || Path::new(&self.source_path)
                .extension()
                .is_some_and(|ext| ext == "vy");
        if vyper {
            "vyper"
        } else {
            "solc"
        }
    }

    /// Manifest form of this artifact, attributed to the source keyed `source_key`.
    pub fn to_contract_type(&self, source_key: &str) -> ContractTypeRecord {
        ContractTypeRecord {
            contract_name: self.contract_name.clone(),
            source_path: source_key.to_owned(),
            deployment_bytecode: Bytecode::from_hex(&self.bytecode),
            runtime_bytecode: Bytecode::from_hex(&self.deployed_bytecode),
            abi: self.abi.clone(),
            compiler: CompilerInfo {
                name: self.compiler_name().to_owned(),
                version: self.compiler.version.clone(),
                settings: CompilerSettings {
                    optimizer: OptimizerSettings {
                        enabled: self.compiler.optimize,
                        runs: self.compiler.runs,
                    },
                    evm_version: self.compiler.evm_version.clone(),
                },
            },
        }
    }
}

/// Compiler output lookup for a project tree.
pub trait ArtifactSource {
    /// Every compilable source under `root`, ordered by key.
    fn source_files(&self, root: &Path) -> Result<Vec<SourceFile>, CoreError>;

    /// Compiled contracts of `root` as they are now, grouped by the key of
    /// the source each was built from. Sources with no artifact are absent.
    fn contract_artifacts(&self, root: &Path) -> Result<CompiledContracts, CoreError>;
}

/// A source recorded in a dependency's manifest, located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSource {
    pub key: String,
    pub file: PathBuf,
    /// Content uri, or inline source text, as the manifest recorded it.
    pub recorded: String,
}

/// An installed dependency and the build state it was installed with.
#[derive(Debug, Clone)]
pub struct DependencyRecord {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub manifest: Option<Manifest>,
    pub uri: Option<ContentUri>,
    pub recorded_sources: Vec<RecordedSource>,
}

/// Declared dependencies of a project tree.
pub trait DependencySource {
    /// Dependencies of `root` in declaration order.
    fn list_dependencies(&self, root: &Path) -> Result<Vec<DependencyRecord>, CoreError>;
}

/// A live instance recorded at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub contract_type: String,
    /// Digest of the deployment bytecode, see [`ethpkg_schema::bytecode_digest`].
    pub bytecode_digest: Digest,
}

/// Network identity and per-network deployment records.
pub trait NetworkRegistry {
    /// Canonical uri of `network`, `None` when the network is unknown.
    fn genesis_uri(&self, network: &str) -> Result<Option<NetworkUri>, CoreError>;

    /// Networks with at least one recorded deployment for `root`.
    fn deployment_networks(&self, root: &Path) -> Result<Vec<String>, CoreError>;

    /// `(address, record)` pairs in discovery order.
    fn deployment_records(
        &self,
        root: &Path,
        network: &str,
    ) -> Result<Vec<(String, DeploymentRecord)>, CoreError>;
}
