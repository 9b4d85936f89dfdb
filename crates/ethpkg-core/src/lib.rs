//! Manifest assembly engine for ethpkg.
//!
//! This crate ties the schema and store layers together into the `Assembler`,
//! which collects a project's sources and compiled contract types, resolves
//! nested package dependencies (inlining or referencing them after verifying
//! they have not drifted from their own manifests), matches live deployments
//! per network, and optionally pins the finished manifest. Collaborators that
//! know about the on-disk project layout and live networks are injected as
//! traits; `fs` provides implementations for the conventional layout.

pub mod assemble;
pub mod collaborators;
pub mod collect;
pub mod deployments;
pub mod drift;
pub mod fs;
pub mod resolve;

pub use assemble::{fetch_manifest, Assembler, BuildResult};
pub use collaborators::{
    ArtifactCompiler, ArtifactSource, CompiledContracts, ContractArtifact, DependencyRecord,
    DependencySource, DeploymentRecord, NetworkRegistry, RecordedSource, SourceFile,
};
pub use collect::{collect, CollectedSource};
pub use deployments::{match_deployments, DeploymentMatch};
pub use drift::{check_drift, DriftReport};
pub use resolve::{ReferencedDependency, Resolution, Resolver};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Schema(#[from] ethpkg_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] ethpkg_store::StoreError),
    #[error("dependency '{package}' has drifted from its manifest at {path}: {reason}")]
    Integrity {
        package: String,
        path: String,
        reason: String,
    },
    #[error("contract type '{name}' is declared by both '{first}' and '{second}'")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },
    #[error("source '{key}' is provided by both '{first}' and '{second}'")]
    SourceCollision {
        key: String,
        first: String,
        second: String,
    },
    #[error("collaborator error: {0}")]
    Collaborator(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to parse network table: {0}")]
    NetworkTable(#[from] toml::de::Error),
}
