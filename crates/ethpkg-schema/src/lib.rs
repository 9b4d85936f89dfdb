//! Manifest model, package configuration, and canonical hashing for ethpkg.
//!
//! This crate defines the schema layer: the on-wire package manifest
//! (`Manifest`, `ContractTypeRecord`), validated package configuration
//! (`PackageConfig`), metadata normalization (`normalize_meta`), content
//! identifiers (`ContentUri`), and the canonical serialization that every
//! hash and pin is computed over (`canonical_bytes`).

pub mod canonical;
pub mod config;
pub mod manifest;
pub mod normalize;
pub mod types;

pub use canonical::{bytecode_digest, canonical_bytes};
pub use config::{
    parse_config_file, parse_config_str, validate_package_name, validate_version,
    NetworkSelection, PackageConfig, Settings,
};
pub use manifest::{
    Bytecode, CompilerInfo, CompilerSettings, ContractTypeRecord, DeploymentInstance, Manifest,
    Meta, OptimizerSettings, MANIFEST_VERSION,
};
pub use normalize::normalize_meta;
pub use types::{ContentUri, Digest, NetworkUri, CONTENT_URI_SCHEME};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid package config: {0}")]
    Validation(String),
    #[error("invalid content uri: {0}")]
    InvalidUri(String),
    #[error("failed to read package config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse package config: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("failed to parse package config: {0}")]
    ParseToml(#[from] toml::de::Error),
}
