use crate::SchemaError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Top-level keys that must be present and non-null.
const REQUIRED_FIELDS: [&str; 3] = ["package_name", "version", "settings"];
const MAX_PACKAGE_NAME_LEN: usize = 255;
const WILDCARD: &str = "*";

/// Validated package configuration driving one manifest build.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageConfig {
    pub package_name: String,
    pub version: String,
    pub settings: Settings,
    /// Raw metadata, normalized at assembly time.
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub deployment_networks: NetworkSelection,
    #[serde(default)]
    pub include_dependencies: bool,
}

/// Which networks to collect deployments from.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Option<RawSelection>")]
pub enum NetworkSelection {
    /// `false` or absent: no deployments section.
    #[default]
    Skip,
    /// `"*"`: every network with recorded deployments.
    All,
    Named(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

impl TryFrom<Option<RawSelection>> for NetworkSelection {
    type Error = String;

    fn try_from(raw: Option<RawSelection>) -> Result<Self, Self::Error> {
        match raw {
            None | Some(RawSelection::Flag(false)) => Ok(Self::Skip),
            Some(RawSelection::Flag(true)) => Err(
                "deployment_networks must be false, \"*\", a network name, or a list of names"
                    .to_owned(),
            ),
            Some(RawSelection::One(name)) if name == WILDCARD => Ok(Self::All),
            Some(RawSelection::One(name)) => Ok(Self::Named(vec![name])),
            Some(RawSelection::Many(names)) if names.iter().any(|n| n == WILDCARD) => {
                Ok(Self::All)
            }
            Some(RawSelection::Many(names)) => Ok(Self::Named(names)),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPackageConfig {
    package_name: String,
    version: String,
    settings: Settings,
    #[serde(default)]
    meta: Option<Map<String, Value>>,
}

impl PackageConfig {
    /// Config with default settings and no metadata.
    pub fn new(package_name: &str, version: &str) -> Result<Self, SchemaError> {
        validate_package_name(package_name)?;
        validate_version(version)?;
        Ok(Self {
            package_name: package_name.to_owned(),
            version: version.to_owned(),
            settings: Settings::default(),
            meta: Map::new(),
        })
    }

    /// Validate a loosely-typed config mapping.
    ///
    /// Missing or null required fields are reported before anything else is
    /// looked at, so a config with several problems always fails the same way.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let Value::Object(map) = &value else {
            return Err(SchemaError::Validation(
                "package config must be a mapping".to_owned(),
            ));
        };
        for field in REQUIRED_FIELDS {
            if let None | Some(Value::Null) = map.get(field) {
                return Err(SchemaError::MissingField(field.to_owned()));
            }
        }

        let raw: RawPackageConfig = serde_json::from_value(value)?;
        validate_package_name(&raw.package_name)?;
        validate_version(&raw.version)?;

        Ok(Self {
            package_name: raw.package_name,
            version: raw.version,
            settings: raw.settings,
            meta: raw.meta.unwrap_or_default(),
        })
    }
}

/// Package names are lowercase letters, digits, and hyphens, starting with a letter.
pub fn validate_package_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() || name.len() > MAX_PACKAGE_NAME_LEN {
        return Err(SchemaError::Validation(format!(
            "package name must be 1-{MAX_PACKAGE_NAME_LEN} characters"
        )));
    }
    let starts_with_letter = name.bytes().next().is_some_and(|b| b.is_ascii_lowercase());
    let allowed = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if !starts_with_letter || !allowed {
        return Err(SchemaError::Validation(format!(
            "invalid package name '{name}': must match [a-z][a-z0-9-]*"
        )));
    }
    Ok(())
}

pub fn validate_version(version: &str) -> Result<(), SchemaError> {
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|e| SchemaError::Validation(format!("invalid version '{version}': {e}")))
}

/// Parse a package config from JSON text.
pub fn parse_config_str(input: &str) -> Result<PackageConfig, SchemaError> {
    PackageConfig::from_value(serde_json::from_str(input)?)
}

/// Load a package config from a `.toml` or `.json` file.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<PackageConfig, SchemaError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        let value: Value = toml::from_str(&content)?;
        PackageConfig::from_value(value)
    } else {
        parse_config_str(&content)
    }
}
