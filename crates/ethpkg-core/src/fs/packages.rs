use super::{build_dir, contracts_dir, join_within, packages_dir};
use crate::collaborators::{DependencyRecord, DependencySource, RecordedSource};
use crate::CoreError;
use ethpkg_schema::{ContentUri, Manifest, SchemaError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MANIFEST_FILE: &str = "manifest.json";
const URI_FILE: &str = "manifest.uri";

/// Dependencies installed as `packages/<name>@<version>/`, declared in name order.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstalledPackages;

impl InstalledPackages {
    pub fn new() -> Self {
        Self
    }
}

fn split_dir_name(dir_name: &str) -> Option<(&str, &str)> {
    let (name, version) = dir_name.rsplit_once('@')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name, version))
}

/// Installed packages directly under `root`, by name.
fn installed(root: &Path) -> Result<BTreeMap<String, (String, PathBuf)>, CoreError> {
    let dir = packages_dir(root);
    let mut found = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(found);
    }
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let Some((name, version)) = split_dir_name(&dir_name) else {
            warn!("ignoring {}: not a <name>@<version> directory", path.display());
            continue;
        };
        if let Some((other, _)) = found.get(name) {
            warn!("ignoring {dir_name}: {name}@{other} is also installed");
            continue;
        }
        found.insert(name.to_owned(), (version.to_owned(), path));
    }
    Ok(found)
}

/// Where a key of `dep`'s manifest `sources` lives on disk.
///
/// Keys nested under an installed sub-dependency's name point into that
/// sub-dependency's tree; everything else is first-party. A key that would
/// resolve outside the package is rejected.
fn locate_source(
    name: &str,
    dep_path: &Path,
    nested: &BTreeMap<String, (String, PathBuf)>,
    key: &str,
) -> Result<PathBuf, CoreError> {
    let rel = key.strip_prefix("./").unwrap_or(key);
    let sub_dependency = rel
        .split_once('/')
        .and_then(|(head, rest)| nested.get(head).map(|(_, sub_path)| (sub_path, rest)));
    let (base, rel) = match sub_dependency {
        Some((sub_path, rest)) => (contracts_dir(sub_path), rest),
        None => (contracts_dir(dep_path), rel),
    };
    join_within(&base, rel).ok_or_else(|| {
        SchemaError::Validation(format!(
            "manifest of '{name}' lists source '{key}' outside the package"
        ))
        .into()
    })
}

fn read_record(name: &str, version: &str, path: PathBuf) -> Result<DependencyRecord, CoreError> {
    let build = build_dir(&path);

    let manifest_file = build.join(MANIFEST_FILE);
    let manifest = if manifest_file.is_file() {
        Some(Manifest::from_bytes(&fs::read(&manifest_file)?)?)
    } else {
        debug!("{name}@{version} has no manifest");
        None
    };

    let uri_file = build.join(URI_FILE);
    let uri = if uri_file.is_file() {
        Some(ContentUri::parse(fs::read_to_string(&uri_file)?.trim())?)
    } else {
        None
    };

    if let (Some(manifest), Some(uri)) = (&manifest, &uri) {
        if manifest.content_uri()? != *uri {
            return Err(CoreError::Integrity {
                package: name.to_owned(),
                path: format!("build/{MANIFEST_FILE}"),
                reason: format!("manifest does not hash to its recorded uri {uri}"),
            });
        }
    }

    let recorded_sources = match &manifest {
        Some(manifest) => {
            let nested = installed(&path)?;
            manifest
                .sources
                .iter()
                .map(|(key, recorded)| {
                    Ok(RecordedSource {
                        key: key.clone(),
                        file: locate_source(name, &path, &nested, key)?,
                        recorded: recorded.clone(),
                    })
                })
                .collect::<Result<Vec<_>, CoreError>>()?
        }
        None => Vec::new(),
    };

    Ok(DependencyRecord {
        name: name.to_owned(),
        version: version.to_owned(),
        path,
        manifest,
        uri,
        recorded_sources,
    })
}

impl DependencySource for InstalledPackages {
    fn list_dependencies(&self, root: &Path) -> Result<Vec<DependencyRecord>, CoreError> {
        installed(root)?
            .into_iter()
            .map(|(name, (version, path))| read_record(&name, &version, path))
            .collect()
    }
}
