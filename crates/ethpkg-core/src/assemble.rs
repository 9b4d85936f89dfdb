use crate::collaborators::{ArtifactSource, DependencySource, NetworkRegistry};
use crate::deployments::match_deployments;
use crate::fs::{InstalledPackages, NetworkTable, ProjectArtifacts, ProjectNetworks};
use crate::resolve::{Resolution, Resolver};
use crate::CoreError;
use ethpkg_schema::{
    normalize_meta, ContentUri, Manifest, PackageConfig, SchemaError, MANIFEST_VERSION,
};
use ethpkg_store::ContentStore;
use std::path::Path;
use tracing::{debug, info};

/// Builds package manifests from a project tree.
///
/// Each call to [`Assembler::create_manifest`] works from a fresh view of the
/// project and its installed dependencies. Nothing is written anywhere except
/// to the content store, and only once the whole manifest has been assembled.
pub struct Assembler {
    artifacts: Box<dyn ArtifactSource>,
    dependencies: Box<dyn DependencySource>,
    networks: Box<dyn NetworkRegistry>,
    store: Option<ContentStore>,
}

/// Result of a successful manifest build.
#[derive(Debug)]
pub struct BuildResult {
    pub manifest: Manifest,
    /// Set when the manifest was pinned.
    pub uri: Option<ContentUri>,
}

impl Assembler {
    pub fn new(
        artifacts: impl ArtifactSource + 'static,
        dependencies: impl DependencySource + 'static,
        networks: impl NetworkRegistry + 'static,
    ) -> Self {
        Self {
            artifacts: Box::new(artifacts),
            dependencies: Box::new(dependencies),
            networks: Box::new(networks),
            store: None,
        }
    }

    /// Assembler over the conventional project layout: sources under
    /// `contracts/`, compiler output under `build/contracts/`, installed
    /// packages under `packages/`, and deployments under `build/deployments/`.
    pub fn for_project_layout(networks: NetworkTable) -> Self {
        Self::new(
            ProjectArtifacts::new(),
            InstalledPackages::new(),
            ProjectNetworks::new(networks),
        )
    }

    #[must_use]
    pub fn with_store(mut self, store: ContentStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store(&self) -> Option<&ContentStore> {
        self.store.as_ref()
    }

    /// Validate a loosely-typed config, then build from it.
    pub fn create_manifest_from_value(
        &self,
        root: &Path,
        config: serde_json::Value,
        pin: bool,
    ) -> Result<BuildResult, CoreError> {
        let config = PackageConfig::from_value(config)?;
        self.create_manifest(root, &config, pin)
    }

    /// Build the manifest for the project at `root`, pinning it when `pin` is set.
    ///
    /// Any integrity failure or type collision aborts the build before
    /// anything is pinned.
    pub fn create_manifest(
        &self,
        root: &Path,
        config: &PackageConfig,
        pin: bool,
    ) -> Result<BuildResult, CoreError> {
        let store = match (&self.store, pin) {
            (None, true) => {
                return Err(CoreError::Collaborator(
                    "pinning requested but no content store is configured".to_owned(),
                ))
            }
            (Some(store), true) => Some(store),
            (_, false) => None,
        };

        info!(
            "assembling {}@{} from {}",
            config.package_name,
            config.version,
            root.display()
        );

        let resolver = Resolver::new(self.artifacts.as_ref(), self.dependencies.as_ref());
        let resolution = resolver.resolve(root, config, pin)?;
        debug!(
            "resolved {} sources, {} contract types, {} referenced dependencies",
            resolution.sources.len(),
            resolution.contract_types.len(),
            resolution.referenced.len()
        );

        let matched = match_deployments(
            &config.settings.deployment_networks,
            self.networks.as_ref(),
            root,
            &resolution.contract_types,
            &resolution.referenced,
        )?;

        let mut manifest = resolution.to_manifest(&config.package_name, &config.version, pin);
        manifest.meta = normalize_meta(&config.meta);
        manifest.contract_types.extend(matched.referenced_types);
        manifest.deployments = matched.deployments;

        let uri = match store {
            Some(store) => Some(pin_all(store, &resolution, &manifest)?),
            None => None,
        };

        Ok(BuildResult { manifest, uri })
    }
}

/// Pin sources first, then any dependency manifest that has no uri yet, then
/// the manifest itself, so every uri the manifest names resolves.
fn pin_all(
    store: &ContentStore,
    resolution: &Resolution,
    manifest: &Manifest,
) -> Result<ContentUri, CoreError> {
    for source in &resolution.sources {
        store.put(&source.content)?;
    }

    for dep in resolution.referenced.iter().filter(|d| d.needs_pin) {
        for source in &dep.sources {
            store.put(&source.content)?;
        }
        let uri = store.put(&dep.manifest.canonical_bytes()?)?;
        debug!("pinned dependency {} as {uri}", dep.name);
    }

    let uri = store.put(&manifest.canonical_bytes()?)?;
    info!(
        "pinned {}@{} as {uri}",
        manifest.package_name, manifest.version
    );
    Ok(uri)
}

/// Retrieve and parse the manifest pinned at `uri`.
pub fn fetch_manifest(store: &ContentStore, uri: &ContentUri) -> Result<Manifest, CoreError> {
    let bytes = store.get(uri)?;
    let manifest = Manifest::from_bytes(&bytes)?;
    if manifest.manifest_version != MANIFEST_VERSION {
        return Err(SchemaError::Validation(format!(
            "unsupported manifest_version '{}' at {uri}",
            manifest.manifest_version
        ))
        .into());
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethpkg_store::MemoryTransport;

    fn bare() -> Assembler {
        Assembler::for_project_layout(NetworkTable::default())
    }

    #[test]
    fn pin_without_store_fails_before_reading_project() {
        let config = PackageConfig::new("testpackage", "1.0.0").unwrap();
        let err = bare()
            .create_manifest(Path::new("/nonexistent/project"), &config, true)
            .unwrap_err();
        assert!(matches!(err, CoreError::Collaborator(_)));
    }

    #[test]
    fn invalid_config_fails_before_reading_project() {
        let config = serde_json::json!({"package_name": "testpackage", "version": "1.0.0"});
        let err = bare()
            .create_manifest_from_value(Path::new("/nonexistent/project"), config, false)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Schema(SchemaError::MissingField(ref f)) if f == "settings"
        ));
    }

    #[test]
    fn fetch_round_trips_pinned_manifest() {
        let store = ContentStore::new(MemoryTransport::new());
        let manifest = Manifest::new("testpackage", "1.0.0");
        let uri = store.put(&manifest.canonical_bytes().unwrap()).unwrap();
        assert_eq!(fetch_manifest(&store, &uri).unwrap(), manifest);
    }

    #[test]
    fn fetch_rejects_other_manifest_versions() {
        let store = ContentStore::new(MemoryTransport::new());
        let mut manifest = Manifest::new("testpackage", "1.0.0");
        manifest.manifest_version = "1".to_owned();
        let uri = store.put(&manifest.canonical_bytes().unwrap()).unwrap();
        assert!(matches!(
            fetch_manifest(&store, &uri),
            Err(CoreError::Schema(SchemaError::Validation(_)))
        ));
    }

    #[test]
    fn fetch_of_unknown_uri_is_not_found() {
        let store = ContentStore::new(MemoryTransport::new());
        let uri = ContentUri::for_bytes(b"never pinned");
        assert!(matches!(
            fetch_manifest(&store, &uri),
            Err(CoreError::Store(ethpkg_store::StoreError::NotFound(_)))
        ));
    }
}
