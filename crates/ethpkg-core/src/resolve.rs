use crate::collaborators::{ArtifactSource, DependencyRecord, DependencySource};
use crate::collect::{collect, CollectedSource};
use crate::drift::check_drift;
use crate::CoreError;
use ethpkg_schema::{ContentUri, ContractTypeRecord, Manifest, PackageConfig};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// A dependency recorded in `build_dependencies` instead of being inlined.
#[derive(Debug, Clone)]
pub struct ReferencedDependency {
    pub name: String,
    pub manifest: Manifest,
    pub uri: ContentUri,
    /// The manifest has no pinned uri yet and must be pinned with the package.
    pub needs_pin: bool,
    /// Sources of a manifest assembled during resolution; empty otherwise.
    pub sources: Vec<CollectedSource>,
}

/// Sources, contract types, and dependency references of one package.
#[derive(Debug, Default)]
pub struct Resolution {
    /// First-party sources followed by inlined dependency sources.
    pub sources: Vec<CollectedSource>,
    pub contract_types: BTreeMap<String, ContractTypeRecord>,
    pub referenced: Vec<ReferencedDependency>,
}

impl Resolution {
    /// Manifest with the resolved sections filled in. `meta` and
    /// `deployments` are left to the caller.
    pub fn to_manifest(&self, package_name: &str, version: &str, by_reference: bool) -> Manifest {
        let mut manifest = Manifest::new(package_name, version);
        manifest.sources = self
            .sources
            .iter()
            .map(|s| (s.key.clone(), s.manifest_entry(by_reference)))
            .collect();
        manifest.contract_types = self.contract_types.clone();
        manifest.build_dependencies = self
            .referenced
            .iter()
            .map(|r| (r.name.clone(), r.uri.clone()))
            .collect();
        manifest
    }
}

/// Bare type name to the package that declared it first.
#[derive(Default)]
struct TypeOwners {
    owners: BTreeMap<String, String>,
    types: BTreeMap<String, ContractTypeRecord>,
}

impl TypeOwners {
    fn register(&mut self, owner: &str, ty: &ContractTypeRecord) -> Result<(), CoreError> {
        if let Some(first) = self.owners.get(&ty.contract_name) {
            return Err(CoreError::NameCollision {
                name: ty.contract_name.clone(),
                first: first.clone(),
                second: owner.to_owned(),
            });
        }
        self.owners
            .insert(ty.contract_name.clone(), owner.to_owned());
        self.types.insert(ty.contract_name.clone(), ty.clone());
        Ok(())
    }
}

#[derive(Default)]
struct InlineState {
    /// Package name to the version inlined under that name.
    visited: BTreeMap<String, String>,
    sources: Vec<CollectedSource>,
    /// Source key to the package that contributed it.
    source_owners: BTreeMap<String, String>,
    owners: TypeOwners,
}

impl InlineState {
    fn add_source(&mut self, owner: &str, source: CollectedSource) -> Result<(), CoreError> {
        if let Some(first) = self.source_owners.get(&source.key) {
            return Err(CoreError::SourceCollision {
                key: source.key,
                first: first.clone(),
                second: owner.to_owned(),
            });
        }
        for ty in &source.contract_types {
            self.owners.register(owner, ty)?;
        }
        self.source_owners
            .insert(source.key.clone(), owner.to_owned());
        self.sources.push(source);
        Ok(())
    }
}

/// Walks a package's dependency tree, deciding per dependency whether to
/// inline it or reference it, and refusing any dependency whose tree no
/// longer matches the manifest it was installed with.
pub struct Resolver<'a> {
    artifacts: &'a dyn ArtifactSource,
    dependencies: &'a dyn DependencySource,
}

impl<'a> Resolver<'a> {
    pub fn new(artifacts: &'a dyn ArtifactSource, dependencies: &'a dyn DependencySource) -> Self {
        Self {
            artifacts,
            dependencies,
        }
    }

    /// Resolve the package at `root`.
    ///
    /// `by_reference` selects the `sources` form of any manifest assembled
    /// for a dependency that was installed without one.
    pub fn resolve(
        &self,
        root: &Path,
        config: &PackageConfig,
        by_reference: bool,
    ) -> Result<Resolution, CoreError> {
        let mut state = InlineState::default();
        state
            .visited
            .insert(config.package_name.clone(), config.version.clone());

        for source in collect(self.artifacts, root)? {
            state.add_source(&config.package_name, source)?;
        }

        let mut referenced = Vec::new();
        for dep in self.dependencies.list_dependencies(root)? {
            if config.settings.include_dependencies {
                self.inline(&dep, &mut state)?;
            } else {
                referenced.push(self.reference(&dep, by_reference)?);
            }
        }

        Ok(Resolution {
            sources: state.sources,
            contract_types: state.owners.types,
            referenced,
        })
    }

    fn inline(&self, dep: &DependencyRecord, state: &mut InlineState) -> Result<(), CoreError> {
        if let Some(seen) = state.visited.get(&dep.name) {
            if *seen == dep.version {
                debug!("{} already resolved, not inlining again", dep.name);
                return Ok(());
            }
            let label = format!("{}@{}", dep.name, dep.version);
            for source in collect(self.artifacts, &dep.path)? {
                for ty in &source.contract_types {
                    if let Some(first) = state.owners.owners.get(&ty.contract_name) {
                        return Err(CoreError::NameCollision {
                            name: ty.contract_name.clone(),
                            first: first.clone(),
                            second: label,
                        });
                    }
                }
            }
            warn!("{label} skipped: {}@{seen} is already inlined", dep.name);
            return Ok(());
        }
        state
            .visited
            .insert(dep.name.clone(), dep.version.clone());

        debug!("inlining {}@{}", dep.name, dep.version);
        check_drift(self.artifacts, dep)?.ensure_clean()?;

        for source in collect(self.artifacts, &dep.path)? {
            state.add_source(&dep.name, source.nest_under(&dep.name))?;
        }

        for nested in self.dependencies.list_dependencies(&dep.path)? {
            self.inline(&nested, state)?;
        }
        Ok(())
    }

    fn reference(
        &self,
        dep: &DependencyRecord,
        by_reference: bool,
    ) -> Result<ReferencedDependency, CoreError> {
        debug!("referencing {}@{}", dep.name, dep.version);
        check_drift(self.artifacts, dep)?.ensure_clean()?;

        let (manifest, sources) = match &dep.manifest {
            Some(manifest) => (manifest.clone(), Vec::new()),
            None => {
                debug!("{} was installed without a manifest, assembling one", dep.name);
                let mut config = PackageConfig::new(&dep.name, &dep.version)?;
                config.settings.include_dependencies = true;
                let resolution = self.resolve(&dep.path, &config, by_reference)?;
                let manifest = resolution.to_manifest(&dep.name, &dep.version, by_reference);
                (manifest, resolution.sources)
            }
        };

        let (uri, needs_pin) = match &dep.uri {
            Some(uri) => (uri.clone(), false),
            None => (manifest.content_uri()?, true),
        };

        Ok(ReferencedDependency {
            name: dep.name.clone(),
            manifest,
            uri,
            needs_pin,
            sources,
        })
    }
}
