use crate::collaborators::NetworkRegistry;
use crate::resolve::ReferencedDependency;
use crate::CoreError;
use ethpkg_schema::{ContractTypeRecord, DeploymentInstance, NetworkSelection, NetworkUri};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Deployments that survived matching, and the referenced dependency types
/// they point at.
#[derive(Debug, Default, PartialEq)]
pub struct DeploymentMatch {
    pub deployments: BTreeMap<NetworkUri, BTreeMap<String, DeploymentInstance>>,
    /// `dependency:Type` keys to copy into the manifest's `contract_types`.
    pub referenced_types: BTreeMap<String, ContractTypeRecord>,
}

impl DeploymentMatch {
    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}

enum TypeRef<'a> {
    Own(&'a ContractTypeRecord),
    Referenced(String, &'a ContractTypeRecord),
}

impl TypeRef<'_> {
    fn record(&self) -> &ContractTypeRecord {
        match self {
            Self::Own(ty) | Self::Referenced(_, ty) => ty,
        }
    }

    fn key(&self) -> &str {
        match self {
            Self::Own(ty) => &ty.contract_name,
            Self::Referenced(key, _) => key,
        }
    }
}

fn lookup<'a>(
    name: &str,
    own_types: &'a BTreeMap<String, ContractTypeRecord>,
    referenced: &'a [ReferencedDependency],
) -> Option<TypeRef<'a>> {
    if let Some(ty) = own_types.get(name) {
        return Some(TypeRef::Own(ty));
    }
    referenced.iter().find_map(|dep| {
        dep.manifest
            .contract_types
            .get(name)
            .map(|ty| TypeRef::Referenced(format!("{}:{name}", dep.name), ty))
    })
}

fn requested_networks(
    selection: &NetworkSelection,
    registry: &dyn NetworkRegistry,
    root: &Path,
) -> Result<Vec<String>, CoreError> {
    match selection {
        NetworkSelection::Skip => Ok(Vec::new()),
        NetworkSelection::All => registry.deployment_networks(root),
        NetworkSelection::Named(names) => {
            let mut unique: Vec<String> = Vec::with_capacity(names.len());
            for name in names {
                if !unique.contains(name) {
                    unique.push(name.clone());
                }
            }
            Ok(unique)
        }
    }
}

/// Match recorded deployments of `root` against its current contract types.
///
/// Unknown networks, unknown types, and instances whose recorded bytecode no
/// longer matches the current artifact are dropped without error. A network
/// with no surviving instance is left out entirely.
pub fn match_deployments(
    selection: &NetworkSelection,
    registry: &dyn NetworkRegistry,
    root: &Path,
    own_types: &BTreeMap<String, ContractTypeRecord>,
    referenced: &[ReferencedDependency],
) -> Result<DeploymentMatch, CoreError> {
    let mut result = DeploymentMatch::default();

    for network in requested_networks(selection, registry, root)? {
        let records = registry.deployment_records(root, &network)?;
        if records.is_empty() {
            debug!("no deployments recorded on {network}");
            continue;
        }
        let Some(uri) = registry.genesis_uri(&network)? else {
            debug!("{network} is not a known network, skipping");
            continue;
        };

        let instances = result.deployments.entry(uri).or_default();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (address, record) in records {
            let Some(ty) = lookup(&record.contract_type, own_types, referenced) else {
                debug!(
                    "{address} on {network}: unknown contract type {}",
                    record.contract_type
                );
                continue;
            };
            if ty.record().deployment_digest() != record.bytecode_digest {
                info!(
                    "{address} on {network}: {} has been rebuilt since deployment, excluded",
                    record.contract_type
                );
                continue;
            }

            let count = seen.entry(record.contract_type.clone()).or_default();
            let mut name = instance_name(&record.contract_type, *count);
            while instances.contains_key(&name) {
                *count += 1;
                name = instance_name(&record.contract_type, *count);
            }
            *count += 1;

            if let TypeRef::Referenced(key, ty) = &ty {
                result
                    .referenced_types
                    .entry(key.clone())
                    .or_insert_with(|| (*ty).clone());
            }
            instances.insert(
                name,
                DeploymentInstance {
                    address,
                    contract_type: ty.key().to_owned(),
                },
            );
        }
    }

    result.deployments.retain(|_, instances| !instances.is_empty());
    Ok(result)
}

fn instance_name(contract_type: &str, index: usize) -> String {
    if index == 0 {
        contract_type.to_owned()
    } else {
        format!("{contract_type}-{index}")
    }
}
