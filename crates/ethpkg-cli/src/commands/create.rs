use super::{emit_manifest, json_pretty, open_store, EXIT_SUCCESS};
use ethpkg_core::fs::NetworkTable;
use ethpkg_core::Assembler;
use ethpkg_schema::parse_config_file;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILES: [&str; 2] = ["ethpkg.toml", "ethpkg.json"];
const NETWORKS_FILE: &str = "networks.toml";

fn default_config(project: &Path) -> Result<PathBuf, String> {
    CONFIG_FILES
        .iter()
        .map(|name| project.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            format!(
                "manifest error: no package config in {} (expected {})",
                project.display(),
                CONFIG_FILES.join(" or ")
            )
        })
}

pub fn run(
    store_path: &Path,
    project: &Path,
    config: Option<&Path>,
    pin: bool,
    output: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let config_path = match config {
        Some(path) => path.to_path_buf(),
        None => default_config(project)?,
    };
    debug!("loading package config from {}", config_path.display());
    let config = parse_config_file(&config_path).map_err(|e| format!("manifest error: {e}"))?;

    let networks_path = project.join(NETWORKS_FILE);
    let networks = NetworkTable::load(&networks_path)
        .map_err(|e| format!("manifest error: {}: {e}", networks_path.display()))?;
    let mut assembler = Assembler::for_project_layout(networks);
    if pin {
        assembler = assembler.with_store(open_store(store_path)?);
    }

    let result = assembler
        .create_manifest(project, &config, pin)
        .map_err(|e| e.to_string())?;

    if json {
        if let Some(path) = output {
            emit_manifest(&result.manifest, Some(path))?;
        }
        let payload = serde_json::json!({
            "manifest": result.manifest,
            "uri": result.uri.as_ref().map(ToString::to_string),
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    emit_manifest(&result.manifest, output)?;
    if let Some(path) = output {
        println!("wrote {}", path.display());
    }
    if let Some(uri) = &result.uri {
        if output.is_some() {
            println!("pinned {uri}");
        } else {
            eprintln!("pinned {uri}");
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn toml_config_preferred_over_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ethpkg.json"), "{}").unwrap();
        assert_eq!(
            default_config(dir.path()).unwrap(),
            dir.path().join("ethpkg.json")
        );
        fs::write(dir.path().join("ethpkg.toml"), "").unwrap();
        assert_eq!(
            default_config(dir.path()).unwrap(),
            dir.path().join("ethpkg.toml")
        );
    }

    #[test]
    fn missing_config_is_a_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = default_config(dir.path()).unwrap_err();
        assert!(err.starts_with("manifest error:"));
    }
}
