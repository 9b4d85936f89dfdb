use super::{emit_manifest, json_pretty, open_store, EXIT_SUCCESS};
use ethpkg_core::fetch_manifest;
use ethpkg_schema::ContentUri;
use std::path::Path;

pub fn run(store_path: &Path, uri: &str, output: Option<&Path>, json: bool) -> Result<u8, String> {
    let uri = ContentUri::parse(uri).map_err(|e| e.to_string())?;
    let store = open_store(store_path)?;
    let manifest = fetch_manifest(&store, &uri).map_err(|e| e.to_string())?;

    if json {
        if let Some(path) = output {
            emit_manifest(&manifest, Some(path))?;
        }
        let payload = serde_json::json!({
            "uri": uri.to_string(),
            "manifest": manifest,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        emit_manifest(&manifest, output)?;
        if let Some(path) = output {
            println!("wrote {}", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
