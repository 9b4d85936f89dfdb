pub mod create;
pub mod get;
pub mod verify_store;

use ethpkg_schema::Manifest;
use ethpkg_store::{ContentStore, FsTransport};
use std::fs;
use std::path::Path;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;
pub const EXIT_INTEGRITY_ERROR: u8 = 4;

/// Map a command's error message to its exit code by the category prefix
/// the library errors render with.
pub fn exit_code_for(msg: &str) -> u8 {
    const CATEGORIES: [(&str, u8); 5] = [
        ("manifest error:", EXIT_MANIFEST_ERROR),
        ("store error:", EXIT_STORE_ERROR),
        ("dependency '", EXIT_INTEGRITY_ERROR),
        ("contract type '", EXIT_INTEGRITY_ERROR),
        ("source '", EXIT_INTEGRITY_ERROR),
    ];
    CATEGORIES
        .iter()
        .find(|(prefix, _)| msg.starts_with(prefix))
        .map_or(EXIT_FAILURE, |&(_, code)| code)
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn open_store(store_path: &Path) -> Result<ContentStore, String> {
    let transport = FsTransport::open(store_path).map_err(|e| format!("store error: {e}"))?;
    Ok(ContentStore::new(transport))
}

/// Write the canonical form of `manifest` to `output`, or to stdout.
pub fn emit_manifest(manifest: &Manifest, output: Option<&Path>) -> Result<(), String> {
    let bytes = manifest
        .canonical_bytes()
        .map_err(|e| format!("JSON serialization failed: {e}"))?;
    match output {
        Some(path) => {
            fs::write(path, &bytes).map_err(|e| format!("failed to write {}: {e}", path.display()))
        }
        None => {
            println!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
    }
}
