use super::{json_pretty, EXIT_STORE_ERROR, EXIT_SUCCESS};
use ethpkg_store::{verify_cache, StoreLayout};
use std::path::Path;

pub fn run(store_path: &Path, json: bool) -> Result<u8, String> {
    let layout = StoreLayout::new(store_path);
    let report = verify_cache(&layout).map_err(|e| format!("store error: {e}"))?;

    if json {
        let payload = serde_json::json!({
            "checked": report.checked,
            "passed": report.passed,
            "failed": report.failed.len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "store integrity: {}/{} objects passed",
            report.passed, report.checked
        );
        for f in &report.failed {
            println!("  FAIL {}: {}", f.digest, f.reason);
        }
    }

    if report.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_STORE_ERROR)
    }
}
