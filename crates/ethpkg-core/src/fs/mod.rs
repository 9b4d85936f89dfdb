//! Collaborators backed by the conventional on-disk project layout.
//!
//! ```text
//! <project>/
//!   contracts/**/*.sol|*.vy            sources
//!   build/contracts/<Name>.json        compiler artifacts
//!   build/deployments/<net>/<addr>.json deployment records
//!   packages/<name>@<version>/          installed dependencies
//!     build/manifest.json               manifest the package was installed with
//!     build/manifest.uri                uri it was pinned under
//! ```

mod artifacts;
mod networks;
mod packages;

pub use artifacts::{ProjectArtifacts, SOURCE_EXTENSIONS};
pub use networks::{NetworkEntry, NetworkTable, ProjectNetworks};
pub use packages::InstalledPackages;

use std::path::{Component, Path, PathBuf};

pub(crate) fn contracts_dir(root: &Path) -> PathBuf {
    root.join("contracts")
}

pub(crate) fn build_dir(root: &Path) -> PathBuf {
    root.join("build")
}

pub(crate) fn packages_dir(root: &Path) -> PathBuf {
    root.join("packages")
}

/// `rel` joined onto `base`, or `None` when `rel` is empty, absolute, or
/// climbs out through `..`.
pub(crate) fn join_within(base: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    let mut parts = rel.components().peekable();
    parts.peek()?;
    parts
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .then(|| base.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_within_stays_under_base() {
        let base = Path::new("/project/contracts");
        assert_eq!(
            join_within(base, "lib/Math.sol"),
            Some(base.join("lib/Math.sol"))
        );
        assert_eq!(join_within(base, "./Token.sol"), Some(base.join("./Token.sol")));
        assert_eq!(join_within(base, "../../etc/passwd"), None);
        assert_eq!(join_within(base, "lib/../../x"), None);
        assert_eq!(join_within(base, "/etc/passwd"), None);
        assert_eq!(join_within(base, ""), None);
    }
}
