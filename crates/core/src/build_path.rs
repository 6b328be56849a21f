//! Build-path resolution
//!
//! Each image keeps one build directory per supported version line, e.g.
//! `src/nginx/1.22` and `src/nginx/1.24`. A version is built from the highest
//! directory that does not exceed it (floor match), so `1.23.5` is built from
//! `src/nginx/1.22` when no `1.23` directory exists.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::version::{is_version_lte, sort_descending};

/// Find the build directory for `target` below `base_dir`
///
/// Returns `None` when `base_dir` does not exist, cannot be read, or holds no
/// directory whose name is a version `<= target`. Plain files and directories
/// whose names are not versions are ignored.
pub fn find_build_path(base_dir: &Path, target: &str) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(e) => {
            if base_dir.exists() {
                warn!("Unable to read build directory {}: {}", base_dir.display(), e);
            } else {
                debug!("Build directory does not exist: {}", base_dir.display());
            }
            return None;
        }
    };

    let names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();

    let found = sort_descending(names)
        .into_iter()
        .find(|name| is_version_lte(name, target))
        .map(|name| base_dir.join(name));

    match &found {
        Some(path) => debug!("Resolved {} to {}", target, path.display()),
        None => debug!(
            "No build directory <= {} in {}",
            target,
            base_dir.display()
        ),
    }
    found
}
