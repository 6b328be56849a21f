//! Shared test utilities for tagwarden CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::collections::HashMap;
use std::path::Path;

/// Environment variables that steer the binary and must not leak in from the
/// machine running the tests.
const CONTROLLED_ENV: &[&str] = &[
    "GITHUB_OUTPUT",
    "GITHUB_ACTIONS",
    "TAGWARDEN_REPO_ROOT",
    "TAGWARDEN_CONFIG",
    "TAGWARDEN_SOURCE_DIR",
    "TAGWARDEN_OUTPUT_DIR",
    "TAGWARDEN_WORKFLOWS_DIR",
    "TAGWARDEN_TEMPLATE_DIR",
    "TAGWARDEN_IMAGE_NAMESPACE",
    "TAGWARDEN_REGISTRY_URL",
    "TAGWARDEN_DEBIAN_RELEASE_URL",
    "TAGWARDEN_LOG",
    "TAGWARDEN_LOG_FORMAT",
    "INPUT_IMAGE",
    "INPUT_IMAGE-NAME",
    "INPUT_IMAGE-TYPE",
    "INPUT_SOURCE-IMAGE-NAMESPACE",
    "INPUT_SOURCE-IMAGE-NAME",
    "INPUT_SOURCE-IMAGE-TYPE",
    "INPUT_TRACKED-VERSIONS",
    "INPUT_DEPRECATED",
    "INPUT_VERSION-PRECISION",
    "INPUT_LATEST-TAG",
    "INPUT_MAINTAINED-TAGS",
    "INPUT_ALL-TAGS",
    "INPUT_LATEST-TAG-BUILT",
];

/// A `tagwarden` command rooted at `root` with a clean environment
pub fn tagwarden(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tagwarden").unwrap();
    for name in CONTROLLED_ENV {
        cmd.env_remove(name);
    }
    cmd.env("RUST_LOG", "warn");
    cmd.arg("--repo-root").arg(root);
    cmd
}

/// Parse a step output file written in `name=value` form
pub fn read_outputs(path: &Path) -> HashMap<String, String> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Create the given directories below `root`
pub fn create_dirs(root: &Path, dirs: &[&str]) {
    for dir in dirs {
        std::fs::create_dir_all(root.join(dir)).unwrap();
    }
}
