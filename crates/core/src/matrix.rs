//! Build matrix generation
//!
//! Selects the most recent upstream versions, resolves each one to a build
//! directory and produces a CI matrix of the following form:
//!
//! ```json
//! {"include": [{"version": "1.25.3", "tag": "1.25.3-alpine",
//!   "sourceImageWithTag": "library/nginx:1.25.3-alpine",
//!   "buildPath": "src/nginx/alpine/1.25", "isLatest": true}]}
//! ```
//!
//! Deciding that nothing needs building is a regular outcome
//! ([`MatrixOutcome::NoBuild`]), not an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use crate::build_path::find_build_path;
use crate::errors::{ConfigError, Result};
use crate::version::{is_version_gte, sort_ascending, sort_descending, VersionMap};

/// Default number of newest upstream versions to build
pub const DEFAULT_TRACKED_VERSIONS: usize = 3;

/// Inputs of [`generate_build_matrix`]
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOptions {
    /// Upstream image, e.g. `library/nginx`
    pub source_image: String,
    /// Name of the built image, e.g. `nginx`
    pub target_image_name: String,
    /// Optional variant of the built image, e.g. `fpm`
    pub target_image_type: Option<String>,
    /// Mark the newest entry as `latest`
    pub detect_latest_version: bool,
    /// Number of newest versions to consider
    pub tracked_versions: usize,
    /// Final version of a deprecated image; newer versions are not built
    pub last_version: Option<String>,
    /// Root directory of all image build trees
    pub source_base_dir: PathBuf,
}

impl MatrixOptions {
    pub fn new(
        source_image: impl Into<String>,
        target_image_name: impl Into<String>,
        source_base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_image: source_image.into(),
            target_image_name: target_image_name.into(),
            target_image_type: None,
            detect_latest_version: false,
            tracked_versions: DEFAULT_TRACKED_VERSIONS,
            last_version: None,
            source_base_dir: source_base_dir.into(),
        }
    }

    /// Trimmed image type, `None` when unset or blank
    pub fn image_type(&self) -> Option<&str> {
        self.target_image_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Directory holding the version directories of the target image
    pub fn image_base_dir(&self) -> PathBuf {
        let base = self.source_base_dir.join(&self.target_image_name);
        match self.image_type() {
            Some(image_type) => base.join(image_type),
            None => base,
        }
    }
}

/// One image build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMatrixEntry {
    pub version: String,
    pub tag: String,
    pub source_image_with_tag: String,
    pub build_path: PathBuf,
    pub is_latest: bool,
}

/// CI matrix, serialized as `{"include": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMatrix {
    pub include: Vec<BuildMatrixEntry>,
}

impl BuildMatrix {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Tags of all entries, in matrix order
    pub fn tags(&self) -> Vec<String> {
        self.include.iter().map(|e| e.tag.clone()).collect()
    }
}

/// Why no matrix was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoBuildReason {
    /// The last version of a deprecated image is older than every tracked version
    LastVersionOutOfWindow { last_version: String, greatest: String },
    /// None of the selected versions has a build directory
    NoBuildPaths,
    /// The tracked window selected no versions
    NoVersionsSelected,
}

impl fmt::Display for NoBuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoBuildReason::LastVersionOutOfWindow {
                last_version,
                greatest,
            } => write!(
                f,
                "last version {} is older than the newest tracked version {}",
                last_version, greatest
            ),
            NoBuildReason::NoBuildPaths => write!(f, "no selected version has a build path"),
            NoBuildReason::NoVersionsSelected => write!(f, "no versions selected"),
        }
    }
}

/// Result of [`generate_build_matrix`]
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixOutcome {
    Build {
        matrix: BuildMatrix,
        /// Selected versions without a build directory
        skipped: Vec<String>,
    },
    NoBuild(NoBuildReason),
}

impl MatrixOutcome {
    pub fn into_matrix(self) -> Option<BuildMatrix> {
        match self {
            MatrixOutcome::Build { matrix, .. } => Some(matrix),
            MatrixOutcome::NoBuild(_) => None,
        }
    }

    pub fn matrix(&self) -> Option<&BuildMatrix> {
        match self {
            MatrixOutcome::Build { matrix, .. } => Some(matrix),
            MatrixOutcome::NoBuild(_) => None,
        }
    }
}

/// Generate the build matrix for the newest source versions
///
/// # Errors
///
/// A configuration error when `source_image` or `source_versions` is empty.
#[instrument(level = "info", skip(source_versions), fields(source_image = %options.source_image))]
pub fn generate_build_matrix(
    options: &MatrixOptions,
    source_versions: &VersionMap,
) -> Result<MatrixOutcome> {
    if options.source_image.trim().is_empty() {
        return Err(ConfigError::MissingInput {
            name: "source-image".to_string(),
        }
        .into());
    }
    if source_versions.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("No source versions available for {}", options.source_image),
        }
        .into());
    }

    let newest: Vec<&str> = sort_descending(source_versions.keys().map(String::as_str))
        .into_iter()
        .take(options.tracked_versions)
        .collect();
    let mut selected = sort_ascending(newest);
    debug!("Selected versions: {:?}", selected);

    let Some(greatest) = selected.last().copied() else {
        return Ok(MatrixOutcome::NoBuild(NoBuildReason::NoVersionsSelected));
    };

    if let Some(last_version) = options.last_version.as_deref().filter(|v| !v.is_empty()) {
        match selected.iter().position(|v| *v == last_version) {
            Some(index) => {
                info!(
                    "Image is deprecated, building versions up to {}",
                    last_version
                );
                selected.truncate(index + 1);
            }
            None if is_version_gte(last_version, greatest) => {
                debug!(
                    "Last version {} is not older than {}, no filtering required",
                    last_version, greatest
                );
            }
            None => {
                info!(
                    "Last version {} is older than every tracked version, nothing to build",
                    last_version
                );
                return Ok(MatrixOutcome::NoBuild(
                    NoBuildReason::LastVersionOutOfWindow {
                        last_version: last_version.to_string(),
                        greatest: greatest.to_string(),
                    },
                ));
            }
        }
    }

    let base_dir = options.image_base_dir();
    let image_type = options.image_type();
    let mut include = Vec::new();
    let mut skipped = Vec::new();

    for version in selected {
        let Some(build_path) = find_build_path(&base_dir, version) else {
            info!(
                "No build path found for version {} in {}, skipping",
                version,
                base_dir.display()
            );
            skipped.push(version.to_string());
            continue;
        };

        let original_tag = source_versions
            .get(version)
            .map(String::as_str)
            .unwrap_or(version);
        let tag = match image_type {
            Some(image_type) => format!("{}-{}", version, image_type),
            None => version.to_string(),
        };

        include.push(BuildMatrixEntry {
            version: version.to_string(),
            tag,
            source_image_with_tag: format!("{}:{}", options.source_image, original_tag),
            build_path,
            is_latest: false,
        });
    }

    if include.is_empty() {
        return Ok(MatrixOutcome::NoBuild(NoBuildReason::NoBuildPaths));
    }

    if options.detect_latest_version {
        if let Some(last) = include.last_mut() {
            last.is_latest = true;
        }
    }

    Ok(MatrixOutcome::Build {
        matrix: BuildMatrix { include },
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TagwardenError;
    use tempfile::TempDir;

    fn versions(keys: &[&str]) -> VersionMap {
        keys.iter()
            .map(|k| (k.to_string(), format!("{}-alpine", k)))
            .collect()
    }

    fn tree(dirs: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for dir in dirs {
            std::fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        temp
    }

    fn options(temp: &TempDir) -> MatrixOptions {
        MatrixOptions::new("library/demo", "demo", temp.path())
    }

    fn built_versions(outcome: &MatrixOutcome) -> Vec<String> {
        outcome
            .matrix()
            .map(|m| m.include.iter().map(|e| e.version.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_takes_newest_n_ascending() {
        let temp = tree(&["demo/1.0"]);
        let outcome = generate_build_matrix(
            &options(&temp),
            &versions(&["1.0.0", "1.3.0", "1.1.0", "1.2.0"]),
        )
        .unwrap();
        assert_eq!(built_versions(&outcome), vec!["1.1.0", "1.2.0", "1.3.0"]);
    }

    #[test]
    fn test_entry_fields_and_latest() {
        let temp = tree(&["demo/fpm/8.2", "demo/fpm/8.3"]);
        let mut opts = options(&temp);
        opts.target_image_type = Some(" fpm ".to_string());
        opts.detect_latest_version = true;

        let matrix = generate_build_matrix(&opts, &versions(&["8.2.1", "8.3.0"]))
            .unwrap()
            .into_matrix()
            .unwrap();

        assert_eq!(matrix.include.len(), 2);
        let first = &matrix.include[0];
        assert_eq!(first.version, "8.2.1");
        assert_eq!(first.tag, "8.2.1-fpm");
        assert_eq!(first.source_image_with_tag, "library/demo:8.2.1-alpine");
        assert_eq!(first.build_path, temp.path().join("demo/fpm/8.2"));
        assert!(!first.is_latest);
        assert!(matrix.include[1].is_latest);
        assert_eq!(matrix.tags(), vec!["8.2.1-fpm", "8.3.0-fpm"]);
    }

    #[test]
    fn test_last_version_included_truncates() {
        let temp = tree(&["demo/1.0"]);
        let mut opts = options(&temp);
        opts.last_version = Some("1.1.0".to_string());

        let outcome =
            generate_build_matrix(&opts, &versions(&["1.0.0", "1.1.0", "1.2.0", "1.3.0"])).unwrap();
        assert_eq!(built_versions(&outcome), vec!["1.1.0"]);
    }

    #[test]
    fn test_last_version_older_than_window_is_no_build() {
        let temp = tree(&["demo/1.0"]);
        let mut opts = options(&temp);
        opts.last_version = Some("0.9.0".to_string());

        let outcome =
            generate_build_matrix(&opts, &versions(&["1.0.0", "1.1.0", "1.2.0", "1.3.0"])).unwrap();
        assert!(matches!(
            outcome,
            MatrixOutcome::NoBuild(NoBuildReason::LastVersionOutOfWindow { .. })
        ));
        assert!(outcome.into_matrix().is_none());
    }

    #[test]
    fn test_last_version_newer_than_window_keeps_all() {
        let temp = tree(&["demo/1.0"]);
        let mut opts = options(&temp);
        opts.last_version = Some("2.0.0".to_string());
        opts.tracked_versions = 2;

        let outcome =
            generate_build_matrix(&opts, &versions(&["1.0.0", "1.1.0", "1.2.0"])).unwrap();
        assert_eq!(built_versions(&outcome), vec!["1.1.0", "1.2.0"]);
    }

    #[test]
    fn test_unresolved_versions_are_skipped_and_latest_moves() {
        let temp = tree(&["demo/1.2"]);
        let mut opts = options(&temp);
        opts.detect_latest_version = true;

        let outcome =
            generate_build_matrix(&opts, &versions(&["1.0.0", "1.1.0", "1.2.0"])).unwrap();
        match outcome {
            MatrixOutcome::Build { matrix, skipped } => {
                assert_eq!(skipped, vec!["1.0.0", "1.1.0"]);
                assert_eq!(matrix.include.len(), 1);
                assert!(matrix.include[0].is_latest);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_no_build_paths() {
        let temp = tree(&[]);
        let outcome = generate_build_matrix(&options(&temp), &versions(&["1.0.0"])).unwrap();
        assert_eq!(outcome, MatrixOutcome::NoBuild(NoBuildReason::NoBuildPaths));
    }

    #[test]
    fn test_zero_tracked_versions_selects_nothing() {
        let temp = tree(&["demo/1.0"]);
        let mut opts = options(&temp);
        opts.tracked_versions = 0;
        let outcome = generate_build_matrix(&opts, &versions(&["1.0.0"])).unwrap();
        assert_eq!(
            outcome,
            MatrixOutcome::NoBuild(NoBuildReason::NoVersionsSelected)
        );
    }

    #[test]
    fn test_empty_inputs_are_config_errors() {
        let temp = tree(&[]);
        let mut opts = options(&temp);
        assert!(matches!(
            generate_build_matrix(&opts, &VersionMap::new()),
            Err(TagwardenError::Config(ConfigError::Validation { .. }))
        ));

        opts.source_image = String::new();
        assert!(matches!(
            generate_build_matrix(&opts, &versions(&["1.0.0"])),
            Err(TagwardenError::Config(ConfigError::MissingInput { .. }))
        ));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let temp = tree(&["demo/1.0", "demo/1.2"]);
        let mut opts = options(&temp);
        opts.detect_latest_version = true;
        let input = versions(&["1.0.0", "1.1.0", "1.2.0", "1.3.0"]);

        let first = generate_build_matrix(&opts, &input).unwrap();
        let second = generate_build_matrix(&opts, &input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serializes_camel_case() {
        let matrix = BuildMatrix {
            include: vec![BuildMatrixEntry {
                version: "1.0.0".to_string(),
                tag: "1.0.0".to_string(),
                source_image_with_tag: "library/demo:1.0.0".to_string(),
                build_path: PathBuf::from("src/demo/1.0"),
                is_latest: true,
            }],
        };
        let json = serde_json::to_string(&matrix).unwrap();
        assert_eq!(
            json,
            r#"{"include":[{"version":"1.0.0","tag":"1.0.0","sourceImageWithTag":"library/demo:1.0.0","buildPath":"src/demo/1.0","isLatest":true}]}"#
        );
        assert_eq!(
            serde_json::to_string(&BuildMatrix::default()).unwrap(),
            r#"{"include":[]}"#
        );
    }
}
