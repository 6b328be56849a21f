//! Release configuration
//!
//! Every component receives its paths and registry settings through
//! [`ReleaseConfig`] instead of reading process-wide constants. Values are
//! resolved with the following precedence (highest first):
//!
//! 1. Explicit overrides (CLI flags, or `TAGWARDEN_*` environment variables
//!    mapped onto the same flags)
//! 2. An optional TOML file (`tagwarden.toml` in the repository root, or an
//!    explicit `--config` path)
//! 3. Built-in defaults
//!
//! Relative paths are resolved against the repository root.
//!
//! ## Example `tagwarden.toml`
//!
//! ```toml
//! image_namespace = "acme"
//! source_base_dir = "images"
//!
//! [registry]
//! base_url = "https://registry.example.com"
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::errors::{ConfigError, Result};

/// Default config file looked up in the repository root
pub const DEFAULT_CONFIG_FILE: &str = "tagwarden.toml";

/// Namespace that built images are published under
pub const DEFAULT_IMAGE_NAMESPACE: &str = "neunerlei";

/// Docker Hub registry API host
pub const DEFAULT_REGISTRY_URL: &str = "https://index.docker.io";

/// Release file announcing the current Debian stable codename
pub const DEFAULT_DEBIAN_RELEASE_URL: &str = "https://deb.debian.org/debian/dists/stable/Release";

/// Registry connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the registry API (scheme and host, no trailing slash)
    pub base_url: String,
    /// Optional per-request timeout in seconds; unset means no timeout
    pub timeout_secs: Option<u64>,
}

impl RegistryConfig {
    /// Registry configuration for an explicit base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

/// Fully resolved configuration shared by all release operations
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseConfig {
    /// Directory with one sub-directory per image (`<image>[/<type>]/<version>`)
    pub source_base_dir: PathBuf,
    /// Namespace built images are published under (e.g. `neunerlei`)
    pub image_namespace: String,
    /// Optional directory overriding the built-in templates
    pub template_dir: Option<PathBuf>,
    /// Directory for generated artifacts (tag lists, PR bodies)
    pub output_dir: PathBuf,
    /// Directory holding the CI workflow definitions
    pub workflows_dir: PathBuf,
    /// Registry connection settings
    pub registry: RegistryConfig,
    /// URL of the Debian stable Release file
    pub debian_release_url: String,
}

/// On-disk configuration file; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub source_base_dir: Option<PathBuf>,
    pub image_namespace: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub workflows_dir: Option<PathBuf>,
    pub registry: Option<RegistryConfig>,
    pub debian_release_url: Option<String>,
}

/// Explicit overrides (highest precedence)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_base_dir: Option<PathBuf>,
    pub image_namespace: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub workflows_dir: Option<PathBuf>,
    pub registry_url: Option<String>,
    pub debian_release_url: Option<String>,
}

impl ReleaseConfig {
    /// Built-in defaults for a repository rooted at `root`
    pub fn with_defaults(root: &Path) -> Self {
        Self {
            source_base_dir: root.join("src"),
            image_namespace: DEFAULT_IMAGE_NAMESPACE.to_string(),
            template_dir: None,
            output_dir: root.join(".github").join(".release").join("build"),
            workflows_dir: root.join(".github").join("workflows"),
            registry: RegistryConfig::default(),
            debian_release_url: DEFAULT_DEBIAN_RELEASE_URL.to_string(),
        }
    }

    /// Resolve configuration for `root`
    ///
    /// When `config_path` is given the file must exist. Otherwise
    /// `<root>/tagwarden.toml` is used if present.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => Some(ConfigFile::load(&resolve(root, path))?),
            None => {
                let default_path = root.join(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Some(ConfigFile::load(&default_path)?)
                } else {
                    None
                }
            }
        };

        let mut config = Self::with_defaults(root);
        if let Some(file) = file {
            config.apply_file(root, file);
        }
        config.apply_overrides(root, overrides);
        config.validate()?;

        debug!(?config, "Resolved release configuration");
        Ok(config)
    }

    fn apply_file(&mut self, root: &Path, file: ConfigFile) {
        if let Some(dir) = file.source_base_dir {
            self.source_base_dir = resolve(root, &dir);
        }
        if let Some(namespace) = file.image_namespace {
            self.image_namespace = namespace;
        }
        if let Some(dir) = file.template_dir {
            self.template_dir = Some(resolve(root, &dir));
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = resolve(root, &dir);
        }
        if let Some(dir) = file.workflows_dir {
            self.workflows_dir = resolve(root, &dir);
        }
        if let Some(registry) = file.registry {
            self.registry = RegistryConfig {
                base_url: registry.base_url.trim_end_matches('/').to_string(),
                timeout_secs: registry.timeout_secs,
            };
        }
        if let Some(url) = file.debian_release_url {
            self.debian_release_url = url;
        }
    }

    fn apply_overrides(&mut self, root: &Path, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.source_base_dir {
            self.source_base_dir = resolve(root, &dir);
        }
        if let Some(namespace) = overrides.image_namespace {
            self.image_namespace = namespace;
        }
        if let Some(dir) = overrides.template_dir {
            self.template_dir = Some(resolve(root, &dir));
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = resolve(root, &dir);
        }
        if let Some(dir) = overrides.workflows_dir {
            self.workflows_dir = resolve(root, &dir);
        }
        if let Some(url) = overrides.registry_url {
            self.registry.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = overrides.debian_release_url {
            self.debian_release_url = url;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.image_namespace.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "image_namespace must not be empty".to_string(),
            }
            .into());
        }
        if !self.registry.base_url.starts_with("http://")
            && !self.registry.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation {
                message: format!(
                    "registry base_url must start with http:// or https://, got '{}'",
                    self.registry.base_url
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Directory holding the build trees of one image (and optional type)
    pub fn image_base_dir(&self, image_name: &str, image_type: Option<&str>) -> PathBuf {
        let base = self.source_base_dir.join(image_name);
        match image_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(image_type) => base.join(image_type),
            None => base,
        }
    }

    /// Published name of a built image (e.g. `neunerlei/nginx`)
    pub fn target_image(&self, image_name: &str) -> String {
        format!("{}/{}", self.image_namespace, image_name)
    }
}

impl ConfigFile {
    /// Parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&content).map_err(|e| {
            ConfigError::Parsing {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
