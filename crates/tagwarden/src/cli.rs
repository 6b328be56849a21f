use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tagwarden_core::config::{ConfigOverrides, ReleaseConfig};

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

/// Parse a pipeline boolean input (`true`/`false`, case-insensitive; empty is false)
pub fn parse_bool_input(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        other => Err(format!(
            "expected `true` or `false`, got `{}`",
            other
        )),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover upstream versions and emit the build matrix as step outputs
    Discover {
        /// Name of the image to build (directory below the source dir, e.g. nginx)
        #[arg(long, env = "INPUT_IMAGE-NAME")]
        image_name: String,
        /// Variant of the image to build (sub-directory, e.g. fpm-debian)
        #[arg(long, env = "INPUT_IMAGE-TYPE")]
        image_type: Option<String>,
        /// Namespace of the upstream image (e.g. library)
        #[arg(long, env = "INPUT_SOURCE-IMAGE-NAMESPACE")]
        source_image_namespace: String,
        /// Name of the upstream image (e.g. nginx)
        #[arg(long, env = "INPUT_SOURCE-IMAGE-NAME")]
        source_image_name: String,
        /// Only consider upstream tags ending in `-<type>` (e.g. alpine)
        #[arg(long, env = "INPUT_SOURCE-IMAGE-TYPE")]
        source_image_type: Option<String>,
        /// Number of newest versions to build
        #[arg(long, env = "INPUT_TRACKED-VERSIONS", default_value = "3")]
        tracked_versions: String,
        /// Last version to build before the image is retired
        #[arg(long, env = "INPUT_DEPRECATED")]
        deprecated: Option<String>,
        /// Number of version segments (1-3)
        #[arg(long, env = "INPUT_VERSION-PRECISION", default_value = "3")]
        version_precision: String,
        /// Also tag the newest build as `latest`
        #[arg(long, env = "INPUT_LATEST-TAG", default_value = "false", value_parser = parse_bool_input, action = ArgAction::Set)]
        latest_tag: bool,
    },

    /// Render the HTML tag list page of an image
    TagList {
        /// Full image name without tag (e.g. neunerlei/nginx)
        #[arg(long, env = "INPUT_IMAGE")]
        image: String,
        /// Display name of the image (e.g. neunerlei/nginx (alpine))
        #[arg(long, env = "INPUT_IMAGE-NAME")]
        image_name: String,
        /// Render the deprecation notice
        #[arg(long, env = "INPUT_DEPRECATED", default_value = "false", value_parser = parse_bool_input, action = ArgAction::Set)]
        deprecated: bool,
        /// Comma-separated maintained tags
        #[arg(long, env = "INPUT_MAINTAINED-TAGS", default_value = "")]
        maintained_tags: String,
        /// Comma-separated list of all known tags
        #[arg(long, env = "INPUT_ALL-TAGS", default_value = "")]
        all_tags: String,
        /// Whether the `latest` tag was built
        #[arg(long, env = "INPUT_LATEST-TAG-BUILT", default_value = "false", value_parser = parse_bool_input, action = ArgAction::Set)]
        latest_tag_built: bool,
    },

    /// Build one image version locally with docker
    LocalBuild {
        /// Image name (matches `<workflows-dir>/<image>.yml`)
        image: String,
        /// Upstream version to build (e.g. 1.25.3)
        #[arg(value_name = "VERSION")]
        source_version: String,
        /// Optional image type selecting a typed build job
        image_type: Option<String>,
        /// Print the docker command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Move pinned Debian codenames to the current stable release
    CheckDebian {
        /// Commit the changes and open or update a pull request
        #[arg(long, env = "GITHUB_ACTIONS", default_value = "false", value_parser = parse_bool_input, action = ArgAction::Set)]
        pull_request: bool,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Release automation for multi-image container builds",
    long_about = "Release automation for multi-image container builds\n\nDiscovers upstream version tags, generates CI build matrices, renders tag list pages and keeps pinned Debian codenames current.",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via TAGWARDEN_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Repository root; relative paths are resolved against it
    #[arg(long, global = true, value_name = "PATH", env = "TAGWARDEN_REPO_ROOT")]
    pub repo_root: Option<PathBuf>,

    /// Configuration file path (defaults to tagwarden.toml in the repository root)
    #[arg(long, global = true, value_name = "PATH", env = "TAGWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the per-image build trees
    #[arg(long, global = true, value_name = "PATH", env = "TAGWARDEN_SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Directory for generated artifacts
    #[arg(long, global = true, value_name = "PATH", env = "TAGWARDEN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory holding the CI workflow files
    #[arg(long, global = true, value_name = "PATH", env = "TAGWARDEN_WORKFLOWS_DIR")]
    pub workflows_dir: Option<PathBuf>,

    /// Directory with template overrides
    #[arg(long, global = true, value_name = "PATH", env = "TAGWARDEN_TEMPLATE_DIR")]
    pub template_dir: Option<PathBuf>,

    /// Namespace built images are published under
    #[arg(long, global = true, env = "TAGWARDEN_IMAGE_NAMESPACE")]
    pub image_namespace: Option<String>,

    /// Registry API base URL
    #[arg(long, global = true, value_name = "URL", env = "TAGWARDEN_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Debian stable Release file URL
    #[arg(long, global = true, value_name = "URL", env = "TAGWARDEN_DEBIAN_RELEASE_URL")]
    pub debian_release_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn load_config(&self) -> Result<ReleaseConfig> {
        let root = match &self.repo_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let overrides = ConfigOverrides {
            source_base_dir: self.source_dir.clone(),
            image_namespace: self.image_namespace.clone(),
            template_dir: self.template_dir.clone(),
            output_dir: self.output_dir.clone(),
            workflows_dir: self.workflows_dir.clone(),
            registry_url: self.registry_url.clone(),
            debian_release_url: self.debian_release_url.clone(),
        };
        Ok(ReleaseConfig::load(&root, self.config.as_deref(), overrides)?)
    }

    pub async fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };

        let log_level = match self.log_level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        if std::env::var_os("TAGWARDEN_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var(
                "RUST_LOG",
                format!("tagwarden={},tagwarden_core={}", log_level, log_level),
            );
        }
        tagwarden_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let config = self.load_config()?;

        match self.command {
            Commands::Discover {
                image_name,
                image_type,
                source_image_namespace,
                source_image_name,
                source_image_type,
                tracked_versions,
                deprecated,
                version_precision,
                latest_tag,
            } => {
                use crate::commands::discover::{run, DiscoverArgs};

                let args = DiscoverArgs {
                    image_name,
                    image_type,
                    source_image_namespace,
                    source_image_name,
                    source_image_type,
                    tracked_versions: crate::commands::parse_count(&tracked_versions, 3),
                    deprecated,
                    version_precision: tagwarden_core::version::Precision::parse_lenient(
                        &version_precision,
                    ),
                    latest_tag,
                };
                run(args, &config).await
            }
            Commands::TagList {
                image,
                image_name,
                deprecated,
                maintained_tags,
                all_tags,
                latest_tag_built,
            } => {
                use crate::commands::tag_list::{run, TagListArgs};

                let args = TagListArgs {
                    image,
                    image_name,
                    deprecated,
                    maintained_tags: crate::commands::split_list(&maintained_tags),
                    all_tags: crate::commands::split_list(&all_tags),
                    latest_tag_built,
                };
                run(args, &config)
            }
            Commands::LocalBuild {
                image,
                source_version,
                image_type,
                dry_run,
            } => {
                use crate::commands::local_build::{run, LocalBuildArgs};

                let args = LocalBuildArgs {
                    image,
                    version: source_version,
                    image_type,
                    dry_run,
                };
                run(args, &config).await
            }
            Commands::CheckDebian { pull_request } => {
                use crate::commands::check_debian::{run, CheckDebianArgs};

                run(CheckDebianArgs { pull_request }, &config).await
            }
        }
    }
}
