//! Discover subcommand implementation
//!
//! Lists the tags of the upstream image and of the already published image,
//! generates the build matrix for the newest upstream versions and emits the
//! matrix plus the tag lists consumed by the tag list step.

use anyhow::Result;
use indexmap::IndexSet;
use tagwarden_core::config::ReleaseConfig;
use tagwarden_core::errors::ConfigError;
use tagwarden_core::matrix::{generate_build_matrix, BuildMatrix, MatrixOptions, MatrixOutcome};
use tagwarden_core::outputs::StepOutputs;
use tagwarden_core::registry::{HttpClient, RegistryClient};
use tagwarden_core::version::{parse_version_tags, Precision};
use tracing::{info, instrument};

use super::non_blank;

/// Arguments for the discover subcommand.
#[derive(Debug, Clone)]
pub struct DiscoverArgs {
    pub image_name: String,
    pub image_type: Option<String>,
    pub source_image_namespace: String,
    pub source_image_name: String,
    pub source_image_type: Option<String>,
    pub tracked_versions: usize,
    /// Last version to build before the image is retired
    pub deprecated: Option<String>,
    pub version_precision: Precision,
    pub latest_tag: bool,
}

/// Everything the discover step reports
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverOutcome {
    /// Matrix to build; empty when nothing needs building
    pub matrix: BuildMatrix,
    pub build_needed: bool,
    /// Published image without tag, e.g. `neunerlei/nginx`
    pub image: String,
    /// Display name, e.g. `neunerlei/nginx (alpine)`
    pub image_name: String,
    /// Tags produced by this build
    pub maintained_tags: Vec<String>,
    /// Versions already published followed by the new tags, deduplicated
    pub all_tags: Vec<String>,
    pub deprecated: bool,
}

impl DiscoverOutcome {
    /// Step outputs in emission order
    pub fn outputs(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("build-matrix", serde_json::to_string(&self.matrix)?),
            ("build-needed", self.build_needed.to_string()),
            ("image", self.image.clone()),
            ("image-name", self.image_name.clone()),
            ("tag-list-maintained", self.maintained_tags.join(",")),
            ("tag-list-all", self.all_tags.join(",")),
            ("deprecated", self.deprecated.to_string()),
        ])
    }
}

fn require(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingInput {
            name: name.to_string(),
        }
        .into());
    }
    Ok(trimmed.to_string())
}

/// Compute the discover outcome against the given registry
#[instrument(level = "info", skip_all, fields(image_name = %args.image_name))]
pub async fn discover<C: HttpClient>(
    registry: &RegistryClient<C>,
    args: &DiscoverArgs,
    config: &ReleaseConfig,
) -> Result<DiscoverOutcome> {
    let image_name = require("image-name", &args.image_name)?;
    let namespace = require("source-image-namespace", &args.source_image_namespace)?;
    let source_name = require("source-image-name", &args.source_image_name)?;
    let image_type = non_blank(args.image_type.as_deref());
    let source_type = non_blank(args.source_image_type.as_deref());

    let source_image = format!("{}/{}", namespace, source_name);
    let target_image = config.target_image(&image_name);
    info!(
        "Starting build matrix discovery for image: {} based on source image: {}",
        target_image, source_image
    );

    let (source_tags, target_tags) = tokio::try_join!(
        registry.list_tags(&source_image),
        registry.list_tags(&target_image)
    )?;
    info!("Using version precision: {}", args.version_precision);

    info!(
        "Discovered {} tags for source image {}",
        source_tags.len(),
        source_image
    );
    let source_versions =
        parse_version_tags(&source_tags, args.version_precision, source_type.as_deref());
    info!(
        "Parsed {} unique versions from source image tags",
        source_versions.len()
    );

    info!(
        "There are currently {} tags for target image {}",
        target_tags.len(),
        target_image
    );
    let target_versions =
        parse_version_tags(&target_tags, args.version_precision, image_type.as_deref());
    info!(
        "Parsed {} unique versions from target image tags",
        target_versions.len()
    );

    let last_version = non_blank(args.deprecated.as_deref());
    if let Some(last_version) = &last_version {
        info!(
            "Deprecation mode enabled. Last version to build: {}",
            last_version
        );
    }
    info!(
        "Tracking the latest {} versions for building",
        args.tracked_versions
    );

    let options = MatrixOptions {
        target_image_type: image_type.clone(),
        detect_latest_version: args.latest_tag,
        tracked_versions: args.tracked_versions,
        last_version: last_version.clone(),
        ..MatrixOptions::new(
            source_image.as_str(),
            image_name.as_str(),
            config.source_base_dir.as_path(),
        )
    };

    let matrix = match generate_build_matrix(&options, &source_versions)? {
        MatrixOutcome::Build { matrix, .. } => {
            info!("Build matrix generated with {} entries:", matrix.include.len());
            for entry in &matrix.include {
                info!(
                    " - Version: {}, Tag: {}, Source Image: {}, Build Path: {}, Is Latest: {}",
                    entry.version,
                    entry.tag,
                    entry.source_image_with_tag,
                    entry.build_path.display(),
                    entry.is_latest
                );
            }
            matrix
        }
        MatrixOutcome::NoBuild(reason) => {
            info!("No builds needed: {}", reason);
            BuildMatrix::default()
        }
    };

    let maintained_tags = matrix.tags();
    let mut all_tags: IndexSet<String> = target_versions.keys().cloned().collect();
    all_tags.extend(maintained_tags.iter().cloned());

    let display_name = match &image_type {
        Some(image_type) => format!("{} ({})", target_image, image_type),
        None => target_image.clone(),
    };

    Ok(DiscoverOutcome {
        build_needed: !matrix.is_empty(),
        matrix,
        image: target_image,
        image_name: display_name,
        maintained_tags,
        all_tags: all_tags.into_iter().collect(),
        deprecated: last_version.is_some(),
    })
}

/// Executes the discover subcommand and writes its step outputs.
pub async fn run(args: DiscoverArgs, config: &ReleaseConfig) -> Result<()> {
    let registry = RegistryClient::from_config(&config.registry)?;
    let outcome = discover(&registry, &args, config).await?;
    StepOutputs::from_env().set_all(outcome.outputs()?)?;
    Ok(())
}
