//! Local build subcommand implementation
//!
//! Development helper that builds one upstream version of an image with the
//! same inputs the CI workflow would use.

use anyhow::{bail, Result};
use std::path::PathBuf;
use tagwarden_core::config::ReleaseConfig;
use tagwarden_core::errors::ConfigError;
use tagwarden_core::matrix::{generate_build_matrix, MatrixOptions, MatrixOutcome};
use tagwarden_core::process::{command_line, CommandRunner, TokioCommandRunner};
use tagwarden_core::registry::{HttpClient, RegistryClient};
use tagwarden_core::version::{parse_version_tags, VersionMap};
use tagwarden_core::workflow::{find_build_job, WorkflowFile};
use tracing::{error, info, instrument};

use super::non_blank;

/// Arguments for the local-build subcommand.
#[derive(Debug, Clone)]
pub struct LocalBuildArgs {
    /// Image name, matching `<workflows_dir>/<image>.yml`
    pub image: String,
    /// Upstream version to build
    pub version: String,
    /// Selects a typed build job
    pub image_type: Option<String>,
    /// Print the docker command instead of running it
    pub dry_run: bool,
}

/// A resolved `docker build` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BuildPlan {
    /// Directory the build runs in
    pub build_path: PathBuf,
    /// `<namespace>/<image>:<tag>`
    pub image_tag: String,
    /// Arguments passed to `docker`
    pub docker_args: Vec<String>,
}

impl BuildPlan {
    pub fn command_line(&self) -> String {
        let args: Vec<&str> = self.docker_args.iter().map(String::as_str).collect();
        command_line("docker", &args)
    }
}

/// Resolve the build of `args.version` from the image workflow
#[instrument(level = "info", skip_all, fields(image = %args.image, version = %args.version))]
pub async fn plan<C: HttpClient>(
    registry: &RegistryClient<C>,
    args: &LocalBuildArgs,
    config: &ReleaseConfig,
) -> Result<BuildPlan> {
    let image = args.image.trim();
    let version = args.version.trim();
    if image.is_empty() || version.is_empty() {
        bail!("Image name and source version are required arguments");
    }

    let workflow_path = config.workflows_dir.join(format!("{}.yml", image));
    let workflow = WorkflowFile::load(&workflow_path)?;
    let requested_type = non_blank(args.image_type.as_deref());
    let (job_name, job) = find_build_job(&workflow, requested_type.as_deref())?;
    let inputs = job.inputs();

    if let Some(job_image) = inputs.image_name() {
        if job_image != image {
            bail!(
                "The image-name \"{}\" of job {} does not match the provided image name \"{}\"",
                job_image,
                job_name,
                image
            );
        }
    }

    let (Some(namespace), Some(source_name)) =
        (inputs.source_image_namespace(), inputs.source_image_name())
    else {
        bail!("Source image namespace and name must be defined in job {}", job_name);
    };

    let image_type = inputs.image_type();
    let source_type = inputs.source_image_type();
    let precision = inputs.version_precision();
    let source_image = format!("{}/{}", namespace, source_name);
    let target_image = config.target_image(image);

    info!("Building image: {}", target_image);
    info!("Using source image: {}", source_image);
    info!("Image type: {}", image_type.as_deref().unwrap_or(""));
    info!("Tracked versions: {}", inputs.tracked_versions(3));
    info!("Deprecated version: {}", inputs.deprecated().unwrap_or_default());
    info!("Version precision: {}", precision);
    info!("Detect latest version: {}", inputs.latest_tag());

    let source_tags = registry.list_tags(&source_image).await?;
    let source_versions = parse_version_tags(&source_tags, precision, source_type.as_deref());

    let Some(original_tag) = source_versions.get(version) else {
        let available: Vec<&str> = source_versions.keys().map(String::as_str).collect();
        error!("Available source versions: {}", available.join(", "));
        return Err(ConfigError::InvalidInput {
            name: "version".to_string(),
            message: format!(
                "Source version \"{}\" not found among available source image tags",
                version
            ),
        }
        .into());
    };

    let mut single = VersionMap::new();
    single.insert(version.to_string(), original_tag.clone());
    let options = MatrixOptions {
        target_image_type: image_type,
        tracked_versions: 1,
        ..MatrixOptions::new(
            source_image.as_str(),
            image,
            config.source_base_dir.as_path(),
        )
    };

    let entry = match generate_build_matrix(&options, &single)? {
        MatrixOutcome::Build { mut matrix, .. } if !matrix.include.is_empty() => {
            matrix.include.remove(0)
        }
        MatrixOutcome::Build { .. } => bail!("No build matrix could be generated for {}", version),
        MatrixOutcome::NoBuild(reason) => {
            bail!("No build matrix could be generated for {}: {}", version, reason)
        }
    };

    info!("Build entry:");
    info!(" - Version: {}", entry.version);
    info!(" - Tag: {}", entry.tag);
    info!(" - Source Image with Tag: {}", entry.source_image_with_tag);
    info!(" - Build Path: {}", entry.build_path.display());

    let image_tag = format!("{}:{}", target_image, entry.tag);
    let common_dir = config.source_base_dir.join("_common");
    let docker_args = vec![
        "build".to_string(),
        "-t".to_string(),
        image_tag.clone(),
        "--build-context".to_string(),
        format!("common={}", common_dir.display()),
        "--progress=plain".to_string(),
        "--build-arg".to_string(),
        format!("SOURCE_IMAGE={}", entry.source_image_with_tag),
        ".".to_string(),
    ];

    Ok(BuildPlan {
        build_path: entry.build_path,
        image_tag,
        docker_args,
    })
}

/// Run the planned docker build
pub async fn execute<R: CommandRunner + ?Sized>(runner: &R, plan: &BuildPlan) -> Result<()> {
    let args: Vec<&str> = plan.docker_args.iter().map(String::as_str).collect();
    runner.run_interactive("docker", &args).await?;
    info!("Built {}", plan.image_tag);
    Ok(())
}

/// Executes the local-build subcommand.
pub async fn run(args: LocalBuildArgs, config: &ReleaseConfig) -> Result<()> {
    let registry = RegistryClient::from_config(&config.registry)?;
    let plan = plan(&registry, &args, config).await?;

    if args.dry_run {
        println!("cd {} && {}", plan.build_path.display(), plan.command_line());
        return Ok(());
    }

    let runner = TokioCommandRunner::in_dir(&plan.build_path);
    execute(&runner, &plan).await
}
