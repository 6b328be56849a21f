//! Check-debian subcommand implementation
//!
//! Moves `source-image-os` pins to the current Debian stable codename and,
//! inside CI, proposes the change as a pull request.

use anyhow::{anyhow, Result};
use tagwarden_core::config::ReleaseConfig;
use tagwarden_core::debian::{
    fetch_stable_codename, find_codename_aware_jobs, jobs_needing_update, update_workflow_files,
    verify_jobs, CODENAME_FETCH_TIMEOUT,
};
use tagwarden_core::process::{CommandRunner, TokioCommandRunner};
use tagwarden_core::pull_request::{create_or_update_pull_request, PullRequestSpec};
use tagwarden_core::registry::{HttpClient, RegistryClient, ReqwestClient};
use tracing::{info, instrument, warn};

/// Arguments for the check-debian subcommand.
#[derive(Debug, Clone, Default)]
pub struct CheckDebianArgs {
    /// Commit the changed files and open or update a pull request
    pub pull_request: bool,
}

/// What a check-debian run did
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// No workflow pins a codename
    NoJobs,
    /// Every pin already matches the stable codename
    UpToDate { codename: String },
    /// Workflow files were rewritten
    Updated {
        current_codename: String,
        new_codename: String,
        updated_files: Vec<String>,
        all_verified: bool,
        /// Number of the created or updated PR, when one was handled
        pull_request: Option<String>,
    },
}

/// Run the codename check with explicit clients
#[instrument(level = "info", skip_all)]
pub async fn check<D, C, R>(
    release_client: &D,
    registry: &RegistryClient<C>,
    runner: &R,
    args: &CheckDebianArgs,
    config: &ReleaseConfig,
) -> Result<CheckOutcome>
where
    D: HttpClient,
    C: HttpClient,
    R: CommandRunner + ?Sized,
{
    info!("Fetching current Debian stable codename...");
    let codename = fetch_stable_codename(release_client, &config.debian_release_url).await?;
    info!("Current Debian stable: {}", codename);

    let jobs = find_codename_aware_jobs(&config.workflows_dir)?;
    if jobs.is_empty() {
        info!("No Debian-aware jobs found in workflow files");
        return Ok(CheckOutcome::NoJobs);
    }
    info!("Found {} Debian-aware job(s)", jobs.len());

    let needing_update = jobs_needing_update(&jobs, &codename);
    let Some(first) = needing_update.first() else {
        info!("All jobs are already using {}. Nothing to do.", codename);
        return Ok(CheckOutcome::UpToDate { codename });
    };
    let current_codename = first.current_os.clone();
    info!(
        "{} job(s) need updating from {} to {}",
        needing_update.len(),
        current_codename,
        codename
    );

    let summary = verify_jobs(registry, &jobs, &codename, &config.source_base_dir).await?;
    if summary.all_verified {
        info!("All upstream images are available for {}", codename);
    } else {
        warn!(
            "Some upstream images are not yet available for {}, the pull request will be a draft",
            codename
        );
    }

    let updated_files = update_workflow_files(&needing_update, &codename)?;
    info!("Updated {} workflow file(s)", updated_files.len());

    let pull_request = if args.pull_request {
        let spec = PullRequestSpec::for_codename_update(
            &current_codename,
            &codename,
            summary.all_verified,
            updated_files.clone(),
            &config.workflows_dir,
            summary.results,
        );
        create_or_update_pull_request(runner, &spec, &config.output_dir).await?
    } else {
        info!("Not running in CI, skipping pull request creation");
        None
    };

    Ok(CheckOutcome::Updated {
        current_codename,
        new_codename: codename,
        updated_files,
        all_verified: summary.all_verified,
        pull_request,
    })
}

/// Executes the check-debian subcommand.
pub async fn run(args: CheckDebianArgs, config: &ReleaseConfig) -> Result<()> {
    let release_client = ReqwestClient::with_timeout(Some(CODENAME_FETCH_TIMEOUT))
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
    let registry = RegistryClient::from_config(&config.registry)?;
    let runner = TokioCommandRunner::new();

    match check(&release_client, &registry, &runner, &args, config).await? {
        CheckOutcome::Updated {
            pull_request: Some(number),
            ..
        } => info!("Pull request #{} is up to date", number),
        CheckOutcome::Updated { updated_files, .. } => {
            info!("Changed files: {}", updated_files.join(", "))
        }
        CheckOutcome::NoJobs | CheckOutcome::UpToDate { .. } => {}
    }
    Ok(())
}
