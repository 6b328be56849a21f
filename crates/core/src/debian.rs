//! Debian stable codename tracking
//!
//! Build jobs pin the Debian release their upstream images are based on
//! (`source-image-os: 'bookworm'`). When Debian publishes a new stable
//! release, the pinned codename is moved forward once the upstream images
//! carry tags for it.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::build_path::find_build_path;
use crate::errors::{DebianError, Result, WorkflowError};
use crate::registry::{HttpClient, RegistryClient};
use crate::version::{parse_version_tags, sort_descending, Precision};
use crate::workflow::WorkflowFile;

/// Upper bound for fetching the Debian Release file
pub const CODENAME_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

static CODENAME_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Codename:\s*(\S+)").expect("Valid regex pattern"));

/// Extract the `Codename:` value of a Debian Release file
pub fn parse_codename(release_file: &str) -> Option<String> {
    CODENAME_LINE
        .captures(release_file)
        .map(|c| c[1].trim().to_string())
}

/// Fetch the codename of the current Debian stable release
#[instrument(level = "info", skip(client))]
pub async fn fetch_stable_codename<C: HttpClient>(client: &C, url: &str) -> Result<String> {
    let fetch_error = |message: String| DebianError::Fetch {
        url: url.to_string(),
        message,
    };

    let response = tokio::time::timeout(CODENAME_FETCH_TIMEOUT, client.get(url, HashMap::new()))
        .await
        .map_err(|_| {
            fetch_error(format!(
                "timed out after {}s",
                CODENAME_FETCH_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| fetch_error(e.to_string()))?;

    if !response.is_success() {
        return Err(fetch_error(format!("HTTP {}", response.status)).into());
    }

    let text = String::from_utf8_lossy(&response.body);
    let codename = parse_codename(&text).ok_or(DebianError::MissingCodename)?;
    debug!("Debian stable codename: {}", codename);
    Ok(codename)
}

/// A workflow job that pins a base OS codename
#[derive(Debug, Clone, PartialEq)]
pub struct CodenameJob {
    /// Workflow file name, e.g. `php.yml`
    pub file: String,
    pub file_path: PathBuf,
    pub job_name: String,
    /// Currently pinned codename
    pub current_os: String,
    pub source_image_namespace: String,
    pub source_image_name: String,
    pub source_image_type: Option<String>,
    pub target_image_name: String,
    pub target_image_type: Option<String>,
    pub tracked_versions: usize,
    pub version_precision: Precision,
}

impl CodenameJob {
    pub fn source_image(&self) -> String {
        format!("{}/{}", self.source_image_namespace, self.source_image_name)
    }

    /// `<file> / <job>`
    pub fn job_key(&self) -> String {
        format!("{} / {}", self.file, self.job_name)
    }

    /// Tag filter selecting upstream tags built on `codename`
    pub fn tag_filter(&self, codename: &str) -> String {
        build_tag_filter(self.source_image_type.as_deref(), Some(codename))
    }

    /// Identity of the upstream check; jobs sharing it are verified once
    fn check_key(&self, codename: &str) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.source_image(),
            codename,
            self.version_precision,
            self.tracked_versions,
            self.target_image_name,
            self.target_image_type.as_deref().unwrap_or("")
        )
    }

    fn build_dir(&self, source_base_dir: &Path) -> PathBuf {
        let base = source_base_dir.join(&self.target_image_name);
        match self
            .target_image_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            Some(image_type) => base.join(image_type),
            None => base,
        }
    }
}

/// Join the non-empty filter parts with `-`
///
/// ```rust
/// use tagwarden_core::debian::build_tag_filter;
///
/// assert_eq!(build_tag_filter(Some("fpm"), Some("trixie")), "fpm-trixie");
/// assert_eq!(build_tag_filter(None, Some("trixie")), "trixie");
/// assert_eq!(build_tag_filter(Some(""), None), "");
/// ```
pub fn build_tag_filter(image_type: Option<&str>, os: Option<&str>) -> String {
    [image_type, os]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Scan a workflows directory for jobs that pin `source-image-os`
///
/// Files that fail to parse are reported and skipped.
pub fn find_codename_aware_jobs(workflows_dir: &Path) -> Result<Vec<CodenameJob>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(workflows_dir)
        .map_err(WorkflowError::Io)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yml") | Some("yaml")
                )
        })
        .collect();
    files.sort();

    let mut results = Vec::new();
    for file_path in files {
        let file = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let workflow = match WorkflowFile::load(&file_path) {
            Ok(workflow) => workflow,
            Err(e) => {
                warn!("Failed to parse {}: {}", file, e);
                continue;
            }
        };

        for (job_name, job) in workflow.jobs() {
            let inputs = job.inputs();
            let Some(current_os) = inputs.source_image_os() else {
                continue;
            };
            results.push(CodenameJob {
                file: file.clone(),
                file_path: file_path.clone(),
                job_name: job_name.clone(),
                current_os,
                source_image_namespace: inputs
                    .source_image_namespace()
                    .unwrap_or_else(|| "library".to_string()),
                source_image_name: inputs.source_image_name().unwrap_or_default(),
                source_image_type: inputs.source_image_type(),
                target_image_name: inputs.image_name().unwrap_or_default(),
                target_image_type: inputs.image_type(),
                tracked_versions: inputs.tracked_versions(1),
                version_precision: inputs.version_precision(),
            });
        }
    }

    debug!("Found {} codename-aware jobs", results.len());
    Ok(results)
}

/// Jobs whose pinned codename differs from `codename`
pub fn jobs_needing_update<'a>(jobs: &'a [CodenameJob], codename: &str) -> Vec<&'a CodenameJob> {
    jobs.iter().filter(|job| job.current_os != codename).collect()
}

/// Upstream availability of one job's versions for a new codename
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub job_key: String,
    pub source_image: String,
    pub image_filter: String,
    pub passed: bool,
    /// Versions with a build path and a codename tag
    pub buildable: Vec<String>,
    /// Versions with a build path but no codename tag yet
    pub missing_codename: Vec<String>,
    /// Versions without a build path
    pub no_build_path: Vec<String>,
}

/// Result of [`verify_jobs`]
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSummary {
    pub results: Vec<VerificationResult>,
    pub all_verified: bool,
}

/// Check whether the newest versions of a job's upstream image exist for `codename`
pub async fn verify_upstream_availability<C: HttpClient>(
    registry: &RegistryClient<C>,
    job: &CodenameJob,
    codename: &str,
    source_base_dir: &Path,
) -> Result<VerificationResult> {
    let source_image = job.source_image();
    let type_filter = job.source_image_type.as_deref().unwrap_or("");
    let codename_filter = job.tag_filter(codename);
    let build_dir = job.build_dir(source_base_dir);

    let all_tags = registry.list_tags(&source_image).await?;
    let all_versions = parse_version_tags(&all_tags, job.version_precision, Some(type_filter));
    let codename_versions =
        parse_version_tags(&all_tags, job.version_precision, Some(&codename_filter));

    let newest: Vec<&str> = sort_descending(all_versions.keys().map(String::as_str))
        .into_iter()
        .take(job.tracked_versions)
        .collect();

    let mut buildable = Vec::new();
    let mut missing_codename = Vec::new();
    let mut no_build_path = Vec::new();
    for version in newest {
        if find_build_path(&build_dir, version).is_none() {
            no_build_path.push(version.to_string());
        } else if codename_versions.contains_key(version) {
            buildable.push(version.to_string());
        } else {
            missing_codename.push(version.to_string());
        }
    }

    Ok(VerificationResult {
        job_key: job.job_key(),
        source_image,
        image_filter: codename_filter,
        passed: missing_codename.is_empty() && !buildable.is_empty(),
        buildable,
        missing_codename,
        no_build_path,
    })
}

/// Verify every distinct upstream check for `codename`
///
/// Jobs that share image, codename, precision, window and target are checked
/// once. A job that does not pass is recorded; registry failures abort.
#[instrument(level = "info", skip(registry, jobs, source_base_dir), fields(jobs = jobs.len()))]
pub async fn verify_jobs<C: HttpClient>(
    registry: &RegistryClient<C>,
    jobs: &[CodenameJob],
    codename: &str,
    source_base_dir: &Path,
) -> Result<VerificationSummary> {
    let mut results = Vec::new();
    let mut all_verified = true;
    let mut checks_performed = HashSet::new();

    for job in jobs {
        let source_image = job.source_image();
        let image_filter = job.tag_filter(codename);
        if !checks_performed.insert(job.check_key(codename)) {
            info!(
                "Skipping duplicate check for {} (filter: {})",
                source_image, image_filter
            );
            continue;
        }

        info!(
            "Checking {} → {} (filter: {})...",
            job.job_key(),
            source_image,
            image_filter
        );
        let result = verify_upstream_availability(registry, job, codename, source_base_dir).await?;

        if result.passed {
            info!(
                "✓ {} buildable: {}",
                result.buildable.len(),
                result.buildable.join(", ")
            );
            if !result.no_build_path.is_empty() {
                info!(
                    "{} skipped (no build path): {}",
                    result.no_build_path.len(),
                    result.no_build_path.join(", ")
                );
            }
        } else {
            all_verified = false;
            if !result.missing_codename.is_empty() {
                warn!(
                    "✗ Awaiting codename tag: {}",
                    result.missing_codename.join(", ")
                );
            }
            if result.buildable.is_empty() {
                warn!("✗ No buildable versions found with codename '{}'", codename);
            }
        }
        results.push(result);
    }

    Ok(VerificationSummary {
        results,
        all_verified,
    })
}

/// Move the pinned codename of `jobs` to `codename`
///
/// Only quoted `source-image-os:` values equal to the job's current codename
/// are rewritten; the rest of each file is left byte-for-byte intact.
/// Returns the names of the files that changed.
pub fn update_workflow_files(jobs: &[&CodenameJob], codename: &str) -> Result<Vec<String>> {
    let mut jobs_by_file: IndexMap<&Path, Vec<&CodenameJob>> = IndexMap::new();
    for &job in jobs {
        jobs_by_file
            .entry(job.file_path.as_path())
            .or_default()
            .push(job);
    }

    let mut updated_files = Vec::new();
    for (file_path, file_jobs) in jobs_by_file {
        let original = std::fs::read_to_string(file_path).map_err(WorkflowError::Io)?;
        let mut content = original.clone();

        for job in &file_jobs {
            let old = regex::escape(&job.current_os);
            for quote in ['\'', '"'] {
                let pattern = Regex::new(&format!(r"(source-image-os:\s*{quote}){old}({quote})"))
                    .map_err(|e| WorkflowError::Parsing {
                        path: file_path.display().to_string(),
                        message: e.to_string(),
                    })?;
                content = pattern
                    .replace_all(&content, |caps: &Captures| {
                        format!("{}{}{}", &caps[1], codename, &caps[2])
                    })
                    .into_owned();
            }
        }

        if content != original {
            std::fs::write(file_path, &content).map_err(WorkflowError::Io)?;
            if let Some(job) = file_jobs.first() {
                updated_files.push(job.file.clone());
            }
        }
    }

    Ok(updated_files)
}
