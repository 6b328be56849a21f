//! CI workflow file reading
//!
//! Image workflows call the shared build engine through jobs such as:
//!
//! ```yaml
//! jobs:
//!   call-build-engine:
//!     uses: ./.github/workflows/_build-engine.yml
//!     with:
//!       image-name: nginx
//!       source-image-namespace: library
//!       source-image-name: nginx
//!       source-image-os: 'bookworm'
//!       tracked-versions: 3
//!       latest-tag: true
//! ```
//!
//! Only the `with:` inputs of each job are read; everything else is ignored.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;
use tracing::debug;

use crate::errors::{Result, WorkflowError};
use crate::version::{parse_leading_integer, Precision};

/// Parsed workflow file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowFile {
    #[serde(default)]
    jobs: Option<IndexMap<String, WorkflowJob>>,
}

/// A job of a workflow file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowJob {
    #[serde(default, rename = "with")]
    inputs: Option<JobInputs>,
}

impl WorkflowJob {
    /// The job's `with:` inputs (empty when absent)
    pub fn inputs(&self) -> JobInputs {
        self.inputs.clone().unwrap_or_default()
    }
}

/// `with:` inputs of a build-engine job
///
/// YAML scalars are accepted as strings, numbers or booleans. Empty strings
/// count as unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct JobInputs(IndexMap<String, Value>);

impl JobInputs {
    /// Scalar input rendered as a string; `None` for absent, empty or non-scalar values
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match self.0.get(key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }

    pub fn image_name(&self) -> Option<String> {
        self.get("image-name")
    }

    pub fn image_type(&self) -> Option<String> {
        self.get("image-type")
    }

    pub fn source_image_namespace(&self) -> Option<String> {
        self.get("source-image-namespace")
    }

    pub fn source_image_name(&self) -> Option<String> {
        self.get("source-image-name")
    }

    pub fn source_image_type(&self) -> Option<String> {
        self.get("source-image-type")
    }

    /// Base OS codename; only a non-blank string value counts
    pub fn source_image_os(&self) -> Option<String> {
        match self.0.get("source-image-os") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    /// Last version of a deprecated image
    pub fn deprecated(&self) -> Option<String> {
        self.get("deprecated")
    }

    /// `tracked-versions`, or `default` when absent or not a non-negative integer
    pub fn tracked_versions(&self, default: usize) -> usize {
        self.get("tracked-versions")
            .and_then(|v| parse_leading_integer(&v))
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(default)
    }

    /// `version-precision`, [`Precision::Full`] when absent
    pub fn version_precision(&self) -> Precision {
        self.get("version-precision")
            .map(|v| Precision::parse_lenient(&v))
            .unwrap_or_default()
    }

    /// `latest-tag` as a YAML boolean or a case-insensitive `"true"`
    pub fn latest_tag(&self) -> bool {
        match self.0.get("latest-tag") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

impl WorkflowFile {
    /// Read and parse a workflow file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WorkflowError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path).map_err(WorkflowError::Io)?;
        Self::parse(&content, path)
    }

    /// Parse workflow YAML; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let workflow: Self = serde_yaml::from_str(content).map_err(|e| WorkflowError::Parsing {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(
            "Parsed workflow {} with {} jobs",
            path.display(),
            workflow.job_names().len()
        );
        Ok(workflow)
    }

    pub fn job(&self, name: &str) -> Option<&WorkflowJob> {
        self.jobs.as_ref()?.get(name)
    }

    /// Job names in file order
    pub fn job_names(&self) -> Vec<String> {
        self.jobs
            .as_ref()
            .map(|jobs| jobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All jobs in file order
    pub fn jobs(&self) -> impl Iterator<Item = (&String, &WorkflowJob)> {
        self.jobs.iter().flat_map(|jobs| jobs.iter())
    }
}

/// Job names tried by [`find_build_job`], in order
pub fn build_job_candidates(image_type: Option<&str>) -> Vec<String> {
    let mut candidates = vec!["call-build-engine".to_string()];
    if let Some(image_type) = image_type.filter(|t| !t.is_empty()) {
        candidates.push(format!("call-build-engine-{}", image_type));
        candidates.push(format!("call-{}", image_type));
    }
    candidates
}

/// Locate the build-engine job of an image workflow
///
/// Tries `call-build-engine`, then `call-build-engine-<type>` and
/// `call-<type>` when an image type is given.
pub fn find_build_job<'a>(
    workflow: &'a WorkflowFile,
    image_type: Option<&str>,
) -> Result<(String, &'a WorkflowJob)> {
    let candidates = build_job_candidates(image_type);
    for candidate in &candidates {
        if let Some(job) = workflow.job(candidate) {
            debug!("Selected workflow job {}", candidate);
            return Ok((candidate.clone(), job));
        }
    }
    Err(WorkflowError::JobNotFound {
        candidates,
        available: workflow.job_names(),
    }
    .into())
}
