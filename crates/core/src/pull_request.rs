//! Pull request automation for codename updates
//!
//! Commits updated workflow files to a dedicated branch and opens (or
//! refreshes) a pull request through the `git` and `gh` CLIs. The PR stays a
//! draft until every upstream image has been verified.

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::debian::VerificationResult;
use crate::errors::Result;
use crate::process::CommandRunner;

/// File name of the rendered PR body inside the output directory
pub const PR_BODY_FILE: &str = "debian-update-pr-body.md";

const BOT_NAME: &str = "github-actions[bot]";
const BOT_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";

/// Everything needed to create or update the codename PR
#[derive(Debug, Clone)]
pub struct PullRequestSpec {
    pub branch_name: String,
    pub commit_message: String,
    pub title: String,
    pub current_codename: String,
    pub new_codename: String,
    pub all_verified: bool,
    /// File names listed in the PR body
    pub updated_files: Vec<String>,
    /// Paths staged with `git add`
    pub updated_file_paths: Vec<PathBuf>,
    pub verification_results: Vec<VerificationResult>,
    pub is_draft: bool,
}

impl PullRequestSpec {
    /// Standard branch, title and draft state for a codename transition
    pub fn for_codename_update(
        current_codename: &str,
        new_codename: &str,
        all_verified: bool,
        updated_files: Vec<String>,
        workflows_dir: &Path,
        verification_results: Vec<VerificationResult>,
    ) -> Self {
        let title = format!(
            "chore(deps): update Debian stable from {} to {}",
            current_codename, new_codename
        );
        let updated_file_paths = updated_files.iter().map(|f| workflows_dir.join(f)).collect();
        Self {
            branch_name: format!("debian-stable/{}", new_codename),
            commit_message: title.clone(),
            title,
            current_codename: current_codename.to_string(),
            new_codename: new_codename.to_string(),
            all_verified,
            updated_files,
            updated_file_paths,
            verification_results,
            is_draft: !all_verified,
        }
    }
}

/// Markdown body of the codename PR
pub fn build_pr_body(
    current_codename: &str,
    new_codename: &str,
    all_verified: bool,
    updated_files: &[String],
    verification_results: &[VerificationResult],
    checked_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        format!(
            "## Debian Stable Update: {} → {}",
            current_codename, new_codename
        ),
        String::new(),
    ];

    if all_verified {
        lines.push("✅ **All upstream images verified.** This PR is ready to merge.".to_string());
    } else {
        lines.push(
            "⏳ **Waiting for upstream images.** This PR will be marked as ready for review automatically once all checks pass."
                .to_string(),
        );
    }

    lines.push(String::new());
    lines.push("### Verification Results".to_string());
    lines.push(String::new());

    for result in verification_results {
        let icon = if result.passed { "✅" } else { "❌" };
        let mut line = format!(
            "- {} `{}` (filter: `{}`)",
            icon, result.source_image, result.image_filter
        );
        if result.buildable.is_empty() {
            line.push_str(" — no buildable versions");
        } else {
            line.push_str(&format!(" — buildable: {}", result.buildable.join(", ")));
        }
        if !result.no_build_path.is_empty() {
            line.push_str(&format!(
                " · skipped (no build path): {}",
                result.no_build_path.join(", ")
            ));
        }
        if !result.missing_codename.is_empty() {
            line.push_str(&format!(
                " · ⚠️ awaiting tag: {}",
                result.missing_codename.join(", ")
            ));
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push("### Updated Files".to_string());
    lines.push(String::new());
    for file in updated_files {
        lines.push(format!("- `{}`", file));
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(format!(
        "*This PR was automatically created by the Debian stable version checker. Last checked: {}*",
        checked_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));

    lines.join("\n")
}

/// Write the PR body to `<output_dir>/debian-update-pr-body.md`
pub fn write_pr_body_file(output_dir: &Path, body: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(PR_BODY_FILE);
    std::fs::write(&path, body)?;
    Ok(path)
}

async fn find_pr_number<R: CommandRunner + ?Sized>(runner: &R, branch: &str) -> String {
    runner
        .run_safe(
            "gh",
            &["pr", "list", "--head", branch, "--json", "number", "--jq", ".[0].number"],
        )
        .await
}

/// Commit, push and create or update the PR; returns the PR number when known
#[instrument(level = "info", skip_all, fields(branch = %spec.branch_name))]
pub async fn create_or_update_pull_request<R: CommandRunner + ?Sized>(
    runner: &R,
    spec: &PullRequestSpec,
    output_dir: &Path,
) -> Result<Option<String>> {
    let body = build_pr_body(
        &spec.current_codename,
        &spec.new_codename,
        spec.all_verified,
        &spec.updated_files,
        &spec.verification_results,
        Utc::now(),
    );
    let body_file = write_pr_body_file(output_dir, &body)?;
    let body_file = body_file.to_string_lossy().into_owned();
    let branch = spec.branch_name.as_str();

    runner.run("git", &["config", "user.name", BOT_NAME]).await?;
    runner
        .run("git", &["config", "user.email", BOT_EMAIL])
        .await?;

    runner.run("git", &["checkout", "-B", branch]).await?;
    for path in &spec.updated_file_paths {
        let path = path.to_string_lossy();
        runner.run("git", &["add", &*path]).await?;
    }

    let staged = runner
        .run("git", &["diff", "--cached", "--name-only"])
        .await?;
    if staged.is_empty() {
        info!("No file changes to commit, updating PR metadata only");
    } else {
        runner
            .run("git", &["commit", "-m", spec.commit_message.as_str()])
            .await?;
        runner
            .run("git", &["push", "origin", branch, "--force"])
            .await?;
    }

    let existing = find_pr_number(runner, branch).await;
    let pr_number = if existing.is_empty() {
        info!("Creating new draft pull request...");
        let url = runner
            .run(
                "gh",
                &[
                    "pr",
                    "create",
                    "--head",
                    branch,
                    "--title",
                    spec.title.as_str(),
                    "--body-file",
                    body_file.as_str(),
                    "--draft",
                ],
            )
            .await?;
        info!("Created PR: {}", url);
        find_pr_number(runner, branch).await
    } else {
        info!("Found existing PR #{}, updating body", existing);
        runner
            .run("gh", &["pr", "edit", existing.as_str(), "--body-file", body_file.as_str()])
            .await?;
        existing
    };

    if pr_number.is_empty() {
        warn!("Could not determine PR number, skipping draft status update");
        return Ok(None);
    }

    if spec.is_draft {
        runner
            .run_safe("gh", &["pr", "ready", pr_number.as_str(), "--undo"])
            .await;
    } else {
        info!("Marking PR #{} as ready for review", pr_number);
        runner.run_safe("gh", &["pr", "ready", pr_number.as_str()]).await;
    }

    Ok(Some(pr_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockCommandRunner;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const LIST: &str = "gh pr list --head debian-stable/trixie --json number --jq .[0].number";

    fn result(passed: bool) -> VerificationResult {
        VerificationResult {
            job_key: "php.yml / call-build-engine".to_string(),
            source_image: "library/php".to_string(),
            image_filter: "fpm-trixie".to_string(),
            passed,
            buildable: if passed { vec!["8.4".to_string()] } else { vec![] },
            missing_codename: if passed { vec![] } else { vec!["8.3".to_string()] },
            no_build_path: vec!["7.4".to_string()],
        }
    }

    fn spec(all_verified: bool) -> PullRequestSpec {
        PullRequestSpec::for_codename_update(
            "bookworm",
            "trixie",
            all_verified,
            vec!["php.yml".to_string()],
            Path::new("/repo/.github/workflows"),
            vec![result(all_verified)],
        )
    }

    #[test]
    fn test_spec_for_codename_update() {
        let spec = spec(false);
        assert_eq!(spec.branch_name, "debian-stable/trixie");
        assert_eq!(
            spec.title,
            "chore(deps): update Debian stable from bookworm to trixie"
        );
        assert_eq!(spec.commit_message, spec.title);
        assert!(spec.is_draft);
        assert_eq!(
            spec.updated_file_paths,
            vec![PathBuf::from("/repo/.github/workflows/php.yml")]
        );
    }

    #[test]
    fn test_build_pr_body() {
        let checked_at = Utc.with_ymd_and_hms(2026, 10, 14, 8, 30, 0).unwrap();
        let body = build_pr_body(
            "bookworm",
            "trixie",
            false,
            &["php.yml".to_string()],
            &[result(true), result(false)],
            checked_at,
        );
        let expected = [
            "## Debian Stable Update: bookworm → trixie",
            "",
            "⏳ **Waiting for upstream images.** This PR will be marked as ready for review automatically once all checks pass.",
            "",
            "### Verification Results",
            "",
            "- ✅ `library/php` (filter: `fpm-trixie`) — buildable: 8.4 · skipped (no build path): 7.4",
            "- ❌ `library/php` (filter: `fpm-trixie`) — no buildable versions · skipped (no build path): 7.4 · ⚠️ awaiting tag: 8.3",
            "",
            "### Updated Files",
            "",
            "- `php.yml`",
            "",
            "---",
            "*This PR was automatically created by the Debian stable version checker. Last checked: 2026-10-14T08:30:00.000Z*",
        ]
        .join("\n");
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_creates_draft_pr_when_none_exists() {
        let temp = TempDir::new().unwrap();
        let runner = MockCommandRunner::new();
        runner
            .respond("git diff --cached --name-only", ".github/workflows/php.yml")
            .await;

        let pr = create_or_update_pull_request(&runner, &spec(false), temp.path())
            .await
            .unwrap();
        assert_eq!(pr, None);

        let calls = runner.calls().await;
        let body_file = temp.path().join(PR_BODY_FILE);
        assert!(body_file.is_file());
        assert_eq!(
            calls,
            vec![
                "git config user.name github-actions[bot]".to_string(),
                "git config user.email github-actions[bot]@users.noreply.github.com".to_string(),
                "git checkout -B debian-stable/trixie".to_string(),
                "git add /repo/.github/workflows/php.yml".to_string(),
                "git diff --cached --name-only".to_string(),
                "git commit -m chore(deps): update Debian stable from bookworm to trixie"
                    .to_string(),
                "git push origin debian-stable/trixie --force".to_string(),
                LIST.to_string(),
                format!(
                    "gh pr create --head debian-stable/trixie --title chore(deps): update Debian stable from bookworm to trixie --body-file {} --draft",
                    body_file.display()
                ),
                LIST.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_updates_existing_pr_and_marks_ready() {
        let temp = TempDir::new().unwrap();
        let runner = MockCommandRunner::new();
        runner.respond(LIST, "42").await;

        let pr = create_or_update_pull_request(&runner, &spec(true), temp.path())
            .await
            .unwrap();
        assert_eq!(pr.as_deref(), Some("42"));

        let calls = runner.calls().await;
        assert!(!calls.iter().any(|c| c.starts_with("git commit")));
        assert!(!calls.iter().any(|c| c.starts_with("gh pr create")));
        assert!(calls.contains(&format!(
            "gh pr edit 42 --body-file {}",
            temp.path().join(PR_BODY_FILE).display()
        )));
        assert_eq!(calls.last().map(String::as_str), Some("gh pr ready 42"));
    }

    #[tokio::test]
    async fn test_draft_state_is_restored_on_existing_pr() {
        let temp = TempDir::new().unwrap();
        let runner = MockCommandRunner::new();
        runner.respond(LIST, "7").await;
        runner.fail("gh pr ready 7 --undo", "already a draft").await;

        let pr = create_or_update_pull_request(&runner, &spec(false), temp.path())
            .await
            .unwrap();
        assert_eq!(pr.as_deref(), Some("7"));
        assert_eq!(
            runner.calls().await.last().map(String::as_str),
            Some("gh pr ready 7 --undo")
        );
    }

    #[tokio::test]
    async fn test_push_failure_aborts() {
        let temp = TempDir::new().unwrap();
        let runner = MockCommandRunner::new();
        runner.respond("git diff --cached --name-only", "php.yml").await;
        runner
            .fail("git push origin debian-stable/trixie --force", "denied")
            .await;

        assert!(create_or_update_pull_request(&runner, &spec(true), temp.path())
            .await
            .is_err());
    }
}
