//! Pipeline step outputs
//!
//! Outputs are appended to the file named by `GITHUB_OUTPUT` using the
//! `name=value` format, or the heredoc format for multi-line values. Without
//! `GITHUB_OUTPUT` they are printed to stdout.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::Result;

/// Environment variable naming the step output file
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

const DELIMITER: &str = "TAGWARDEN_EOF";

/// Render one output entry, newline-terminated
///
/// ```rust
/// use tagwarden_core::outputs::format_output;
///
/// assert_eq!(format_output("build-needed", "true"), "build-needed=true\n");
/// assert_eq!(format_output("body", "a\nb"), "body<<TAGWARDEN_EOF\na\nb\nTAGWARDEN_EOF\n");
/// ```
pub fn format_output(name: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{}={}\n", name, value);
    }
    let mut delimiter = DELIMITER.to_string();
    while value.lines().any(|line| line == delimiter) {
        delimiter.push('_');
    }
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Destination of step outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutputs {
    /// Append to an output file
    File(PathBuf),
    /// Print to stdout
    Stdout,
}

impl StepOutputs {
    /// `GITHUB_OUTPUT` when set and non-empty, stdout otherwise
    pub fn from_env() -> Self {
        match std::env::var_os(GITHUB_OUTPUT_ENV) {
            Some(path) if !path.is_empty() => StepOutputs::File(PathBuf::from(path)),
            _ => StepOutputs::Stdout,
        }
    }

    pub fn to_file(path: &Path) -> Self {
        StepOutputs::File(path.to_path_buf())
    }

    /// Emit one output
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let entry = format_output(name, value);
        match self {
            StepOutputs::File(path) => {
                debug!("Writing output {} to {}", name, path.display());
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(entry.as_bytes())?;
            }
            StepOutputs::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(entry.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Emit several outputs in order
    pub fn set_all<'a, I>(&self, outputs: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        for (name, value) in outputs {
            self.set(name, &value)?;
        }
        Ok(())
    }
}
