//! Error types and handling
//!
//! The error taxonomy has one enum per domain (configuration, registry,
//! workflow files, templates, subprocesses, Debian release lookup). They are
//! wrapped in the main [`TagwardenError`] enum for unified handling.
//!
//! "No build needed" is deliberately absent from this module: it is a regular
//! outcome of matrix generation (see [`crate::matrix::MatrixOutcome`]).

use thiserror::Error;

/// Configuration-related errors (missing or invalid required input)
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required input was empty or absent
    #[error("Missing required input: {name}")]
    MissingInput { name: String },

    /// An input value could not be interpreted
    #[error("Invalid value for {name}: {message}")]
    InvalidInput { name: String, message: String },

    /// Configuration validation error
    #[error("Configuration validation error: {message}")]
    Validation { message: String },

    /// Configuration file parsing error
    #[error("Failed to parse configuration file {path}: {message}")]
    Parsing { path: String, message: String },

    /// Configuration file I/O error
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),
}

/// Registry-related errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Bearer challenge could not be completed
    #[error("Registry authentication failed: {message}")]
    Authentication { message: String },

    /// Transport-level failure (connect, timeout, TLS, ...)
    #[error("Network error for URL {url}: {message}")]
    Network { url: String, message: String },

    /// Registry answered with a server error
    #[error("HTTP {status} for URL: {url}")]
    Http { status: u16, url: String },

    /// Response body could not be decoded
    #[error("Failed to parse registry response from {url}: {message}")]
    Parsing { url: String, message: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },
}

/// Workflow file errors
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Workflow file does not exist
    #[error("Workflow file not found: {path}")]
    NotFound { path: String },

    /// Workflow YAML could not be parsed
    #[error("Failed to parse workflow file {path}: {message}")]
    Parsing { path: String, message: String },

    /// None of the candidate jobs exist in the workflow
    #[error("No suitable job found. Checked candidates: \"{}\" against available jobs: \"{}\"",
        candidates.join("\", \""), available.join("\", \""))]
    JobNotFound {
        candidates: Vec<String>,
        available: Vec<String>,
    },

    /// Workflow file I/O error
    #[error("Workflow file I/O error")]
    Io(#[from] std::io::Error),
}

/// Template rendering errors
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template file not found in the override directory or built-ins
    #[error("Template not found: {name}")]
    NotFound { name: String },

    /// Template or output file I/O error
    #[error("Template file operation error")]
    Io(#[from] std::io::Error),
}

/// External command errors (git, gh, docker)
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started
    #[error("Failed to execute {command}: {message}")]
    Spawn { command: String, message: String },

    /// The program exited with a non-zero status
    #[error("Command `{command}` failed with exit code {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Debian release lookup errors
#[derive(Error, Debug)]
pub enum DebianError {
    /// Release file could not be fetched
    #[error("Failed to fetch Debian release file from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Release file has no Codename line
    #[error("Could not parse Codename from Debian Release file")]
    MissingCodename,
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum TagwardenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Registry-related errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Workflow file errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// External command errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Debian release lookup errors
    #[error("Debian error: {0}")]
    Debian(#[from] DebianError),

    /// Generic I/O errors (output files, directory creation)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with TagwardenError
pub type Result<T> = std::result::Result<T, TagwardenError>;
