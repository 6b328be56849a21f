//! Core library for tagwarden
//!
//! Release automation for a multi-image container build pipeline: discover
//! upstream version tags, decide which versions need building, render tag
//! list pages and keep pinned Debian codenames current.

pub mod build_path;
pub mod config;
pub mod debian;
pub mod errors;
pub mod logging;
pub mod matrix;
pub mod outputs;
pub mod process;
pub mod pull_request;
pub mod registry;
pub mod tag_list;
pub mod version;
pub mod workflow;

pub use errors::{Result, TagwardenError};

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
