//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod check_debian;
pub mod discover;
pub mod local_build;
pub mod tag_list;

use tagwarden_core::version::parse_leading_integer;

/// Parse a numeric step input from its leading digits, falling back to
/// `default` when it does not start with a non-negative integer.
pub fn parse_count(input: &str, default: usize) -> usize {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return default;
    }
    match parse_leading_integer(trimmed).and_then(|value| usize::try_from(value).ok()) {
        Some(value) => value,
        None => {
            tracing::warn!("Invalid number '{}', using default {}", trimmed, default);
            default
        }
    }
}

/// Split a comma-separated list input, dropping blank items
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed optional input, `None` when blank
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
