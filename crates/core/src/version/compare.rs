//! Semantic version comparison and sorting
//!
//! Version strings are *coerced* before comparison: the first run of up to
//! three dot-separated numeric segments is taken and missing segments default
//! to zero, so `1.2` equals `1.2.0` and `v1.23-alpine` coerces to `1.23.0`.
//!
//! ```rust
//! use tagwarden_core::version::{sort_ascending, sort_descending};
//!
//! let versions = vec!["1.10", "1.2.3", "1.9"];
//! assert_eq!(sort_descending(versions.clone()), vec!["1.10", "1.9", "1.2.3"]);
//! assert_eq!(sort_ascending(versions), vec!["1.2.3", "1.9", "1.10"]);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use std::cmp::Ordering;

static COERCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{1,16})(?:\.([0-9]{1,16}))?(?:\.([0-9]{1,16}))?(?:$|[^0-9])")
        .expect("Valid regex pattern")
});

/// Coerce a loosely formatted string into a semantic version
///
/// # Examples
///
/// ```rust
/// use tagwarden_core::version::coerce;
///
/// assert_eq!(coerce("1.2").unwrap().to_string(), "1.2.0");
/// assert_eq!(coerce("v3").unwrap().to_string(), "3.0.0");
/// assert_eq!(coerce("1.2.3.4").unwrap().to_string(), "1.2.3");
/// assert!(coerce("latest").is_none());
/// ```
pub fn coerce(input: &str) -> Option<Version> {
    let captures = COERCE_PATTERN.captures(input)?;
    let segment = |index: usize| -> Option<u64> {
        match captures.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(segment(1)?, segment(2)?, segment(3)?))
}

/// Compare two version strings after coercion
///
/// Coercible strings sort above uncoercible ones; two uncoercible strings
/// compare equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (coerce(a), coerce(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Sort versions newest first
///
/// The sort is stable: versions that compare equal keep their input order.
pub fn sort_descending<S, I>(versions: I) -> Vec<S>
where
    S: AsRef<str>,
    I: IntoIterator<Item = S>,
{
    let mut sorted: Vec<S> = versions.into_iter().collect();
    sorted.sort_by(|a, b| compare_versions(b.as_ref(), a.as_ref()));
    sorted
}

/// Sort versions oldest first (stable)
pub fn sort_ascending<S, I>(versions: I) -> Vec<S>
where
    S: AsRef<str>,
    I: IntoIterator<Item = S>,
{
    let mut sorted: Vec<S> = versions.into_iter().collect();
    sorted.sort_by(|a, b| compare_versions(a.as_ref(), b.as_ref()));
    sorted
}

/// `a >= b` after coercion; false when either side is not a version
pub fn is_version_gte(a: &str, b: &str) -> bool {
    matches!((coerce(a), coerce(b)), (Some(a), Some(b)) if a >= b)
}

/// `a <= b` after coercion; false when either side is not a version
pub fn is_version_lte(a: &str, b: &str) -> bool {
    matches!((coerce(a), coerce(b)), (Some(a), Some(b)) if a <= b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_pads_missing_segments() {
        assert_eq!(coerce("1"), Some(Version::new(1, 0, 0)));
        assert_eq!(coerce("1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(coerce("1.2.3"), Some(Version::new(1, 2, 3)));
    }

    #[test]
    fn test_coerce_finds_embedded_version() {
        assert_eq!(coerce("v1.23-alpine"), Some(Version::new(1, 23, 0)));
        assert_eq!(coerce("php-8.3.1-fpm"), Some(Version::new(8, 3, 1)));
        assert_eq!(coerce("bookworm"), None);
        assert_eq!(coerce(""), None);
    }

    #[test]
    fn test_coerce_ignores_non_ascii_digits() {
        assert_eq!(coerce("1.٢"), Some(Version::new(1, 0, 0)));
        assert_eq!(coerce("١.٢.٣"), None);
    }

    #[test]
    fn test_compare_treats_missing_segments_as_zero() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2", "1.99.99"), Ordering::Greater);
    }

    #[test]
    fn test_compare_uncoercible_sorts_last() {
        assert_eq!(compare_versions("1.0", "latest"), Ordering::Greater);
        assert_eq!(compare_versions("latest", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("latest", "edge"), Ordering::Equal);
    }

    #[test]
    fn test_sorts_are_stable_for_ties() {
        let input = vec!["1.2", "1.3", "1.2.0"];
        assert_eq!(sort_descending(input.clone()), vec!["1.3", "1.2", "1.2.0"]);
        assert_eq!(sort_ascending(input), vec!["1.2", "1.2.0", "1.3"]);
    }

    #[test]
    fn test_descending_reversed_matches_ascending_without_ties() {
        let input = vec!["3.1", "1.0.5", "10", "2.2.2", "0.9"];
        let mut descending = sort_descending(input.clone());
        descending.reverse();
        assert_eq!(descending, sort_ascending(input));
    }

    #[test]
    fn test_sort_owned_strings() {
        let input = vec!["1.0.0".to_string(), "latest".to_string(), "2.0.0".to_string()];
        assert_eq!(sort_descending(input), vec!["2.0.0", "1.0.0", "latest"]);
    }

    #[test]
    fn test_gte_lte() {
        assert!(is_version_gte("1.3.0", "1.3"));
        assert!(is_version_gte("1.4", "1.3.9"));
        assert!(!is_version_gte("0.9.0", "1.3.0"));
        assert!(is_version_lte("1.23", "1.23.5"));
        assert!(!is_version_lte("1.24", "1.23.5"));
        assert!(!is_version_lte("_common", "1.23.5"));
        assert!(!is_version_gte("1.0", "latest"));
    }
}
