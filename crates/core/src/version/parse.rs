//! Version tag parsing
//!
//! Turns a raw registry tag list into a [`VersionMap`] of normalized version
//! strings at a fixed [`Precision`], optionally restricted to one variant
//! suffix (the *filter*, e.g. `alpine` for `1.25.3-alpine`).

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Normalized version string mapped to the tag it came from
///
/// Keys keep their first insertion position; a later tag normalizing to the
/// same key replaces the value.
pub type VersionMap = IndexMap<String, String>;

static MAJOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("Valid regex pattern"));
static MAJOR_MINOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").expect("Valid regex pattern"));
static FULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("Valid regex pattern"));
static LEADING_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?[0-9]+)").expect("Valid regex pattern"));

/// Integer at the start of a pipeline input, ignoring anything after it
///
/// ```rust
/// use tagwarden_core::version::parse_leading_integer;
///
/// assert_eq!(parse_leading_integer("5abc"), Some(5));
/// assert_eq!(parse_leading_integer(" -2 "), Some(-2));
/// assert_eq!(parse_leading_integer("v5"), None);
/// ```
pub fn parse_leading_integer(input: &str) -> Option<i64> {
    LEADING_INTEGER
        .captures(input)
        .and_then(|captures| captures[1].parse().ok())
}

/// Number of dot-separated numeric segments a version must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precision {
    /// `1`
    Major,
    /// `1.2`
    MajorMinor,
    /// `1.2.3`
    #[default]
    Full,
}

impl Precision {
    /// Precision for a segment count; anything outside 1-3 is [`Precision::Full`]
    pub fn from_segments(segments: i64) -> Self {
        match segments {
            1 => Precision::Major,
            2 => Precision::MajorMinor,
            _ => Precision::Full,
        }
    }

    /// Lenient parse of a pipeline input; unparsable values mean [`Precision::Full`]
    ///
    /// ```rust
    /// use tagwarden_core::version::Precision;
    ///
    /// assert_eq!(Precision::parse_lenient("2"), Precision::MajorMinor);
    /// assert_eq!(Precision::parse_lenient("7"), Precision::Full);
    /// assert_eq!(Precision::parse_lenient("abc"), Precision::Full);
    /// ```
    pub fn parse_lenient(input: &str) -> Self {
        parse_leading_integer(input)
            .map(Self::from_segments)
            .unwrap_or_default()
    }

    pub fn segments(self) -> u8 {
        match self {
            Precision::Major => 1,
            Precision::MajorMinor => 2,
            Precision::Full => 3,
        }
    }

    /// Whether `candidate` has exactly this many numeric segments
    pub fn matches(self, candidate: &str) -> bool {
        let pattern: &Regex = match self {
            Precision::Major => &MAJOR,
            Precision::MajorMinor => &MAJOR_MINOR,
            Precision::Full => &FULL,
        };
        pattern.is_match(candidate)
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments())
    }
}

/// Why a tag was left out of a [`VersionMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The tag does not end with `-<filter>`
    FilterMismatch,
    /// The (suffix-stripped) tag is not a version at the requested precision
    PatternMismatch,
}

/// A tag discarded during parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTag {
    pub tag: String,
    pub reason: SkipReason,
}

/// Result of [`parse_tags`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTags {
    pub versions: VersionMap,
    pub skipped: Vec<SkippedTag>,
}

/// Parse tags and report every discarded tag
pub fn parse_tags<S: AsRef<str>>(
    tags: &[S],
    precision: Precision,
    filter: Option<&str>,
) -> ParsedTags {
    let suffix = filter
        .filter(|f| !f.is_empty())
        .map(|f| format!("-{}", f));

    let mut parsed = ParsedTags::default();
    for tag in tags {
        let tag = tag.as_ref();
        let candidate = match &suffix {
            Some(suffix) => match tag.strip_suffix(suffix.as_str()) {
                Some(stripped) => stripped,
                None => {
                    parsed.skipped.push(SkippedTag {
                        tag: tag.to_string(),
                        reason: SkipReason::FilterMismatch,
                    });
                    continue;
                }
            },
            None => tag,
        };

        if precision.matches(candidate) {
            parsed
                .versions
                .insert(candidate.to_string(), tag.to_string());
        } else {
            parsed.skipped.push(SkippedTag {
                tag: tag.to_string(),
                reason: SkipReason::PatternMismatch,
            });
        }
    }

    debug!(
        precision = %precision,
        filter = filter.unwrap_or(""),
        kept = parsed.versions.len(),
        skipped = parsed.skipped.len(),
        "Parsed version tags"
    );
    parsed
}

/// Parse tags into a [`VersionMap`]
///
/// # Examples
///
/// ```rust
/// use tagwarden_core::version::{parse_version_tags, Precision};
///
/// let tags = ["1.25.3-alpine", "1.25.3", "1.25-alpine", "latest"];
/// let versions = parse_version_tags(&tags, Precision::Full, Some("alpine"));
/// assert_eq!(versions.get("1.25.3").map(String::as_str), Some("1.25.3-alpine"));
/// assert_eq!(versions.len(), 1);
/// ```
pub fn parse_version_tags<S: AsRef<str>>(
    tags: &[S],
    precision: Precision,
    filter: Option<&str>,
) -> VersionMap {
    parse_tags(tags, precision, filter).versions
}
