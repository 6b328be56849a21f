//! Version tag parsing, comparison and sorting

pub mod compare;
pub mod parse;

pub use compare::{
    coerce, compare_versions, is_version_gte, is_version_lte, sort_ascending, sort_descending,
};
pub use parse::{
    parse_leading_integer, parse_tags, parse_version_tags, ParsedTags, Precision, SkipReason,
    SkippedTag, VersionMap,
};
