//! Source filter merging
//!
//! A source filter is a list of `+<pattern>` / `-<pattern>` entries. When a
//! feature mentions a pattern that is already in the accumulated filter,
//! the old entry is dropped whatever its sign, and the feature's filter is
//! prepended.

use std::sync::OnceLock;

use regex_lite::Regex;

fn pattern_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[+-](<[^>]*>)").expect("valid source filter regex"))
}

/// The `<pattern>` parts of a filter, in order
pub fn patterns(filter: &str) -> Vec<&str> {
    pattern_regex()
        .captures_iter(filter)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Merge a feature's filter in front of the accumulated one
pub fn merge_src_filter(current: &str, feature: &str) -> String {
    let existing = patterns(current);
    let mut remaining = current.to_string();

    for pattern in patterns(feature) {
        if existing.contains(&pattern) {
            remaining = remaining
                .replace(&format!("+{}", pattern), "")
                .replace(&format!("-{}", pattern), "");
        }
    }

    normalize(&format!("{} {}", feature, remaining))
}

/// Collapse runs of whitespace to single spaces
fn normalize(filter: &str) -> String {
    filter.split_whitespace().collect::<Vec<_>>().join(" ")
}
