//! Engine compatibility and cache-hit checks
//!
//! `engine.camunda` ranges in template indexes are written in npm range
//! syntax. They are translated onto `semver::VersionReq`, whose comparator
//! semantics match npm for the operators templates use (`^`, `~`, `>=`, `<`,
//! wildcards), and which leaves `||` alternatives, hyphen ranges and bare
//! versions to this module.

use std::sync::LazyLock;

use regex::Regex;
use semver::{Version, VersionReq};

use crate::core::types::{Template, TemplateMetadata};

/// Key of the engine map entry checked against the platform version
pub const CAMUNDA_ENGINE: &str = "camunda";

static LOOSE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,16})(?:\.(\d{1,16}))?(?:\.(\d{1,16}))?").expect("valid version pattern")
});

/// Whether a template version may be used with the given platform version.
///
/// Metadata without an `engine` map, or without a `camunda` entry in it, is
/// compatible with everything.
pub fn is_template_compatible(metadata: &TemplateMetadata, execution_platform_version: &str) -> bool {
    let Some(range) = metadata
        .engine
        .as_ref()
        .and_then(|engine| engine.get(CAMUNDA_ENGINE))
    else {
        return true;
    };

    match coerce_version(execution_platform_version) {
        Some(version) => satisfies(&version, range),
        None => false,
    }
}

/// Whether `template` was fetched from the reference listed in `metadata`.
///
/// Only the reference is compared; callers match `(id, version)` first.
pub fn is_cached_ref(template: &Template, metadata: &TemplateMetadata) -> bool {
    template.upstream_ref() == Some(metadata.reference.as_str())
}

/// Pull the first `major[.minor[.patch]]` out of `input`, filling missing parts with zero.
///
/// ```
/// use element_template_updater::core::compat::coerce_version;
///
/// assert_eq!(coerce_version("8.8").unwrap().to_string(), "8.8.0");
/// assert_eq!(coerce_version("v8.6.1-alpha2").unwrap().to_string(), "8.6.1");
/// assert!(coerce_version("latest").is_none());
/// ```
pub fn coerce_version(input: &str) -> Option<Version> {
    let captures = LOOSE_VERSION.captures(input)?;
    let part = |index: usize| -> Option<u64> {
        match captures.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// npm-style `satisfies`. An unparseable range matches nothing.
pub fn satisfies(version: &Version, range: &str) -> bool {
    match parse_range(range) {
        Some(alternatives) => alternatives.iter().any(|req| req.matches(version)),
        None => false,
    }
}

/// Split a range on `||` and translate every comparator set
fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|set| VersionReq::parse(&translate_comparator_set(set.trim())).ok())
        .collect()
}

fn translate_comparator_set(set: &str) -> String {
    if set.is_empty() {
        return "*".to_string();
    }

    if let Some((lower, upper)) = set.split_once(" - ") {
        return format!(
            ">={}, <={}",
            strip_v(lower.trim()),
            strip_v(upper.trim())
        );
    }

    // ">= 8.6" is one comparator split over two tokens
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_operator: Option<&str> = None;
    for token in set.split_whitespace() {
        if token.chars().all(is_operator_char) {
            pending_operator = Some(token);
            continue;
        }
        let token = match pending_operator.take() {
            Some(operator) => format!("{operator}{token}"),
            None => token.to_string(),
        };
        comparators.push(translate_comparator(&token));
    }

    comparators.join(", ")
}

fn translate_comparator(comparator: &str) -> String {
    let split = comparator
        .find(|c: char| !is_operator_char(c))
        .unwrap_or(comparator.len());
    let (operator, version) = comparator.split_at(split);
    let version = normalize_wildcards(strip_v(version));

    if operator.is_empty() {
        // A bare version is an x-range in npm ("8.8" means 8.8.x) but a caret in cargo
        if version.contains('*') {
            version
        } else {
            format!("={version}")
        }
    } else {
        format!("{operator}{version}")
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '^' | '~')
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

fn normalize_wildcards(version: &str) -> String {
    version
        .split('.')
        .map(|part| match part {
            "x" | "X" => "*",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(".")
}
