//! Dependency spec handling.
//!
//! A dependency spec is an opaque string as far as version resolution is
//! concerned. The only thing extracted from it is the package name, which
//! is the dedup key everywhere specs are merged.

use std::fmt;

use serde::Serialize;

use crate::FragmentError;

/// A dependency spec together with the package name it refers to.
///
/// Accepted shapes:
/// - `name`
/// - `name@1.2.3`, `name@^1.0`, `name@~0.7.1`, `name@>=2.0`
/// - `owner/name` and `owner/name@constraint`
/// - `scheme://host/path/name.git#ref`
/// - `name=url` (explicit package name for a URL or path source)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct PackageSpec {
    raw: String,
    name: String,
    owner: Option<String>,
    requirement: Option<String>,
}

impl PackageSpec {
    /// Parse a dependency spec, extracting its package name.
    pub fn parse(raw: &str) -> Result<Self, FragmentError> {
        let raw = raw.trim();
        let (owner, name, requirement) = split_spec(raw);

        if name.is_empty() {
            return Err(FragmentError::InvalidSpec {
                spec: raw.to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            name,
            owner,
            requirement,
        })
    }

    /// Package name for a spec, or the trimmed input when it has no
    /// extractable name.
    ///
    /// Used on lists owned by the build tool, which may hold entries this
    /// crate did not produce.
    pub fn name_of(raw: &str) -> String {
        Self::parse(raw)
            .map(|spec| spec.name)
            .unwrap_or_else(|_| raw.trim().to_string())
    }

    /// The spec exactly as written (trimmed)
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Bare package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owner part of `owner/name` specs
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Version constraint following `@`, if any
    pub fn requirement(&self) -> Option<&str> {
        self.requirement.as_deref()
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<PackageSpec> for String {
    fn from(spec: PackageSpec) -> Self {
        spec.raw
    }
}

/// Split a spec into (owner, name, requirement)
fn split_spec(raw: &str) -> (Option<String>, String, Option<String>) {
    // name=url: the explicit name wins over anything derived from the URL
    if let Some((name, _source)) = raw.split_once('=') {
        let name = name.trim();
        if !name.contains("://") && !name.contains('@') && !name.contains('/') {
            return (None, name.to_string(), None);
        }
    }

    if let Some(idx) = raw.find("://") {
        let path = &raw[idx + 3..];
        let path = path.split(['#', '?']).next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        let last = path.rsplit('/').next().unwrap_or(path);
        let name = last.strip_suffix(".git").unwrap_or(last);
        return (None, name.to_string(), None);
    }

    let (path, requirement) = match raw.split_once('@') {
        Some((path, req)) => (path.trim(), Some(req.trim().to_string())),
        None => (raw, None),
    };

    match path.rsplit_once('/') {
        Some((owner, name)) => (Some(owner.to_string()), name.to_string(), requirement),
        None => (None, path.to_string(), requirement),
    }
}
