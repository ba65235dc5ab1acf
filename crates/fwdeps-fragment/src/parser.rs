//! Fragment parser.
//!
//! A fragment is split on commas and newlines into atoms. Each atom is
//! either `key=value` or a bare value; the key decides the atom's kind.

use serde::Serialize;

use crate::package::PackageSpec;
use crate::FragmentError;

/// Key that introduces dependency specs explicitly
pub const LIB_DEPS_KEY: &str = "lib_deps";

/// Fields stored verbatim on a feature (last assignment wins)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralField {
    BuildFlags,
    ExtraScripts,
    SrcFilter,
    LibIgnore,
}

impl StructuralField {
    /// Look up a structural field by its fragment key
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "build_flags" => Some(Self::BuildFlags),
            "extra_scripts" => Some(Self::ExtraScripts),
            "src_filter" | "build_src_filter" => Some(Self::SrcFilter),
            "lib_ignore" => Some(Self::LibIgnore),
            _ => None,
        }
    }

    /// Canonical fragment key
    pub fn key(&self) -> &'static str {
        match self {
            Self::BuildFlags => "build_flags",
            Self::ExtraScripts => "extra_scripts",
            Self::SrcFilter => "src_filter",
            Self::LibIgnore => "lib_ignore",
        }
    }
}

/// One parsed unit of a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// `build_flags=…`, `extra_scripts=…`, `src_filter=…`, `lib_ignore=…`
    Field(StructuralField, String),
    /// `lib_deps=spec`, `name=url`, or a bare spec
    Dependency(PackageSpec),
}

/// Parse a raw fragment into atoms.
///
/// Empty atoms (blank lines, trailing commas) are skipped. An atom is split
/// at its first `=` only, so values may themselves contain `=`.
pub fn parse_fragment(text: &str) -> Result<Vec<Atom>, FragmentError> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(parse_atom)
        .collect()
}

fn parse_atom(piece: &str) -> Result<Atom, FragmentError> {
    let Some((key, value)) = piece.split_once('=') else {
        return Ok(Atom::Dependency(PackageSpec::parse(piece)?));
    };

    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return Err(FragmentError::EmptyKey {
            atom: piece.to_string(),
        });
    }

    if let Some(field) = StructuralField::from_key(key) {
        if value.is_empty() {
            return Err(FragmentError::MissingValue {
                key: key.to_string(),
            });
        }
        return Ok(Atom::Field(field, value.to_string()));
    }

    if key == LIB_DEPS_KEY {
        if value.is_empty() {
            return Err(FragmentError::MissingValue {
                key: key.to_string(),
            });
        }
        return Ok(Atom::Dependency(PackageSpec::parse(value)?));
    }

    // Any other key is the `name=url` form of a dependency
    Ok(Atom::Dependency(PackageSpec::parse(piece)?))
}
