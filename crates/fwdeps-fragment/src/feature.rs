//! Per-feature build configuration assembled from fragments

use serde::Serialize;

use crate::package::PackageSpec;
use crate::parser::{parse_fragment, Atom, StructuralField};
use crate::FragmentError;

/// Build configuration bundle attached to one feature.
///
/// `lib_deps` never holds two specs for the same package name: a later
/// spec replaces the earlier one and moves to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureConfig {
    pub lib_deps: Vec<PackageSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_flags: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_scripts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_filter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_ignore: Option<String>,
}

impl FeatureConfig {
    /// Parse a fragment and merge it into this feature
    pub fn apply_fragment(&mut self, text: &str) -> Result<(), FragmentError> {
        for atom in parse_fragment(text)? {
            self.apply_atom(atom);
        }
        Ok(())
    }

    /// Merge a single atom
    pub fn apply_atom(&mut self, atom: Atom) {
        match atom {
            Atom::Field(StructuralField::BuildFlags, value) => self.build_flags = Some(value),
            Atom::Field(StructuralField::ExtraScripts, value) => {
                self.extra_scripts = value.split_whitespace().map(String::from).collect();
            }
            Atom::Field(StructuralField::SrcFilter, value) => self.src_filter = Some(value),
            Atom::Field(StructuralField::LibIgnore, value) => self.lib_ignore = Some(value),
            Atom::Dependency(spec) => self.add_dependency(spec),
        }
    }

    /// Add a dependency, replacing any spec for the same package name
    pub fn add_dependency(&mut self, spec: PackageSpec) {
        self.lib_deps.retain(|existing| existing.name() != spec.name());
        self.lib_deps.push(spec);
    }

    /// Package names referenced by this feature, in list order
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.lib_deps.iter().map(PackageSpec::name)
    }

    /// True when nothing has been configured for this feature
    pub fn is_empty(&self) -> bool {
        self.lib_deps.is_empty()
            && self.build_flags.is_none()
            && self.extra_scripts.is_empty()
            && self.src_filter.is_none()
            && self.lib_ignore.is_none()
    }
}
