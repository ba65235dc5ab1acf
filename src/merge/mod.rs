//! Merging enabled features into the build configuration
//!
//! Per field:
//! - `lib_deps`: one entry per package name; a version the environment
//!   declared is kept, otherwise the latest feature spec wins
//! - `build_flags`: the feature's flags string is appended as one entry
//! - `extra_scripts`: handed to the [`ScriptHost`] immediately
//! - `src_filter`: see [`filter::merge_src_filter`]
//! - `lib_ignore`: appended, duplicates allowed
//!
//! Each step computes a new value from the current one and replaces the
//! field wholesale.

pub mod filter;
mod scripts;

use std::collections::HashSet;

use fwdeps_fragment::{FeatureConfig, PackageSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use filter::merge_src_filter;
pub use scripts::{CommandScriptHost, DeferredScripts, ScheduledScript, ScriptError, ScriptHost};

/// Build configuration owned by the build tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
    pub lib_deps: Vec<String>,
    pub lib_ignore: Vec<String>,
    pub build_flags: Vec<String>,
    pub src_filter: String,
}

impl BuildConfiguration {
    /// Package names of the declared dependencies, in order
    pub fn declared_libraries(&self) -> Vec<String> {
        self.lib_deps.iter().map(|dep| PackageSpec::name_of(dep)).collect()
    }
}

/// Compute the dependency list after adding `wanted`.
///
/// `pinned` holds the package names the environment declared before any
/// feature was applied. Two filtering passes run over the wanted specs
/// before anything is added: a pinned package, or one already present with
/// the identical spec, is dropped, and a package on the ignore list is
/// dropped. Whatever remains replaces the entry of the same name added by
/// an earlier feature and is appended.
pub fn merge_lib_deps(
    deps: &[String],
    lib_ignore: &[String],
    pinned: &HashSet<String>,
    wanted: &[PackageSpec],
) -> Vec<String> {
    let mut to_add: IndexMap<&str, &str> = wanted
        .iter()
        .filter(|spec| !pinned.contains(spec.name()))
        .map(|spec| (spec.name(), spec.as_str()))
        .collect();

    // Does the env already have the dependency?
    for dep in deps {
        let name = PackageSpec::name_of(dep);
        if to_add.get(name.as_str()) == Some(&dep.trim()) {
            to_add.shift_remove(name.as_str());
        }
    }

    // Ignored libraries are never added
    for ignored in lib_ignore {
        to_add.shift_remove(PackageSpec::name_of(ignored).as_str());
    }

    if to_add.is_empty() {
        return deps.to_vec();
    }

    let mut merged: Vec<String> = deps
        .iter()
        .filter(|dep| !to_add.contains_key(PackageSpec::name_of(dep).as_str()))
        .cloned()
        .collect();
    merged.extend(to_add.values().map(|spec| spec.to_string()));
    merged
}

/// Applies feature configurations to a [`BuildConfiguration`]
pub struct DependencyMerger<'a> {
    scripts: &'a mut dyn ScriptHost,
    pinned: HashSet<String>,
}

impl<'a> DependencyMerger<'a> {
    /// Start a pass over `initial`; its declared packages are pinned
    pub fn new(scripts: &'a mut dyn ScriptHost, initial: &BuildConfiguration) -> Self {
        Self {
            scripts,
            pinned: initial.declared_libraries().into_iter().collect(),
        }
    }

    /// Apply one enabled feature
    pub fn apply(
        &mut self,
        config: &mut BuildConfiguration,
        name: &str,
        feature: &FeatureConfig,
    ) -> Result<(), ScriptError> {
        if !feature.lib_deps.is_empty() {
            log::debug!("Adding lib_deps for {}...", name);
            for spec in &feature.lib_deps {
                log::debug!("    {}", spec);
            }
            config.lib_deps = merge_lib_deps(
                &config.lib_deps,
                &config.lib_ignore,
                &self.pinned,
                &feature.lib_deps,
            );
        }

        if let Some(flags) = &feature.build_flags {
            log::debug!("Adding build_flags for {}: {}", name, flags);
            let mut build_flags = config.build_flags.clone();
            build_flags.push(flags.clone());
            config.build_flags = build_flags;
        }

        for script in &feature.extra_scripts {
            log::debug!("Running extra_scripts for {}: {}", name, script);
            self.scripts.run_script(name, script, config)?;
        }

        if let Some(src_filter) = &feature.src_filter {
            log::debug!("Adding src_filter for {}: {}", name, src_filter);
            config.src_filter = merge_src_filter(&config.src_filter, src_filter);
        }

        if let Some(ignore) = &feature.lib_ignore {
            log::debug!("Adding lib_ignore for {}: {}", name, ignore);
            let mut lib_ignore = config.lib_ignore.clone();
            lib_ignore.push(ignore.clone());
            config.lib_ignore = lib_ignore;
        }

        Ok(())
    }
}
