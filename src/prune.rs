//! Ignoring known but undeclared libraries
//!
//! A feature that was enabled in an earlier build may have left its
//! libraries in the build tool's library folder. Every library some feature
//! knows about but the environment does not declare is added to the ignore
//! list so the build cannot pick up a stale copy.

use std::collections::HashSet;

use crate::ingest::FeatureConfigTable;
use crate::merge::BuildConfiguration;

/// Known libraries missing from the dependency list, in first-mention order
pub fn unused_libraries(table: &FeatureConfigTable, config: &BuildConfiguration) -> Vec<String> {
    let declared: HashSet<String> = config.declared_libraries().into_iter().collect();
    let mut seen = HashSet::new();

    table
        .known_libraries()
        .filter(|name| !declared.contains(*name) && seen.insert(*name))
        .map(String::from)
        .collect()
}

/// Append unused libraries to the ignore list, returning them
pub fn force_ignore_unused(table: &FeatureConfigTable, config: &mut BuildConfiguration) -> Vec<String> {
    let unused = unused_libraries(table, config);

    let mut lib_ignore = config.lib_ignore.clone();
    lib_ignore.extend(unused.iter().cloned());
    log::info!("Ignore libraries: {:?}", lib_ignore);
    config.lib_ignore = lib_ignore;

    unused
}
