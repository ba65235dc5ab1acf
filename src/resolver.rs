//! Feature resolution pass
//!
//! One [`Resolver`] is built per build-configuration pass. It owns the
//! feature table and the evaluator; nothing is shared between passes except
//! the on-disk compiler path cache.

use std::path::Path;

use serde::Serialize;

use crate::config::{ConfigError, FeatureOverride, ProjectConfig};
use crate::features::{EvalError, FeatureEvaluator};
use crate::ingest::{FeatureConfigTable, IngestError};
use crate::merge::{BuildConfiguration, DependencyMerger, ScriptError, ScriptHost};
use crate::probe::{CommandRunner, CompilerProbe, MacroSource, MacroTable, ProbeError};
use crate::prune::force_ignore_unused;
use crate::toolchain::{CompilerLocator, FsPathCache};
use crate::version::{check_build_tool, VersionError, MIN_BUILD_TOOL_VERSION};

/// Probe used for real projects
pub type ProjectProbe = CompilerProbe<CommandRunner, FsPathCache>;

/// Errors that abort resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Result of a resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Replacement build configuration
    pub config: BuildConfiguration,
    /// Features applied, in table order
    pub enabled: Vec<String>,
    /// Features skipped
    pub disabled: Vec<String>,
    /// Libraries added to the ignore list by pruning
    pub ignored_unused: Vec<String>,
}

/// Resolves enabled features and merges their configuration
pub struct Resolver<S> {
    table: FeatureConfigTable,
    evaluator: FeatureEvaluator<S>,
}

impl<S: MacroSource> Resolver<S> {
    pub fn new(table: FeatureConfigTable, source: S) -> Self {
        Self {
            table,
            evaluator: FeatureEvaluator::new(source),
        }
    }

    pub fn table(&self) -> &FeatureConfigTable {
        &self.table
    }

    pub fn evaluator(&self) -> &FeatureEvaluator<S> {
        &self.evaluator
    }

    /// Whether a feature is enabled, for other build steps
    pub fn is_enabled(&self, feature: &str) -> Result<bool, EvalError> {
        self.evaluator.is_enabled(feature)
    }

    /// Raw macro value, for other build steps
    pub fn macro_value(&self, name: &str) -> Result<Option<&str>, ProbeError> {
        self.evaluator.macro_value(name)
    }

    pub fn macro_table(&self) -> Result<&MacroTable, ProbeError> {
        self.evaluator.macro_table()
    }

    /// Apply every enabled feature to `config`, then ignore unused
    /// libraries.
    pub fn resolve(
        &self,
        mut config: BuildConfiguration,
        scripts: &mut dyn ScriptHost,
    ) -> Result<Resolution, ResolveError> {
        log::info!("Apply enabled features...");

        let mut enabled = Vec::new();
        let mut disabled = Vec::new();
        let mut merger = DependencyMerger::new(scripts, &config);

        for (name, feature) in self.table.iter() {
            if !self.evaluator.is_enabled(name)? {
                log::trace!("{} is disabled", name);
                disabled.push(name.to_string());
                continue;
            }
            log::debug!("{} is enabled", name);
            merger.apply(&mut config, name, feature)?;
            enabled.push(name.to_string());
        }

        let ignored_unused = force_ignore_unused(&self.table, &mut config);

        Ok(Resolution {
            config,
            enabled,
            disabled,
            ignored_unused,
        })
    }
}

impl Resolver<ProjectProbe> {
    /// Build a resolver for a project rooted at `root`.
    ///
    /// `cli_overrides` are merged after the overrides declared in the file.
    pub fn for_project(
        project: &ProjectConfig,
        cli_overrides: &[FeatureOverride],
        root: &Path,
    ) -> Result<Self, ResolveError> {
        check_build_tool(project.env.build_tool_version.as_deref(), MIN_BUILD_TOOL_VERSION)?;

        let mut overrides = project.env_overrides()?;
        overrides.extend(cli_overrides.iter().cloned());

        let table = FeatureConfigTable::ingest(
            &project.features,
            overrides.iter().map(|o| (&o.feature, &o.fragment)),
        )?;

        let locator = CompilerLocator::new(
            project.locator_settings(),
            FsPathCache::new(project.scratch_dir(root)),
        );
        let probe = CompilerProbe::new(
            locator,
            CommandRunner::new(),
            project.probe_settings(root),
            &project.env.build_flags,
        );

        Ok(Self::new(table, probe))
    }
}
