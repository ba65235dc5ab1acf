//! fwdeps - firmware feature resolver
//!
//! Decides which optional firmware features are enabled by asking the real
//! preprocessor, then merges each enabled feature's library dependencies,
//! build flags, source filters and ignore entries into the build
//! configuration. Libraries known to any feature but not declared are
//! ignored so stale copies from earlier builds are never compiled.

pub mod config;
pub mod features;
pub mod ingest;
pub mod merge;
pub mod probe;
pub mod prune;
pub mod resolver;
pub mod toolchain;
pub mod version;

pub use config::{ConfigError, FeatureOverride, ProjectConfig};
pub use features::{EvalError, FeatureEvaluator};
pub use fwdeps_fragment::{FeatureConfig, FragmentError, PackageSpec};
pub use ingest::{FeatureConfigTable, IngestError};
pub use merge::{BuildConfiguration, DependencyMerger, ScriptHost};
pub use probe::{CompilerProbe, MacroSource, MacroTable, PreprocessorRunner, ProbeError};
pub use resolver::{Resolution, ResolveError, Resolver};
pub use toolchain::{CompilerLocator, CompilerPath, PathCache};
