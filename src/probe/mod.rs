//! Compiler feature probe
//!
//! Feature macros can alias each other and depend on every define the build
//! passes, so their final values are read back from the real preprocessor:
//! all current defines plus a marker define are passed to a `-dM -E` run
//! over a header that includes the feature-defining headers. The resulting
//! table is computed at most once per probe.

mod flags;
mod macros;
mod runner;

use std::cell::OnceCell;
use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

pub use flags::{parse_defines, split_flags, Define};
pub use macros::{parse_macro_output, MacroTable};
pub use runner::{CommandRunner, Invocation, MockRunner, PreprocessorRunner};

use crate::toolchain::{CompilerLocator, CompilerPath, PathCache};

/// Header preprocessed by default, relative to the project root
pub const DEFAULT_PROBE_HEADER: &str = "buildroot/share/PlatformIO/scripts/common-dependencies.h";

/// Define the probe header checks for
pub const DEFAULT_PROBE_MARKER: &str = "__MARLIN_DEPS__";

/// Probe errors. All of them abort resolution.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to run compiler {compiler}: {source}")]
    Spawn {
        compiler: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Preprocessor exited with status {}: {stderr}", exit_label(.status))]
    Failed { status: Option<i32>, stderr: String },

    #[error("Unparsable preprocessor output line: '{line}'")]
    Unparsable { line: String },

    #[error("Preprocessor output is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

fn exit_label(status: &Option<i32>) -> String {
    status.map_or_else(|| "unknown".to_string(), |code| code.to_string())
}

/// What to preprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub header: PathBuf,
    pub marker: String,
    /// Directory the compiler runs in (the project root)
    pub working_dir: Option<PathBuf>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            header: PathBuf::from(DEFAULT_PROBE_HEADER),
            marker: DEFAULT_PROBE_MARKER.to_string(),
            working_dir: None,
        }
    }
}

/// Anything that can provide the macro table
pub trait MacroSource {
    fn macro_table(&self) -> Result<&MacroTable, ProbeError>;
}

impl MacroSource for MacroTable {
    fn macro_table(&self) -> Result<&MacroTable, ProbeError> {
        Ok(self)
    }
}

impl<S: MacroSource + ?Sized> MacroSource for &S {
    fn macro_table(&self) -> Result<&MacroTable, ProbeError> {
        (**self).macro_table()
    }
}

/// Lazily locates the compiler and runs it once.
///
/// Defines are snapshotted from the build flags at construction time.
pub struct CompilerProbe<R, C> {
    locator: CompilerLocator<C>,
    runner: R,
    defines: Vec<Define>,
    settings: ProbeSettings,
    compiler: OnceCell<CompilerPath>,
    table: OnceCell<MacroTable>,
}

impl<R: PreprocessorRunner, C: PathCache> CompilerProbe<R, C> {
    pub fn new<S: AsRef<str>>(
        locator: CompilerLocator<C>,
        runner: R,
        settings: ProbeSettings,
        build_flags: &[S],
    ) -> Self {
        Self {
            locator,
            runner,
            defines: parse_defines(build_flags),
            settings,
            compiler: OnceCell::new(),
            table: OnceCell::new(),
        }
    }

    /// The compiler this probe uses, located on first call
    pub fn compiler(&self) -> &CompilerPath {
        self.compiler.get_or_init(|| self.locator.locate())
    }

    pub fn defines(&self) -> &[Define] {
        &self.defines
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The invocation the probe runs
    pub fn invocation(&self) -> Invocation {
        Invocation {
            compiler: self.compiler().path.clone(),
            defines: self.defines.clone(),
            header: self.settings.header.clone(),
            marker: self.settings.marker.clone(),
            working_dir: self.settings.working_dir.clone(),
        }
    }
}

impl<R: PreprocessorRunner, C: PathCache> MacroSource for CompilerProbe<R, C> {
    fn macro_table(&self) -> Result<&MacroTable, ProbeError> {
        if let Some(table) = self.table.get() {
            return Ok(table);
        }

        let invocation = self.invocation();
        log::info!(
            "Probing features with {} ({})",
            invocation.compiler.display(),
            self.compiler().source
        );
        let table = self.runner.preprocess(&invocation)?;
        log::debug!("Preprocessor reported {} macros", table.len());

        Ok(self.table.get_or_init(|| table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::{CompilerSource, LocatorSettings, MemoryPathCache};

    fn probe(runner: MockRunner) -> CompilerProbe<MockRunner, MemoryPathCache> {
        let settings = LocatorSettings {
            override_path: Some(PathBuf::from("/opt/bin/g++")),
            ..LocatorSettings::default()
        };
        CompilerProbe::new(
            CompilerLocator::new(settings, MemoryPathCache::new()),
            runner,
            ProbeSettings::default(),
            &["-DMOTHERBOARD=BOARD_X -Os", "-DUSE_FOO"],
        )
    }

    #[test]
    fn test_probe_runs_once() {
        let probe = probe(MockRunner::new([("USE_FOO", "")].into_iter().collect()));

        assert_eq!(probe.macro_table().unwrap().get("USE_FOO"), Some(""));
        assert_eq!(probe.macro_table().unwrap().len(), 1);
        assert_eq!(probe.runner().calls(), 1);
    }

    #[test]
    fn test_invocation_uses_snapshot_defines() {
        let probe = probe(MockRunner::default());
        probe.macro_table().unwrap();

        let invocation = probe.runner().last_invocation().unwrap();
        assert_eq!(invocation.compiler, PathBuf::from("/opt/bin/g++"));
        assert_eq!(
            invocation.defines,
            vec![
                Define::new("MOTHERBOARD", Some("BOARD_X")),
                Define::new("USE_FOO", None),
            ]
        );
        assert_eq!(invocation.marker, DEFAULT_PROBE_MARKER);
        assert_eq!(probe.compiler().source, CompilerSource::Override);
    }

    #[test]
    fn test_failure_is_reported() {
        struct Failing;
        impl PreprocessorRunner for Failing {
            fn preprocess(&self, _: &Invocation) -> Result<MacroTable, ProbeError> {
                Err(ProbeError::Failed {
                    status: Some(1),
                    stderr: "fatal error: deps.h: No such file".to_string(),
                })
            }
        }

        let probe = CompilerProbe::new(
            CompilerLocator::new(LocatorSettings::default(), MemoryPathCache::new()),
            Failing,
            ProbeSettings::default(),
            &[] as &[&str],
        );
        let err = probe.macro_table().unwrap_err();
        assert!(err.to_string().contains("status 1"));
        assert!(err.to_string().contains("No such file"));
    }

    #[test]
    fn test_static_table_source() {
        let table: MacroTable = [("A", "1")].into_iter().collect();
        assert_eq!(table.macro_table().unwrap().get("A"), Some("1"));
    }
}
