//! Extra build scripts attached to features
//!
//! Running a script is up to the build tool. The resolver hands each script
//! to a [`ScriptHost`] at the point the feature is applied, together with
//! the configuration accumulated so far.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use super::BuildConfiguration;

/// Script execution errors
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Failed to start script '{script}': {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Script '{script}' for {feature} exited with status {status}")]
    Failed {
        feature: String,
        script: String,
        status: String,
    },
}

/// Receives extra scripts as features are applied
pub trait ScriptHost {
    fn run_script(
        &mut self,
        feature: &str,
        script: &str,
        config: &BuildConfiguration,
    ) -> Result<(), ScriptError>;
}

/// A script handed back to the build tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledScript {
    pub feature: String,
    pub script: String,
}

/// Records scripts for the build tool to run later
#[derive(Debug, Clone, Default)]
pub struct DeferredScripts {
    scheduled: Vec<ScheduledScript>,
}

impl DeferredScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> &[ScheduledScript] {
        &self.scheduled
    }

    pub fn into_scheduled(self) -> Vec<ScheduledScript> {
        self.scheduled
    }
}

impl ScriptHost for DeferredScripts {
    fn run_script(
        &mut self,
        feature: &str,
        script: &str,
        _config: &BuildConfiguration,
    ) -> Result<(), ScriptError> {
        self.scheduled.push(ScheduledScript {
            feature: feature.to_string(),
            script: script.to_string(),
        });
        Ok(())
    }
}

/// Runs each script as an executable.
///
/// The configuration accumulated so far is exported as `FWDEPS_LIB_DEPS`,
/// `FWDEPS_LIB_IGNORE`, `FWDEPS_BUILD_FLAGS` (newline separated) and
/// `FWDEPS_SRC_FILTER`. A `pre:`/`post:` prefix is stripped.
#[derive(Debug, Clone, Default)]
pub struct CommandScriptHost {
    working_dir: Option<PathBuf>,
}

impl CommandScriptHost {
    pub fn new(working_dir: Option<&Path>) -> Self {
        Self {
            working_dir: working_dir.map(Path::to_path_buf),
        }
    }
}

impl ScriptHost for CommandScriptHost {
    fn run_script(
        &mut self,
        feature: &str,
        script: &str,
        config: &BuildConfiguration,
    ) -> Result<(), ScriptError> {
        let path = script
            .strip_prefix("pre:")
            .or_else(|| script.strip_prefix("post:"))
            .unwrap_or(script);

        log::trace!("exec {} (feature {})", path, feature);

        let mut command = Command::new(path);
        command
            .env("FWDEPS_FEATURE", feature)
            .env("FWDEPS_LIB_DEPS", config.lib_deps.join("\n"))
            .env("FWDEPS_LIB_IGNORE", config.lib_ignore.join("\n"))
            .env("FWDEPS_BUILD_FLAGS", config.build_flags.join("\n"))
            .env("FWDEPS_SRC_FILTER", &config.src_filter);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let status = command.status().map_err(|source| ScriptError::Spawn {
            script: path.to_string(),
            source,
        })?;

        if !status.success() {
            return Err(ScriptError::Failed {
                feature: feature.to_string(),
                script: path.to_string(),
                status: status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
            });
        }
        Ok(())
    }
}
