//! Project file (`fwdeps.toml`)
//!
//! ```toml
//! [features]
//! TMC_UART = "lib_deps=teemuatlut/TMCStepper@~0.7.1"
//! HAS_GRAPHICAL_LCD = """
//! U8glib-HAL@0.4.1
//! src_filter=+<src/lcd/dogm>
//! """
//!
//! [env]
//! name = "mini_e3_v2"
//! lib_deps = ["SoftwareSerial"]
//! build_flags = ["-DMOTHERBOARD=BOARD_MINI_E3_V2"]
//! "custom_feature.TMC_UART" = "teemuatlut/TMCStepper@0.8.0"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use super::overrides::{collect_env_overrides, FeatureOverride};
use super::ConfigError;
use crate::merge::BuildConfiguration;
use crate::probe::{ProbeSettings, DEFAULT_PROBE_HEADER, DEFAULT_PROBE_MARKER};
use crate::toolchain::{HostPlatform, LocatorSettings};

/// Default project file name
pub const DEFAULT_CONFIG_PATH: &str = "fwdeps.toml";

/// Default scratch root, relative to the project directory
const DEFAULT_BUILD_DIR: &str = ".pio/build";

/// Default environment name
const DEFAULT_ENV_NAME: &str = "default";

/// Parsed project file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Feature name → raw fragment, in declaration order
    pub features: IndexMap<String, String>,

    /// The build environment being configured
    pub env: EnvSection,
}

/// The `[env]` section: current build state plus resolver settings.
///
/// Every field is optional; a missing option is an empty value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvSection {
    /// Environment name; the scratch dir is `build_dir/name`
    pub name: Option<String>,

    #[serde(deserialize_with = "string_or_list")]
    pub lib_deps: Vec<String>,

    #[serde(deserialize_with = "string_or_list")]
    pub lib_ignore: Vec<String>,

    #[serde(deserialize_with = "string_or_list")]
    pub build_flags: Vec<String>,

    #[serde(deserialize_with = "string_or_list")]
    pub src_filter: Vec<String>,

    /// Explicit compiler, bypassing discovery
    pub custom_gcc: Option<String>,

    /// Diagnostic verbosity (0-4)
    pub custom_verbose: u8,

    pub build_dir: Option<PathBuf>,

    /// Root of the installed toolchain packages
    pub packages_dir: Option<PathBuf>,

    /// Host platform name (`win32`, `linux`, ...)
    pub platform: Option<String>,

    /// Generic compiler designated by the build tool
    pub cxx: Option<String>,

    /// Binary search path; the process `PATH` when absent
    pub path: Option<String>,

    pub probe_header: Option<PathBuf>,

    pub probe_marker: Option<String>,

    /// Version reported by the surrounding build tool
    pub build_tool_version: Option<String>,

    /// Remaining keys, including `custom_feature.<NAME>` overrides
    #[serde(flatten)]
    pub extra: IndexMap<String, toml::Value>,
}

impl ProjectConfig {
    /// Load a project file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse project file contents
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.env.custom_verbose > 4 {
            return Err(ConfigError::Validation(format!(
                "custom_verbose must be in [0, 4], got {}",
                self.env.custom_verbose
            )));
        }
        if let Some(name) = &self.env.name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "env name '{}' is not a valid directory name",
                    name
                )));
            }
        }
        // Surface malformed overrides at load time
        collect_env_overrides(&self.env.extra)?;
        Ok(())
    }

    /// Per-build feature overrides declared in `[env]`
    pub fn env_overrides(&self) -> Result<Vec<FeatureOverride>, ConfigError> {
        collect_env_overrides(&self.env.extra)
    }

    /// Build state as currently declared by the environment
    pub fn build_configuration(&self) -> BuildConfiguration {
        BuildConfiguration {
            lib_deps: self.env.lib_deps.clone(),
            lib_ignore: self.env.lib_ignore.clone(),
            build_flags: self.env.build_flags.clone(),
            src_filter: self.env.src_filter.join(" "),
        }
    }

    /// Scratch directory of this environment, relative to `root`
    pub fn scratch_dir(&self, root: &Path) -> PathBuf {
        let build_dir = self
            .env
            .build_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));
        let name = self.env.name.as_deref().unwrap_or(DEFAULT_ENV_NAME);
        root.join(build_dir).join(name)
    }

    /// Settings for compiler discovery
    pub fn locator_settings(&self) -> LocatorSettings {
        let platform = self
            .env
            .platform
            .as_deref()
            .map(HostPlatform::from_name)
            .unwrap_or_else(HostPlatform::current);

        let search_path = self
            .env
            .path
            .clone()
            .or_else(|| std::env::var("PATH").ok())
            .unwrap_or_default();

        LocatorSettings {
            override_path: self.env.custom_gcc.as_ref().map(PathBuf::from),
            packages_dir: self.env.packages_dir.clone(),
            platform,
            search_path,
            fallback: self.env.cxx.clone(),
        }
    }

    /// Settings for the preprocessor probe, relative to `root`
    pub fn probe_settings(&self, root: &Path) -> ProbeSettings {
        let header = self
            .env
            .probe_header
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROBE_HEADER));
        ProbeSettings {
            header,
            marker: self
                .env
                .probe_marker
                .clone()
                .unwrap_or_else(|| DEFAULT_PROBE_MARKER.to_string()),
            working_dir: Some(root.to_path_buf()),
        }
    }
}

/// Accept either a TOML array of strings or a single multi-line string
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
        StringOrList::Many(items) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config() {
        let config = ProjectConfig::parse("").unwrap();
        assert!(config.features.is_empty());
        assert!(config.env.lib_deps.is_empty());
        assert_eq!(config.env.custom_verbose, 0);
        assert_eq!(config.build_configuration(), BuildConfiguration::default());
    }

    #[test]
    fn test_features_keep_declaration_order() {
        let config = ProjectConfig::parse(
            r#"
            [features]
            ZETA = "zlib"
            ALPHA = "alib"
            MIDDLE = "mlib"
            "#,
        )
        .unwrap();

        let names: Vec<&str> = config.features.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ZETA", "ALPHA", "MIDDLE"]);
    }

    #[test]
    fn test_env_lists_accept_multiline_strings() {
        let config = ProjectConfig::parse(
            r#"
            [env]
            lib_deps = """
            alpha@1.0
            beta
            """
            build_flags = ["-DA=1", "-DB"]
            src_filter = ["+<src/*>", "-<src/tests>"]
            "#,
        )
        .unwrap();

        let build = config.build_configuration();
        assert_eq!(build.lib_deps, vec!["alpha@1.0", "beta"]);
        assert_eq!(build.build_flags, vec!["-DA=1", "-DB"]);
        assert_eq!(build.src_filter, "+<src/*> -<src/tests>");
    }

    #[test]
    fn test_scratch_dir() {
        let config = ProjectConfig::parse(
            r#"
            [env]
            name = "mini_e3"
            build_dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.scratch_dir(Path::new("/proj")),
            PathBuf::from("/proj/out/mini_e3")
        );
        assert_eq!(
            ProjectConfig::default().scratch_dir(Path::new("/proj")),
            PathBuf::from("/proj/.pio/build/default")
        );
    }

    #[test]
    fn test_locator_settings() {
        let config = ProjectConfig::parse(
            r#"
            [env]
            platform = "win32"
            path = "C:\\tools\\bin;C:\\Windows"
            cxx = "c++"
            custom_gcc = "C:\\gcc\\bin\\g++.exe"
            "#,
        )
        .unwrap();

        let settings = config.locator_settings();
        assert_eq!(settings.platform, HostPlatform::Windows);
        assert_eq!(settings.search_path, "C:\\tools\\bin;C:\\Windows");
        assert_eq!(settings.fallback.as_deref(), Some("c++"));
        assert_eq!(
            settings.override_path,
            Some(PathBuf::from("C:\\gcc\\bin\\g++.exe"))
        );
    }

    #[test]
    fn test_probe_defaults() {
        let settings = ProjectConfig::default().probe_settings(Path::new("/proj"));
        assert_eq!(settings.header, PathBuf::from(DEFAULT_PROBE_HEADER));
        assert_eq!(settings.marker, DEFAULT_PROBE_MARKER);
        assert_eq!(settings.working_dir, Some(PathBuf::from("/proj")));
    }

    #[test]
    fn test_verbose_out_of_range() {
        let result = ProjectConfig::parse("[env]\ncustom_verbose = 9\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_env_name() {
        let result = ProjectConfig::parse("[env]\nname = \"a/b\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_from_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[features]").unwrap();
        writeln!(temp, "SDSUPPORT = \"SdFat\"").unwrap();

        let config = ProjectConfig::from_file(temp.path()).unwrap();
        assert_eq!(config.features.get("SDSUPPORT").map(String::as_str), Some("SdFat"));
    }

    #[test]
    fn test_missing_file() {
        let result = ProjectConfig::from_file(Path::new("/nonexistent/fwdeps.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = ProjectConfig::parse("[features\nX = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
