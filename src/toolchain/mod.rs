//! Compiler discovery
//!
//! Resolution order:
//! 1. Explicit override from configuration (`custom_gcc`)
//! 2. Path cached in the scratch directory by an earlier run
//! 3. First matching compiler in a toolchain `bin` folder on the search path
//! 4. The generic compiler designated by the build environment

mod cache;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex_lite::Regex;
use serde::Serialize;

pub use cache::{FsPathCache, MemoryPathCache, PathCache, COMPILER_CACHE_KEY};

/// Compiler used when nothing else is available
pub const GENERIC_COMPILER: &str = "c++";

/// Host platform conventions relevant to discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    Windows,
    Posix,
}

impl HostPlatform {
    /// Platform this binary runs on
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Map a build-tool platform name (`win32`, `linux`, `darwin`, ...)
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "win32" | "windows" => Self::Windows,
            _ => Self::Posix,
        }
    }

    /// Separator between search path entries
    pub fn path_separator(&self) -> char {
        match self {
            Self::Windows => ';',
            Self::Posix => ':',
        }
    }

    /// Suffix identifying the C++ compiler executable
    pub fn compiler_suffix(&self) -> &'static str {
        match self {
            Self::Windows => "g++.exe",
            Self::Posix => "g++",
        }
    }

    /// Pattern matching toolchain `bin` folders below `packages_dir`
    pub fn toolchain_dir_pattern(&self, packages_dir: &Path) -> Result<Regex, regex_lite::Error> {
        let root = regex_lite::escape(&packages_dir.to_string_lossy());
        let pattern = match self {
            Self::Windows => format!(r"(?i){}.*\\bin", root),
            Self::Posix => format!(r"(?i){}/.+/bin", root),
        };
        Regex::new(&pattern)
    }
}

/// Inputs for compiler discovery
#[derive(Debug, Clone)]
pub struct LocatorSettings {
    /// Explicit compiler, bypassing discovery
    pub override_path: Option<PathBuf>,
    /// Root of installed toolchain packages
    pub packages_dir: Option<PathBuf>,
    pub platform: HostPlatform,
    /// Raw search path, separated per `platform`
    pub search_path: String,
    /// Generic compiler designated by the build environment
    pub fallback: Option<String>,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            override_path: None,
            packages_dir: None,
            platform: HostPlatform::current(),
            search_path: String::new(),
            fallback: None,
        }
    }
}

/// Where a compiler path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerSource {
    Override,
    Cache,
    SearchPath,
    Fallback,
}

impl fmt::Display for CompilerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Override => "override",
            Self::Cache => "cache",
            Self::SearchPath => "search path",
            Self::Fallback => "fallback",
        };
        f.write_str(label)
    }
}

/// A located compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerPath {
    pub path: PathBuf,
    pub source: CompilerSource,
}

impl CompilerPath {
    fn new(path: impl Into<PathBuf>, source: CompilerSource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Finds a compiler for the current environment
pub struct CompilerLocator<C> {
    settings: LocatorSettings,
    cache: C,
}

impl<C: PathCache> CompilerLocator<C> {
    pub fn new(settings: LocatorSettings, cache: C) -> Self {
        Self { settings, cache }
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.settings
    }

    /// Locate a compiler. Never fails: an unusable fallback surfaces later
    /// when the compiler is invoked.
    pub fn locate(&self) -> CompilerPath {
        if let Some(path) = &self.settings.override_path {
            log::info!("Getting compiler from env: {}", path.display());
            return CompilerPath::new(path, CompilerSource::Override);
        }

        if let Some(cached) = self.cache.load(COMPILER_CACHE_KEY) {
            log::debug!("Using cached compiler {}", cached);
            return CompilerPath::new(cached, CompilerSource::Cache);
        }

        if let Some(found) = self.search() {
            if let Err(e) = self
                .cache
                .store(COMPILER_CACHE_KEY, &found.to_string_lossy())
            {
                log::warn!("Failed to cache compiler path: {}", e);
            }
            return CompilerPath::new(found, CompilerSource::SearchPath);
        }

        let fallback = self
            .settings
            .fallback
            .clone()
            .unwrap_or_else(|| GENERIC_COMPILER.to_string());
        log::warn!("Couldn't find a compiler! Fallback to {}", fallback);
        CompilerPath::new(fallback, CompilerSource::Fallback)
    }

    /// Scan toolchain folders on the search path
    fn search(&self) -> Option<PathBuf> {
        let packages_dir = self.settings.packages_dir.as_ref()?;
        let pattern = match self.settings.platform.toolchain_dir_pattern(packages_dir) {
            Ok(pattern) => pattern,
            Err(e) => {
                log::warn!("Invalid toolchain folder pattern: {}", e);
                return None;
            }
        };
        let suffix = self.settings.platform.compiler_suffix();

        self.settings
            .search_path
            .split(self.settings.platform.path_separator())
            .filter(|dir| !dir.is_empty() && pattern.is_match(dir))
            .find_map(|dir| find_compiler_in(Path::new(dir), suffix))
    }
}

/// First executable in `dir` (by name) whose name ends with `suffix`
fn find_compiler_in(dir: &Path, suffix: &str) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Skipping {}: {}", dir.display(), e);
            return None;
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(suffix))
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
