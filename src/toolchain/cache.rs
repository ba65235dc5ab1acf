//! Key-value cache for discovered tool paths
//!
//! Discovery scans every directory on the search path, so its result is
//! kept in the environment's scratch directory and reused by later runs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cache key for the discovered compiler path
pub const COMPILER_CACHE_KEY: &str = ".gcc_path";

/// Storage for small string values keyed by name
pub trait PathCache {
    /// Load a cached value, if any
    fn load(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one
    fn store(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One plain-text file per key under a scratch directory.
///
/// Nothing is written while the scratch directory does not exist yet; the
/// build tool creates it on its first build.
#[derive(Debug, Clone)]
pub struct FsPathCache {
    dir: PathBuf,
}

impl FsPathCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl PathCache for FsPathCache {
    fn load(&self, key: &str) -> Option<String> {
        let value = fs::read_to_string(self.file(key)).ok()?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn store(&self, key: &str, value: &str) -> io::Result<()> {
        if !self.dir.is_dir() {
            log::debug!(
                "Scratch dir {} does not exist, not caching {}",
                self.dir.display(),
                key
            );
            return Ok(());
        }
        fs::write(self.file(key), value)
    }
}

/// In-memory cache for tests
#[derive(Debug, Default)]
pub struct MemoryPathCache {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with one pre-populated entry
    pub fn with_entry(key: &str, value: &str) -> Self {
        let cache = Self::new();
        cache
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        cache
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl PathCache for MemoryPathCache {
    fn load(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    fn store(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<C: PathCache + ?Sized> PathCache for &C {
    fn load(&self, key: &str) -> Option<String> {
        (**self).load(key)
    }

    fn store(&self, key: &str, value: &str) -> io::Result<()> {
        (**self).store(key, value)
    }
}
