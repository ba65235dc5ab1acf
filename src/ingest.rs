//! Feature table ingestion
//!
//! Fragments from the `[features]` table are merged first, then override
//! fragments. Feature names are upper-cased. The table keeps features in
//! order of first mention and is read-only once built.

use fwdeps_fragment::{FeatureConfig, FragmentError};
use indexmap::IndexMap;

/// Ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid fragment for feature {feature}: {source}")]
    Fragment {
        feature: String,
        #[source]
        source: FragmentError,
    },
}

/// Feature name → configuration, in order of first mention
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureConfigTable {
    features: IndexMap<String, FeatureConfig>,
}

impl FeatureConfigTable {
    /// Build the table from declared fragments and overrides
    pub fn ingest<I, J, K, V, K2, V2>(features: I, overrides: J) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = (K, V)>,
        J: IntoIterator<Item = (K2, V2)>,
        K: AsRef<str>,
        V: AsRef<str>,
        K2: AsRef<str>,
        V2: AsRef<str>,
    {
        let mut table = Self::default();

        log::info!("Gather [features] entries...");
        for (name, fragment) in features {
            table.add_fragment(name.as_ref(), fragment.as_ref())?;
        }

        log::info!("Gather feature overrides...");
        for (name, fragment) in overrides {
            table.add_fragment(name.as_ref(), fragment.as_ref())?;
        }

        Ok(table)
    }

    fn add_fragment(&mut self, name: &str, fragment: &str) -> Result<(), IngestError> {
        let feature = name.trim().to_uppercase();
        log::trace!("[{}] {}", feature, fragment.trim());

        let entry = self.features.entry(feature.clone()).or_default();
        entry
            .apply_fragment(fragment)
            .map_err(|source| IngestError::Fragment { feature, source })
    }

    pub fn get(&self, name: &str) -> Option<&FeatureConfig> {
        self.features.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureConfig)> {
        self.features.iter().map(|(name, feature)| (name.as_str(), feature))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Package names referenced by any feature, enabled or not, in order of
    /// first mention (may repeat)
    pub fn known_libraries(&self) -> impl Iterator<Item = &str> {
        self.features.values().flat_map(FeatureConfig::package_names)
    }
}
