//! Typed grammar for per-feature build configuration fragments.
//!
//! A fragment is the raw text attached to a feature, either in the
//! `[features]` table of the project file or in a per-build override:
//!
//! ```text
//! lib_deps=teemuatlut/TMCStepper@~0.7.1
//! src_filter=+<src/feature/tmc_util.cpp>
//! ```
//!
//! This crate turns fragments into [`Atom`]s and folds them into a
//! [`FeatureConfig`]. It performs no I/O.

mod feature;
mod package;
mod parser;

pub use feature::FeatureConfig;
pub use package::PackageSpec;
pub use parser::{parse_fragment, Atom, StructuralField, LIB_DEPS_KEY};

/// Errors produced while parsing a fragment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FragmentError {
    #[error("atom '{atom}' has an empty key before '='")]
    EmptyKey { atom: String },

    #[error("'{key}' requires a value")]
    MissingValue { key: String },

    #[error("invalid dependency spec '{spec}': no package name")]
    InvalidSpec { spec: String },
}
