//! Fatal errors. Anything that only affects a single report is an
//! [`crate::types::UploadOutcome`] instead.

use devpi_testresult_index::{IndexRefError, RequirementError, StateError};
use thiserror::Error;

/// Bad input or client configuration, detected before any lookup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Index(#[from] IndexRefError),

    #[error("invalid package specification: {0}")]
    Requirement(#[from] RequirementError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// The requirement did not resolve to exactly one source distribution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not find/receive links for {0}")]
    NoMatchingVersion(String),

    #[error("could not find/receive release files for {spec} {version}")]
    NoReleaseFiles { spec: String, version: String },

    #[error(
        "found 0 sdists for {spec} {version}, expected exactly one{}",
        listing(" among release files", release_files)
    )]
    NoSdist {
        spec: String,
        version: String,
        release_files: Vec<String>,
    },

    #[error(
        "found {} sdists for {spec} {version}, expected exactly one{}",
        candidates.len(),
        listing("", candidates)
    )]
    MultipleSdists {
        spec: String,
        version: String,
        candidates: Vec<String>,
    },

    #[error("release file link {href:?} is not a valid URL")]
    BadLink { href: String },

    #[error("failed to look up {spec}")]
    Lookup {
        spec: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Either kind of fatal error, as returned by [`crate::engine::run_upload`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl From<IndexRefError> for Error {
    fn from(e: IndexRefError) -> Self {
        Self::Config(e.into())
    }
}

impl From<RequirementError> for Error {
    fn from(e: RequirementError) -> Self {
        Self::Config(e.into())
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        Self::Config(e.into())
    }
}

fn listing(prefix: &str, items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!("{prefix}: {}", items.join(", "))
    }
}
