//! Index session client for `devpi-upload-testresult`.
//!
//! This crate is the narrow interface the upload pipeline talks to: it knows
//! how to find the current server and login from persisted client state,
//! how to turn an `--index` value into an index URL, how to look up the
//! version of a project that matches a requirement, and how to issue
//! authenticated JSON calls.
//!
//! # Example
//!
//! ```no_run
//! use devpi_testresult_index::{ClientState, DevpiSession, IndexApi, IndexRef, Requirement};
//!
//! let state = ClientState::load_default(None)?;
//! let session = DevpiSession::open(state)?;
//!
//! let req = Requirement::parse("pytest==8.0.0")?;
//! let index = IndexRef::parse(Some("alice/dev"))?;
//! if let Some(info) = session.get_matching_versioninfo(&req, &index)? {
//!     println!("{} {}: {} links", info.name, info.version, info.links.len());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

/// `--index` reference parsing and index URL construction.
pub mod index_ref;

/// Release links and sdist/wheel classification.
pub mod links;

/// Requirement parsing and version matching.
pub mod requirement;

/// `IndexApi` trait and the HTTP-backed `DevpiSession`.
pub mod session;

/// Persisted client state (`current.json`).
pub mod state;

pub use index_ref::{IndexRef, IndexRefError};
pub use links::{Link, ReleaseFiles, VersionInfo, find_sdist_and_wheels, url_nofrag};
pub use requirement::{Requirement, RequirementError, Version, normalize_name};
pub use session::{
    DevpiSession, HttpReply, IndexApi, Method, SessionStats, USER_AGENT, with_session,
};
pub use state::{ClientState, StateError};
