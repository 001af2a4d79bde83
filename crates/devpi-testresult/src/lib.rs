//! # devpi-testresult
//!
//! Attach externally produced tox result reports to a release on a devpi
//! index.
//!
//! tox can write a JSON report of a run with `--result-json`. When the run
//! happened outside `devpi test` (a CI matrix, another machine), this crate
//! takes those files and posts them against the source distribution of the
//! tested release, so they show up next to it on the index.
//!
//! ## Pipeline
//!
//! 1. [`resolve::resolve_sdist`] turns a requirement such as `demo==1.0` and
//!    an optional `--index` into exactly one sdist. Zero or several sdists
//!    are fatal; there is no tie-break.
//! 2. [`discover::discover`] lazily expands file and directory arguments
//!    into report candidates, optionally walking directory trees.
//! 3. [`report::inspect_report`] keeps `.json` files holding a JSON object
//!    with a `toxversion` key.
//! 4. [`engine::upload_report`] re-reads each report and POSTs it to the
//!    sdist URL. A failing report never stops the batch.
//!
//! [`engine::run_upload`] chains the four steps.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use devpi_testresult::engine::{Reporter, run_upload};
//! use devpi_testresult::types::{UploadOptions, UploadRequest};
//! use devpi_testresult_index::{ClientState, DevpiSession};
//!
//! struct Stderr;
//!
//! impl Reporter for Stderr {
//!     fn info(&mut self, msg: &str) { eprintln!("{msg}") }
//!     fn warn(&mut self, msg: &str) { eprintln!("warning: {msg}") }
//!     fn error(&mut self, msg: &str) { eprintln!("error: {msg}") }
//! }
//!
//! let session = DevpiSession::open(ClientState::load_default(None)?)?;
//! let request = UploadRequest {
//!     pkgspec: "demo==1.0".to_string(),
//!     index: None,
//!     paths: vec![PathBuf::from(".tox/results")],
//!     recursive: true,
//!     options: UploadOptions::default(),
//! };
//! let summary = run_upload(&session, &request, &mut Stderr)?;
//! println!("{summary}");
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`types`] — Requests, options, the resolved artifact, outcomes
//! - [`error`] — Fatal configuration and resolution errors
//! - [`report`] — Report validation
//! - [`discover`] — Lazy report discovery
//! - [`resolve`] — Sdist resolution
//! - [`engine`] — Upload orchestration and the `Reporter` trait

/// Lazy expansion of file and directory arguments.
pub mod discover;

/// Upload orchestration and diagnostics.
pub mod engine;

/// Fatal configuration and resolution errors.
pub mod error;

/// Report validation.
pub mod report;

/// Requirement + index to a single sdist.
pub mod resolve;

/// Domain types: requests, options, artifact, outcomes.
pub mod types;

pub use devpi_testresult_index as index;

#[cfg(test)]
mod testing;
