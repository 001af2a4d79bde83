//! Report validation: is this file a tox result?
//!
//! The check is shallow on purpose. A report is a `.json` file holding a JSON
//! object with a `toxversion` key; nothing else about its schema is looked at.

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Extension a report file must carry (compared case-sensitively).
pub const REPORT_EXTENSION: &str = "json";

/// Key tox writes into every `--result-json` report.
pub const MARKER_KEY: &str = "toxversion";

/// Why a file is or is not an eligible report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    WrongExtension,
    Unreadable(String),
    NotJson(String),
    NotMapping,
    MissingMarker,
    /// Already yielded under another argument.
    Duplicate,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid report"),
            Self::WrongExtension => write!(f, "not a .{REPORT_EXTENSION} file"),
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
            Self::NotJson(e) => write!(f, "not JSON: {e}"),
            Self::NotMapping => f.write_str("not a JSON object"),
            Self::MissingMarker => write!(f, "not produced by tox (no {MARKER_KEY:?} key)"),
            Self::Duplicate => f.write_str("already listed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read report file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("report file {} is not JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn has_report_extension(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(REPORT_EXTENSION))
}

/// Read and parse a report file. Nothing beyond JSON syntax is checked.
pub fn load_report(path: &Path) -> Result<Value, ReportError> {
    let content = fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ReportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Marker check on an already parsed document.
pub fn classify_document(doc: &Value) -> Verdict {
    match doc.as_object() {
        None => Verdict::NotMapping,
        Some(map) if map.contains_key(MARKER_KEY) => Verdict::Valid,
        Some(_) => Verdict::MissingMarker,
    }
}

/// Full verdict for `path`. Files without the report extension are
/// rejected without being opened.
pub fn inspect_report(path: &Path) -> Verdict {
    if !has_report_extension(path) {
        return Verdict::WrongExtension;
    }
    match load_report(path) {
        Ok(doc) => classify_document(&doc),
        Err(ReportError::Read { source, .. }) => Verdict::Unreadable(source.to_string()),
        Err(ReportError::Parse { source, .. }) => Verdict::NotJson(source.to_string()),
    }
}

pub fn is_valid_report(path: &Path) -> bool {
    inspect_report(path).is_valid()
}
