//! Persisted client state: which server and index are current, and who is
//! logged in.
//!
//! The state lives in `<clientdir>/current.json`, the same file `devpi use`
//! and `devpi login` maintain:
//!
//! ```json
//! {"index": "http://localhost:3141/alice/dev",
//!  "login": "http://localhost:3141/+login",
//!  "auth": ["alice", "<token>"]}
//! ```
//!
//! The client directory resolves from an explicit path, then
//! `DEVPI_CLIENTDIR`, then `~/.devpi/client`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable overriding the client directory.
pub const CLIENTDIR_ENV: &str = "DEVPI_CLIENTDIR";

/// State file name inside the client directory.
pub const STATE_FILE: &str = "current.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read client state at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse client state at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("client state field {field} is not a usable URL: {value}")]
    BadUrl { field: &'static str, value: String },
}

/// Get the state file path for a client directory
pub fn state_path(clientdir: &Path) -> PathBuf {
    clientdir.join(STATE_FILE)
}

/// Resolve the client directory: explicit path, `DEVPI_CLIENTDIR`, then
/// `~/.devpi/client`. Returns `None` only if no home directory is known.
pub fn resolve_clientdir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir.to_path_buf());
    }
    if let Ok(dir) = env::var(CLIENTDIR_ENV)
        && !dir.trim().is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(".devpi").join("client"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// URL of the current index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Login URL of the current server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    /// `[user, password]` pair from the last login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<(String, String)>,
}

impl ClientState {
    /// Load state from `clientdir`. A missing state file yields empty state.
    pub fn load(clientdir: &Path) -> Result<Self, StateError> {
        let path = state_path(clientdir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(StateError::Read { path, source }),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).map_err(|source| StateError::Parse { path, source })
    }

    /// Load state from wherever [`resolve_clientdir`] points.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, StateError> {
        match resolve_clientdir(explicit) {
            Some(dir) => Self::load(&dir),
            None => Ok(Self::default()),
        }
    }

    pub fn auth_user(&self) -> Option<&str> {
        self.auth.as_ref().map(|(user, _)| user.as_str())
    }

    pub fn index_url(&self) -> Result<Option<Url>, StateError> {
        self.index
            .as_deref()
            .map(|raw| parse_field("index", raw))
            .transpose()
    }

    /// Root of the current server: the index URL minus `USER/NAME`, or the
    /// login URL minus `+login`.
    pub fn root_url(&self) -> Result<Option<Url>, StateError> {
        if let Some(index) = self.index_url()? {
            return parent_url(&index, 2, "index").map(Some);
        }
        if let Some(raw) = self.login.as_deref() {
            let login = parse_field("login", raw)?;
            return parent_url(&login, 1, "login").map(Some);
        }
        Ok(None)
    }
}

fn parse_field(field: &'static str, raw: &str) -> Result<Url, StateError> {
    Url::parse(raw).map_err(|_| StateError::BadUrl {
        field,
        value: raw.to_string(),
    })
}

fn parent_url(url: &Url, levels: usize, field: &'static str) -> Result<Url, StateError> {
    let bad = || StateError::BadUrl {
        field,
        value: url.to_string(),
    };
    let mut root = url.clone();
    root.set_query(None);
    root.set_fragment(None);
    {
        let mut segments = root.path_segments_mut().map_err(|_| bad())?;
        segments.pop_if_empty();
        for _ in 0..levels {
            segments.pop();
        }
        segments.push("");
    }
    Ok(root)
}
