//! Index references as accepted by `--index`.
//!
//! A reference is one of: nothing (use the current index), a bare `NAME`
//! owned by the logged-in user, `USER/NAME` on the current server, or a full
//! URL pointing at any server. Anything with more than one `/` that is not a
//! URL is rejected up front, before any lookup happens.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Parsed `--index` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRef {
    /// No override given: the current index from client state.
    Current,
    /// `NAME` on the current server, owned by the logged-in user.
    Name(String),
    /// `USER/NAME` on the current server.
    UserName { user: String, name: String },
    /// Full URL of an index, possibly on another server.
    Url(Url),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexRefError {
    #[error("index {0:?} not of form URL, USER/NAME or NAME")]
    Malformed(String),

    #[error("index {input:?} is not a valid URL: {reason}")]
    BadUrl { input: String, reason: String },

    #[error("not logged in, cannot use index name {0:?} without a user")]
    NoUser(String),

    #[error("no current index configured; pass --index or select one with `devpi use`")]
    NoCurrentIndex,
}

impl IndexRef {
    /// Parse an optional `--index` argument. Empty and whitespace-only
    /// values mean "no override".
    pub fn parse(raw: Option<&str>) -> Result<Self, IndexRefError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::Current);
        };

        if raw.starts_with("http:") || raw.starts_with("https:") {
            return Url::parse(raw)
                .map(Self::Url)
                .map_err(|e| IndexRefError::BadUrl {
                    input: raw.to_string(),
                    reason: e.to_string(),
                });
        }

        match raw.split_once('/') {
            None => Ok(Self::Name(raw.to_string())),
            Some((user, name)) if !user.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::UserName {
                    user: user.to_string(),
                    name: name.to_string(),
                })
            }
            Some(_) => Err(IndexRefError::Malformed(raw.to_string())),
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Turn the reference into an absolute index URL.
    ///
    /// `root` is the server root of the current session, `current` its
    /// selected index and `auth_user` the logged-in user, if any.
    pub fn to_index_url(
        &self,
        root: Option<&Url>,
        current: Option<&Url>,
        auth_user: Option<&str>,
    ) -> Result<Url, IndexRefError> {
        match self {
            Self::Current => current.cloned().ok_or(IndexRefError::NoCurrentIndex),
            Self::Url(url) => Ok(url.clone()),
            Self::Name(name) => {
                let user = auth_user.ok_or_else(|| IndexRefError::NoUser(name.clone()))?;
                join_on_root(root, &format!("{user}/{name}"))
            }
            Self::UserName { user, name } => join_on_root(root, &format!("{user}/{name}")),
        }
    }
}

impl fmt::Display for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("<current>"),
            Self::Name(name) => f.write_str(name),
            Self::UserName { user, name } => write!(f, "{user}/{name}"),
            Self::Url(url) => f.write_str(url.as_str()),
        }
    }
}

fn join_on_root(root: Option<&Url>, path: &str) -> Result<Url, IndexRefError> {
    let root = root.ok_or(IndexRefError::NoCurrentIndex)?;
    let mut base = root.clone();
    if !base.path().ends_with('/') {
        let p = format!("{}/", base.path());
        base.set_path(&p);
    }
    base.join(path).map_err(|e| IndexRefError::BadUrl {
        input: path.to_string(),
        reason: e.to_string(),
    })
}
