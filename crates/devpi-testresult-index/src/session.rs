use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::index_ref::IndexRef;
use crate::links::{Link, VersionInfo};
use crate::requirement::Requirement;
use crate::state::ClientState;

pub use reqwest::Method;

/// Default user agent for index requests
pub const USER_AGENT: &str = concat!("devpi-upload-testresult/", env!("CARGO_PKG_VERSION"));

/// Header carrying base64 `user:password` credentials.
pub const AUTH_HEADER: &str = "X-Devpi-Auth";

/// Status and body of an index HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What the upload pipeline needs from an index session.
pub trait IndexApi {
    /// Metadata of the highest version of `req` available on `index`, or
    /// `Ok(None)` when the project or a matching version does not exist.
    /// `index` is never [`IndexRef::Url`]; URL indexes go through
    /// [`IndexApi::switch_to_temporary`].
    fn get_matching_versioninfo(
        &self,
        req: &Requirement,
        index: &IndexRef,
    ) -> Result<Option<VersionInfo>>;

    /// A one-shot session whose current index is `url`. Nothing is persisted
    /// and `self` is left untouched.
    fn switch_to_temporary(&self, url: &Url) -> Result<Box<dyn IndexApi>>;

    /// Issue a single request. Non-2xx statuses are returned, not raised;
    /// only transport failures are errors.
    fn http_api(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&serde_json::Value>,
    ) -> Result<HttpReply>;
}

/// Totals reported when a session is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub requests: u64,
}

/// Session against a devpi server, built from persisted client state.
#[derive(Debug)]
pub struct DevpiSession {
    state: ClientState,
    root: Option<Url>,
    current: Option<Url>,
    http: Client,
    requests: Rc<Cell<u64>>,
}

impl DevpiSession {
    pub fn open(state: ClientState) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Self::with_client(state, http, Rc::new(Cell::new(0)))
    }

    fn with_client(state: ClientState, http: Client, requests: Rc<Cell<u64>>) -> Result<Self> {
        let root = state.root_url().context("invalid client state")?;
        let current = state.index_url().context("invalid client state")?;
        Ok(Self {
            state,
            root,
            current,
            http,
            requests,
        })
    }

    pub fn root_url(&self) -> Option<&Url> {
        self.root.as_ref()
    }

    pub fn current_index(&self) -> Option<&Url> {
        self.current.as_ref()
    }

    pub fn auth_user(&self) -> Option<&str> {
        self.state.auth_user()
    }

    /// Tear the session down and report what it did.
    pub fn close(self) -> SessionStats {
        SessionStats {
            requests: self.requests.get(),
        }
    }

    fn auth_header(&self, url: &Url) -> Option<String> {
        let (user, password) = self.state.auth.as_ref()?;
        let root = self.root.as_ref()?;
        if root.origin() != url.origin() {
            return None;
        }
        Some(STANDARD.encode(format!("{user}:{password}")))
    }

    fn send(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&serde_json::Value>,
    ) -> Result<HttpReply> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(auth) = self.auth_header(url) {
            request = request.header(AUTH_HEADER, auth);
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        self.requests.set(self.requests.get() + 1);
        let response = request
            .send()
            .with_context(|| format!("{method} {url} failed"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("failed to read response body of {method} {url}"))?;
        Ok(HttpReply { status, body })
    }
}

impl IndexApi for DevpiSession {
    fn get_matching_versioninfo(
        &self,
        req: &Requirement,
        index: &IndexRef,
    ) -> Result<Option<VersionInfo>> {
        let index_url =
            index.to_index_url(self.root.as_ref(), self.current.as_ref(), self.auth_user())?;
        let project_url = project_url(&index_url, &req.project_name())?;

        let reply = self.send(Method::GET, &project_url, None)?;
        match reply.status {
            404 => return Ok(None),
            200..=299 => {}
            s => bail!("unexpected status {s} while fetching {project_url}"),
        }

        let parsed: ProjectResponse = serde_json::from_str(&reply.body)
            .with_context(|| format!("failed to parse project JSON from {project_url}"))?;

        let Some(version) = req.best_match(parsed.result.keys().map(String::as_str)) else {
            return Ok(None);
        };
        let version = version.to_string();
        let data = parsed
            .result
            .get(&version)
            .cloned()
            .unwrap_or_default();

        let links = data
            .links
            .into_iter()
            .map(|link| absolute_link(&project_url, link))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(VersionInfo {
            name: data.name.unwrap_or_else(|| req.name().to_string()),
            version,
            links,
        }))
    }

    fn switch_to_temporary(&self, url: &Url) -> Result<Box<dyn IndexApi>> {
        let same_server = self
            .root
            .as_ref()
            .is_some_and(|root| root.origin() == url.origin());
        let state = ClientState {
            index: Some(url.to_string()),
            login: None,
            auth: if same_server {
                self.state.auth.clone()
            } else {
                None
            },
        };
        let session = Self::with_client(state, self.http.clone(), Rc::clone(&self.requests))?;
        Ok(Box::new(session))
    }

    fn http_api(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&serde_json::Value>,
    ) -> Result<HttpReply> {
        self.send(method, url, payload)
    }
}

/// Run `f` with `session` and close the session afterwards, whichever way
/// `f` returns.
pub fn with_session<T, E>(
    session: DevpiSession,
    f: impl FnOnce(&DevpiSession) -> std::result::Result<T, E>,
) -> (std::result::Result<T, E>, SessionStats) {
    let result = f(&session);
    let stats = session.close();
    (result, stats)
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    #[serde(default)]
    result: BTreeMap<String, VersionData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VersionData {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "+links", default)]
    links: Vec<Link>,
}

fn project_url(index_url: &Url, project: &str) -> Result<Url> {
    let mut base = index_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("{project}/"))
        .with_context(|| format!("cannot build project URL for {project} on {index_url}"))
}

fn absolute_link(base: &Url, mut link: Link) -> Result<Link> {
    link.href = base
        .join(&link.href)
        .with_context(|| format!("invalid link href {:?}", link.href))?
        .to_string();
    Ok(link)
}
