//! In-memory index and reporter used by the unit tests.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use anyhow::{Result, anyhow};
use devpi_testresult_index::links::REL_RELEASEFILE;
use devpi_testresult_index::{
    HttpReply, IndexApi, IndexRef, IndexRefError, Link, Method, Requirement, VersionInfo,
};
use url::Url;

use crate::engine::Reporter;

#[derive(Debug, Default)]
pub(crate) struct CallLog {
    pub lookups: Vec<(String, IndexRef)>,
    pub temporaries: Vec<Url>,
    pub posts: Vec<(Url, serde_json::Value)>,
}

/// Serves one canned version for every lookup and answers every POST with
/// `post_status`.
#[derive(Debug, Clone)]
pub(crate) struct FakeIndex {
    pub info: Option<VersionInfo>,
    pub post_status: u16,
    pub transport_error: bool,
    pub lookup_error: Option<IndexRefError>,
    pub log: Rc<RefCell<CallLog>>,
}

impl Default for FakeIndex {
    fn default() -> Self {
        Self {
            info: None,
            post_status: 200,
            transport_error: false,
            lookup_error: None,
            log: Rc::default(),
        }
    }
}

impl FakeIndex {
    pub fn with_links(links: Vec<Link>) -> Self {
        Self {
            info: Some(version_info(links)),
            ..Self::default()
        }
    }

    pub fn log(&self) -> Ref<'_, CallLog> {
        self.log.borrow()
    }
}

impl IndexApi for FakeIndex {
    fn get_matching_versioninfo(
        &self,
        req: &Requirement,
        index: &IndexRef,
    ) -> Result<Option<VersionInfo>> {
        self.log
            .borrow_mut()
            .lookups
            .push((req.to_string(), index.clone()));
        if let Some(e) = &self.lookup_error {
            return Err(e.clone().into());
        }
        Ok(self.info.clone())
    }

    fn switch_to_temporary(&self, url: &Url) -> Result<Box<dyn IndexApi>> {
        self.log.borrow_mut().temporaries.push(url.clone());
        Ok(Box::new(self.clone()))
    }

    fn http_api(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&serde_json::Value>,
    ) -> Result<HttpReply> {
        assert_eq!(method, Method::POST);
        if self.transport_error {
            return Err(anyhow!("connection refused"));
        }
        self.log
            .borrow_mut()
            .posts
            .push((url.clone(), payload.cloned().unwrap_or_default()));
        Ok(HttpReply {
            status: self.post_status,
            body: String::new(),
        })
    }
}

pub(crate) fn release_link(href: &str) -> Link {
    Link {
        rel: REL_RELEASEFILE.to_string(),
        href: href.to_string(),
        hash_spec: None,
    }
}

pub(crate) fn version_info(links: Vec<Link>) -> VersionInfo {
    VersionInfo {
        name: "demo".to_string(),
        version: "1.0".to_string(),
        links,
    }
}

#[derive(Debug, Default)]
pub(crate) struct CollectingReporter {
    pub infos: Vec<String>,
    pub warns: Vec<String>,
    pub errors: Vec<String>,
}

impl CollectingReporter {
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.infos.iter().chain(&self.warns).chain(&self.errors)
    }
}

impl Reporter for CollectingReporter {
    fn info(&mut self, msg: &str) {
        self.infos.push(msg.to_string());
    }

    fn warn(&mut self, msg: &str) {
        self.warns.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }
}
