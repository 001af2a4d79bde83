//! Release links of a project version and their classification into source
//! distributions and wheels.

use serde::{Deserialize, Serialize};
use url::Url;

/// `rel` of links pointing at uploaded release files.
pub const REL_RELEASEFILE: &str = "releasefile";
/// `rel` of links pointing at uploaded documentation archives.
pub const REL_DOCZIP: &str = "doczip";
/// `rel` of links pointing at attached tox results.
pub const REL_TOXRESULT: &str = "toxresult";

const SDIST_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".tar.bz2", ".tar.xz", ".zip", ".tar"];

/// One entry of a version's `+links` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_spec: Option<String>,
}

impl Link {
    /// Last path segment of the link, without query or fragment.
    pub fn basename(&self) -> &str {
        let path = self
            .href
            .split(['#', '?'])
            .next()
            .unwrap_or_default();
        path.rsplit('/').next().unwrap_or(path)
    }

    pub fn is_sdist(&self) -> bool {
        let name = self.basename().to_ascii_lowercase();
        SDIST_SUFFIXES.iter().any(|s| name.ends_with(s))
    }

    pub fn is_wheel(&self) -> bool {
        self.basename().to_ascii_lowercase().ends_with(".whl")
    }

    /// Pure-Python wheel installable on any platform.
    pub fn is_universal_wheel(&self) -> bool {
        let name = self.basename().to_ascii_lowercase();
        let Some(stem) = name.strip_suffix(".whl") else {
            return false;
        };
        let tags: Vec<&str> = stem.rsplitn(4, '-').collect();
        // rsplitn yields platform, abi, python, rest
        matches!(tags.as_slice(), [platform, abi, python, _]
            if *platform == "any" && *abi == "none" && python.split('.').all(|t| t.starts_with("py")))
    }
}

/// Version metadata as returned by a project lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub links: Vec<Link>,
}

impl VersionInfo {
    pub fn get_links(&self, rel: &str) -> Vec<&Link> {
        self.links.iter().filter(|l| l.rel == rel).collect()
    }
}

/// Release files split by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReleaseFiles<'a> {
    pub sdists: Vec<&'a Link>,
    pub wheels: Vec<&'a Link>,
    /// Wheels dropped because they are not platform-universal.
    pub skipped_wheels: Vec<&'a Link>,
}

/// Split release links into source distributions and wheels. With
/// `universal_only`, platform-specific wheels end up in `skipped_wheels`.
/// Links that are neither are ignored.
pub fn find_sdist_and_wheels<'a>(links: &[&'a Link], universal_only: bool) -> ReleaseFiles<'a> {
    let mut files = ReleaseFiles::default();
    for &link in links {
        if link.is_wheel() {
            if universal_only && !link.is_universal_wheel() {
                files.skipped_wheels.push(link);
            } else {
                files.wheels.push(link);
            }
        } else if link.is_sdist() {
            files.sdists.push(link);
        }
    }
    files
}

/// An absolute release-file `href` with its `#hash` fragment removed. This
/// is the URL results get posted to.
pub fn url_nofrag(href: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(href)?;
    url.set_fragment(None);
    Ok(url)
}
