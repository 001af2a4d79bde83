//! Resolution of a requirement plus optional `--index` into the one source
//! distribution results get attached to.

use devpi_testresult_index::links::REL_RELEASEFILE;
use devpi_testresult_index::{
    IndexApi, IndexRef, IndexRefError, Requirement, find_sdist_and_wheels, url_nofrag,
};

use crate::engine::Reporter;
use crate::error::{ConfigError, Error, ResolveError};
use crate::types::{Artifact, UploadOptions};

/// Resolve `pkgspec` on the index named by `index` to exactly one sdist.
///
/// A malformed index reference fails before the session is touched. A URL
/// reference is looked up through a temporary session, leaving `session`
/// and its persisted state alone.
pub fn resolve_sdist(
    session: &dyn IndexApi,
    pkgspec: &str,
    index: Option<&str>,
    opts: &UploadOptions,
    reporter: &mut dyn Reporter,
) -> Result<Artifact, Error> {
    let index = IndexRef::parse(index)?;
    let req = Requirement::parse(pkgspec)?;

    let lookup = match &index {
        IndexRef::Url(url) => {
            if opts.verbose() {
                reporter.info(&format!("using temporary index {url}"));
            }
            session
                .switch_to_temporary(url)
                .and_then(|temporary| temporary.get_matching_versioninfo(&req, &IndexRef::Current))
        }
        other => session.get_matching_versioninfo(&req, other),
    };

    let info = lookup
        .map_err(|source| match source.downcast::<IndexRefError>() {
            Ok(e) => Error::Config(ConfigError::Index(e)),
            Err(source) => Error::Resolve(ResolveError::Lookup {
                spec: pkgspec.to_string(),
                source,
            }),
        })?
        .ok_or_else(|| ResolveError::NoMatchingVersion(pkgspec.to_string()))?;

    let links = info.get_links(REL_RELEASEFILE);
    if links.is_empty() {
        return Err(ResolveError::NoReleaseFiles {
            spec: pkgspec.to_string(),
            version: info.version.clone(),
        }
        .into());
    }

    let files = find_sdist_and_wheels(&links, true);
    if opts.verbose() {
        for wheel in &files.skipped_wheels {
            reporter.info(&format!(
                "only universal wheels supported, ignoring {}",
                wheel.basename()
            ));
        }
    }

    match files.sdists.as_slice() {
        [sdist] => {
            let url = url_nofrag(&sdist.href).map_err(|_| ResolveError::BadLink {
                href: sdist.href.clone(),
            })?;
            Ok(Artifact {
                project: info.name.clone(),
                version: info.version.clone(),
                href: sdist.href.clone(),
                url,
                basename: sdist.basename().to_string(),
            })
        }
        [] => Err(ResolveError::NoSdist {
            spec: pkgspec.to_string(),
            version: info.version.clone(),
            release_files: links.iter().map(|l| l.basename().to_string()).collect(),
        }
        .into()),
        many => Err(ResolveError::MultipleSdists {
            spec: pkgspec.to_string(),
            version: info.version.clone(),
            candidates: many.iter().map(|l| l.basename().to_string()).collect(),
        }
        .into()),
    }
}
