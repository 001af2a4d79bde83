use std::path::Path;

use devpi_testresult_index::{IndexApi, Method};

use crate::discover::{self, Origin, ReportCandidate};
use crate::error::Error;
use crate::report::{self, Verdict, classify_document};
use crate::resolve;
use crate::types::{Artifact, UploadOptions, UploadOutcome, UploadRequest, UploadSummary};

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Resolve the sdist once, then upload every report discovered under
/// `request.paths`. Only configuration and resolution problems are errors;
/// per-report failures are tallied in the summary.
pub fn run_upload(
    session: &dyn IndexApi,
    request: &UploadRequest,
    reporter: &mut dyn Reporter,
) -> Result<UploadSummary, Error> {
    let opts = &request.options;
    let artifact = resolve::resolve_sdist(
        session,
        &request.pkgspec,
        request.index.as_deref(),
        opts,
        reporter,
    )?;
    reporter.info(&format!("Found sdist: {}", artifact.href));

    let inputs = discover::existing_paths(&request.paths, reporter);
    let mut summary = UploadSummary::default();
    for candidate in discover::discover(inputs, request.recursive) {
        if candidate.is_valid() {
            let outcome = upload_report(session, &artifact, &candidate.path, opts, reporter);
            summary.record(&outcome);
        } else if let Some(outcome) = report_rejected(&candidate, opts, reporter) {
            summary.record(&outcome);
        }
    }

    Ok(summary)
}

/// Diagnose a candidate discovery turned down. Returns an outcome when the
/// candidate counts as an invalid report rather than an ignored file.
fn report_rejected(
    candidate: &ReportCandidate,
    opts: &UploadOptions,
    reporter: &mut dyn Reporter,
) -> Option<UploadOutcome> {
    let path = candidate.path.display();
    let reason = candidate.verdict.to_string();
    match (candidate.origin, &candidate.verdict) {
        (Origin::Directory, _) => {
            reporter.warn(&format!("could not list directory {path}, skipping: {reason}"));
            None
        }
        (_, Verdict::Duplicate) => {
            if opts.verbose() {
                reporter.info(&format!("{path} already listed, not posting it twice"));
            }
            None
        }
        (Origin::Argument, _) => {
            reporter.error(&format!("{path} does not contain a valid report ({reason})"));
            Some(UploadOutcome::SkippedInvalid { reason })
        }
        (Origin::Scan, Verdict::WrongExtension) => {
            if opts.verbose() {
                reporter.info(&format!("ignoring {path}: {reason}"));
            }
            None
        }
        (Origin::Scan, _) => {
            reporter.warn(&format!("skipping {path}: {reason}"));
            Some(UploadOutcome::SkippedInvalid { reason })
        }
    }
}

/// Load `report_path` afresh and post it to `artifact`.
///
/// Never fails: unreadable or unparseable files, rejected posts and
/// transport errors all come back as [`UploadOutcome::Failed`]. With
/// `opts.simulate` every step but the POST itself runs.
pub fn upload_report(
    session: &dyn IndexApi,
    artifact: &Artifact,
    report_path: &Path,
    opts: &UploadOptions,
    reporter: &mut dyn Reporter,
) -> UploadOutcome {
    let path = report_path.display();

    let document = match report::load_report(report_path) {
        Ok(doc) => doc,
        Err(e) => {
            reporter.error(&format!("{e}, skip processing"));
            return UploadOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    let verdict = classify_document(&document);
    if !verdict.is_valid() {
        reporter.error(&format!("report file {path} is {verdict}, skip processing"));
        return UploadOutcome::SkippedInvalid {
            reason: verdict.to_string(),
        };
    }

    if opts.simulate {
        if opts.verbose() {
            reporter.info(&format!("would post {path} to {}", artifact.url));
        }
        return UploadOutcome::SkippedSimulated;
    }

    if opts.verbose() {
        reporter.info(&format!("posting {path} to {artifact}..."));
    }

    match session.http_api(Method::POST, &artifact.url, Some(&document)) {
        Ok(reply) if reply.is_success() => {
            if opts.verbose() {
                reporter.info(&format!("successfully posted {path}"));
            }
            UploadOutcome::Posted
        }
        Ok(reply) => {
            reporter.error(&format!(
                "could not post {path} to {}: HTTP {}",
                artifact.url, reply.status
            ));
            if opts.debug() && !reply.body.is_empty() {
                reporter.info(&format!("response body: {}", reply.body.trim()));
            }
            UploadOutcome::Failed {
                reason: format!("HTTP {}", reply.status),
            }
        }
        Err(e) => {
            reporter.error(&format!("could not post {path}: {e:#}"));
            UploadOutcome::Failed {
                reason: format!("{e:#}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::tempdir;

    use super::*;
    use crate::testing::{CollectingReporter, FakeIndex, release_link};

    const VALID: &str = r#"{"toxversion": "4.0", "testenvs": {"py311": {}}}"#;

    fn artifact() -> Artifact {
        Artifact {
            project: "demo".to_string(),
            version: "1.0".to_string(),
            href: "http://idx/alice/+f/aa/demo-1.0.tar.gz#sha256=00".to_string(),
            url: url::Url::parse("http://idx/alice/+f/aa/demo-1.0.tar.gz").unwrap(),
            basename: "demo-1.0.tar.gz".to_string(),
        }
    }

    fn demo_index() -> FakeIndex {
        FakeIndex::with_links(vec![release_link(
            "http://idx/alice/+f/aa/demo-1.0.tar.gz#sha256=00",
        )])
    }

    fn write_reports(dir: &Path, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let path = dir.join(format!("r{i}.json"));
                fs::write(&path, VALID).expect("write");
                path
            })
            .collect()
    }

    fn request(paths: Vec<PathBuf>, simulate: bool) -> UploadRequest {
        UploadRequest {
            pkgspec: "demo==1.0".to_string(),
            index: None,
            paths,
            recursive: false,
            options: UploadOptions {
                simulate,
                verbosity: 0,
            },
        }
    }

    #[test]
    fn posts_parsed_document_to_fragmentless_url() {
        let td = tempdir().expect("tempdir");
        let path = write_reports(td.path(), 1).remove(0);
        let index = FakeIndex::default();
        let mut reporter = CollectingReporter::default();

        let outcome = upload_report(
            &index,
            &artifact(),
            &path,
            &UploadOptions::default(),
            &mut reporter,
        );
        assert_eq!(outcome, UploadOutcome::Posted);

        let log = index.log();
        assert_eq!(log.posts.len(), 1);
        assert_eq!(log.posts[0].0.as_str(), "http://idx/alice/+f/aa/demo-1.0.tar.gz");
        assert_eq!(log.posts[0].1["toxversion"], "4.0");
        assert!(reporter.infos.is_empty());
    }

    #[test]
    fn non_success_status_is_a_failure() {
        let td = tempdir().expect("tempdir");
        let path = write_reports(td.path(), 1).remove(0);
        let index = FakeIndex {
            post_status: 403,
            ..FakeIndex::default()
        };
        let mut reporter = CollectingReporter::default();

        let outcome = upload_report(
            &index,
            &artifact(),
            &path,
            &UploadOptions::default(),
            &mut reporter,
        );
        assert_eq!(
            outcome,
            UploadOutcome::Failed {
                reason: "HTTP 403".to_string()
            }
        );
        assert!(reporter.errors[0].contains("HTTP 403"));
    }

    #[test]
    fn transport_errors_are_failures() {
        let td = tempdir().expect("tempdir");
        let path = write_reports(td.path(), 1).remove(0);
        let index = FakeIndex {
            transport_error: true,
            ..FakeIndex::default()
        };
        let mut reporter = CollectingReporter::default();

        let outcome = upload_report(
            &index,
            &artifact(),
            &path,
            &UploadOptions::default(),
            &mut reporter,
        );
        assert!(matches!(outcome, UploadOutcome::Failed { .. }));
        assert!(reporter.errors[0].contains("connection refused"));
    }

    #[test]
    fn file_broken_after_discovery_fails_without_posting() {
        let td = tempdir().expect("tempdir");
        let path = write_reports(td.path(), 1).remove(0);
        fs::write(&path, "{truncated").expect("write");
        let index = FakeIndex::default();
        let mut reporter = CollectingReporter::default();

        let outcome = upload_report(
            &index,
            &artifact(),
            &path,
            &UploadOptions::default(),
            &mut reporter,
        );
        assert!(matches!(outcome, UploadOutcome::Failed { .. }));
        assert!(reporter.errors[0].contains("r0.json"));
        assert!(index.log().posts.is_empty());
    }

    #[test]
    fn marker_lost_after_discovery_is_skipped_invalid() {
        let td = tempdir().expect("tempdir");
        let path = write_reports(td.path(), 1).remove(0);
        fs::write(&path, r#"{"foo": 1}"#).expect("write");
        let index = FakeIndex::default();
        let mut reporter = CollectingReporter::default();

        let outcome = upload_report(
            &index,
            &artifact(),
            &path,
            &UploadOptions::default(),
            &mut reporter,
        );
        assert!(matches!(outcome, UploadOutcome::SkippedInvalid { .. }));
        assert!(index.log().posts.is_empty());
    }

    #[test]
    fn dry_run_posts_nothing_then_real_run_posts_each() {
        let td = tempdir().expect("tempdir");
        let paths = write_reports(td.path(), 3);
        let index = demo_index();
        let mut reporter = CollectingReporter::default();

        let simulated =
            run_upload(&index, &request(paths.clone(), true), &mut reporter).expect("dry run");
        assert_eq!(simulated.skipped_simulated, 3);
        assert_eq!(simulated.total(), 3);
        assert!(index.log().posts.is_empty());
        assert!(reporter.infos.iter().any(|m| m.starts_with("would post")));

        let real = run_upload(&index, &request(paths, false), &mut reporter).expect("upload");
        assert_eq!(real.posted, 3);
        assert_eq!(index.log().posts.len(), 3);
    }

    #[test]
    fn reposting_is_not_deduplicated_across_runs() {
        let td = tempdir().expect("tempdir");
        let paths = write_reports(td.path(), 1);
        let index = demo_index();
        let mut reporter = CollectingReporter::default();

        for _ in 0..2 {
            let summary =
                run_upload(&index, &request(paths.clone(), false), &mut reporter).expect("upload");
            assert_eq!(summary.posted, 1);
        }
        assert_eq!(index.log().posts.len(), 2);
    }

    #[test]
    fn directory_with_mixed_files() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.json"), r#"{"toxversion":"4.0"}"#).expect("write");
        fs::write(td.path().join("b.json"), r#"{"foo":1}"#).expect("write");
        fs::write(td.path().join("notes.txt"), "notes").expect("write");
        let index = demo_index();
        let mut reporter = CollectingReporter::default();

        let summary = run_upload(
            &index,
            &request(vec![td.path().to_path_buf()], false),
            &mut reporter,
        )
        .expect("upload");

        assert_eq!(summary.posted, 1);
        assert_eq!(summary.skipped_invalid, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(index.log().posts.len(), 1);
        assert_eq!(reporter.warns.len(), 1);
        assert!(reporter.warns[0].contains("b.json"));
        assert!(!reporter.all().any(|m| m.contains("notes.txt")));
        assert!(reporter.infos[0].starts_with("Found sdist: http://idx/alice/"));
    }

    #[test]
    fn explicit_invalid_file_is_an_error_diagnostic() {
        let td = tempdir().expect("tempdir");
        let notes = td.path().join("notes.txt");
        fs::write(&notes, "notes").expect("write");
        let index = demo_index();
        let mut reporter = CollectingReporter::default();

        let summary = run_upload(&index, &request(vec![notes], false), &mut reporter).expect("run");
        assert_eq!(summary.skipped_invalid, 1);
        assert!(reporter.errors[0].contains("does not contain a valid report"));
        assert!(index.log().posts.is_empty());
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let td = tempdir().expect("tempdir");
        let paths = write_reports(td.path(), 2);
        let index = FakeIndex {
            post_status: 500,
            ..demo_index()
        };
        let mut reporter = CollectingReporter::default();

        let mut all = paths.clone();
        all.insert(1, td.path().join("missing.json"));
        let summary = run_upload(&index, &request(all, false), &mut reporter).expect("run");
        assert_eq!(summary.failed, 2);
        assert_eq!(index.log().posts.len(), 2);
        assert_eq!(reporter.warns.len(), 1);
    }

    #[test]
    fn resolution_failure_stops_before_upload() {
        let td = tempdir().expect("tempdir");
        let paths = write_reports(td.path(), 1);
        let index = FakeIndex::with_links(vec![
            release_link("http://idx/+f/aa/demo-1.0.tar.gz"),
            release_link("http://idx/+f/bb/demo-1.0.zip"),
        ]);
        let mut reporter = CollectingReporter::default();

        let err = run_upload(&index, &request(paths, false), &mut reporter).unwrap_err();
        assert!(matches!(err, Error::Resolve(_)));
        assert!(index.log().posts.is_empty());
    }

    #[test]
    fn unlistable_directory_is_warned_but_not_counted() {
        let candidate = ReportCandidate {
            path: PathBuf::from("/results/locked"),
            origin: Origin::Directory,
            verdict: Verdict::Unreadable("permission denied".to_string()),
        };
        let mut reporter = CollectingReporter::default();

        let outcome = report_rejected(&candidate, &UploadOptions::default(), &mut reporter);
        assert_eq!(outcome, None);
        assert_eq!(reporter.warns.len(), 1);
        assert!(reporter.warns[0].contains("locked"));
        assert!(reporter.errors.is_empty());
    }

    #[test]
    fn same_directory_twice_counts_each_file_once() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.json"), VALID).expect("write");
        fs::write(td.path().join("b.json"), r#"{"foo": 1}"#).expect("write");
        let index = demo_index();
        let mut reporter = CollectingReporter::default();

        let dir = td.path().to_path_buf();
        let summary =
            run_upload(&index, &request(vec![dir.clone(), dir], false), &mut reporter).expect("run");
        assert_eq!(summary.to_string(), "posted: 1, simulated: 0, invalid: 1, failed: 0");
        assert_eq!(index.log().posts.len(), 1);
        assert_eq!(reporter.warns.len(), 1);
    }

    #[test]
    fn outcomes_do_not_depend_on_verbosity() {
        let td = tempdir().expect("tempdir");
        write_reports(td.path(), 2);
        fs::write(td.path().join("bad.json"), "[1, 2]").expect("write");
        fs::write(td.path().join("notes.txt"), "notes").expect("write");

        let mut summaries = Vec::new();
        for verbosity in 0..=2 {
            let index = demo_index();
            let mut req = request(vec![td.path().to_path_buf()], false);
            req.options.verbosity = verbosity;
            let mut reporter = CollectingReporter::default();
            let summary = run_upload(&index, &req, &mut reporter).expect("run");
            summaries.push((summary, index.log().posts.len()));
        }

        assert_eq!(summaries[0].0.posted, 2);
        assert_eq!(summaries[0].0.skipped_invalid, 1);
        assert_eq!(summaries[0].1, 2);
        assert!(summaries.iter().all(|s| *s == summaries[0]));
    }
}
