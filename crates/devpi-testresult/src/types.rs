use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

/// Everything one invocation needs: what to resolve and what to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Package requirement, e.g. `pytest` or `pytest==8.0.0`.
    pub pkgspec: String,
    /// `--index` override: `NAME`, `USER/NAME` or a URL.
    pub index: Option<String>,
    /// Report files and directories, in command-line order.
    pub paths: Vec<PathBuf>,
    /// Descend into subdirectories of directory arguments.
    pub recursive: bool,
    pub options: UploadOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Validate and parse everything but do not post.
    pub simulate: bool,
    /// Number of `-v` flags.
    pub verbosity: u8,
}

impl UploadOptions {
    /// Verbosity after `--dry-run` bumped it by one.
    pub fn effective_verbosity(&self) -> u8 {
        if self.simulate {
            self.verbosity.saturating_add(1)
        } else {
            self.verbosity
        }
    }

    pub fn verbose(&self) -> bool {
        self.effective_verbosity() >= 1
    }

    pub fn debug(&self) -> bool {
        self.effective_verbosity() >= 2
    }
}

/// The single source distribution results are attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Project name as reported by the index.
    pub project: String,
    pub version: String,
    /// Link as listed by the index, fragment included.
    pub href: String,
    /// `href` with the fragment stripped; the upload target.
    pub url: Url,
    pub basename: String,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.basename)
    }
}

/// What happened to one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Posted,
    SkippedInvalid { reason: String },
    SkippedSimulated,
    Failed { reason: String },
}

/// Per-outcome totals for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub posted: usize,
    pub skipped_invalid: usize,
    pub skipped_simulated: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn record(&mut self, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Posted => self.posted += 1,
            UploadOutcome::SkippedInvalid { .. } => self.skipped_invalid += 1,
            UploadOutcome::SkippedSimulated => self.skipped_simulated += 1,
            UploadOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.posted + self.skipped_invalid + self.skipped_simulated + self.failed
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "posted: {}, simulated: {}, invalid: {}, failed: {}",
            self.posted, self.skipped_simulated, self.skipped_invalid, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_raises_verbosity() {
        let quiet = UploadOptions::default();
        assert!(!quiet.verbose());

        let dry = UploadOptions {
            simulate: true,
            verbosity: 0,
        };
        assert_eq!(dry.effective_verbosity(), 1);
        assert!(dry.verbose());
        assert!(!dry.debug());

        let loud = UploadOptions {
            simulate: true,
            verbosity: u8::MAX,
        };
        assert_eq!(loud.effective_verbosity(), u8::MAX);
    }

    #[test]
    fn summary_tallies_outcomes() {
        let mut summary = UploadSummary::default();
        for outcome in [
            UploadOutcome::Posted,
            UploadOutcome::Posted,
            UploadOutcome::SkippedSimulated,
            UploadOutcome::SkippedInvalid {
                reason: "missing marker".to_string(),
            },
            UploadOutcome::Failed {
                reason: "HTTP 500".to_string(),
            },
        ] {
            summary.record(&outcome);
        }
        assert_eq!(summary.total(), 5);
        assert_eq!(
            summary.to_string(),
            "posted: 2, simulated: 1, invalid: 1, failed: 1"
        );
    }

    #[test]
    fn outcome_serialization() {
        let json = serde_json::to_string(&UploadOutcome::Failed {
            reason: "HTTP 500".to_string(),
        })
        .expect("serialize");
        insta::assert_snapshot!(json, @r#"{"outcome":"failed","reason":"HTTP 500"}"#);
    }
}
