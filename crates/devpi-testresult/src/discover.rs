//! Expansion of file and directory arguments into report candidates.
//!
//! Discovery is lazy: directories are listed only when the iterator reaches
//! them, and at most one listing is held at a time. Entries of a directory
//! are visited in file-name order, files before subdirectories, and
//! subdirectories depth-first through an explicit stack. Symlink cycles are
//! not detected.
//!
//! A `.json` file reachable through more than one argument is inspected
//! once and yielded as [`Verdict::Duplicate`] afterwards, whatever its first
//! verdict was.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::Reporter;
use crate::report::{Verdict, has_report_extension, inspect_report};

/// How a candidate was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Named directly on the command line.
    Argument,
    /// Found while listing a directory argument.
    Scan,
    /// A directory that could not be listed. Never a report.
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportCandidate {
    pub path: PathBuf,
    pub origin: Origin,
    pub verdict: Verdict,
}

impl ReportCandidate {
    pub fn is_valid(&self) -> bool {
        self.verdict.is_valid()
    }
}

/// Drop arguments that do not exist, warning about each one.
pub fn existing_paths(paths: &[PathBuf], reporter: &mut dyn Reporter) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| {
            let exists = path.exists();
            if !exists {
                reporter.warn(&format!("path does not exist, skipping: {}", path.display()));
            }
            exists
        })
        .cloned()
        .collect()
}

/// Lazily expand `paths` into candidates. With `recursive` unset only the
/// immediate children of directory arguments are looked at.
pub fn discover(paths: Vec<PathBuf>, recursive: bool) -> Discovery {
    Discovery {
        inputs: paths.into_iter(),
        recursive,
        files: VecDeque::new(),
        dirs: Vec::new(),
        seen: HashSet::new(),
    }
}

/// Only the valid reports of [`discover`].
pub fn discover_reports(paths: Vec<PathBuf>, recursive: bool) -> impl Iterator<Item = PathBuf> {
    discover(paths, recursive)
        .filter(ReportCandidate::is_valid)
        .map(|c| c.path)
}

pub struct Discovery {
    inputs: std::vec::IntoIter<PathBuf>,
    recursive: bool,
    files: VecDeque<PathBuf>,
    dirs: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl Discovery {
    fn candidate(&mut self, path: PathBuf, origin: Origin) -> ReportCandidate {
        let repeated = has_report_extension(&path) && {
            let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            !self.seen.insert(key)
        };
        let verdict = if repeated {
            Verdict::Duplicate
        } else {
            inspect_report(&path)
        };
        ReportCandidate {
            path,
            origin,
            verdict,
        }
    }

    fn expand(&mut self, dir: &Path) -> io::Result<()> {
        let mut entries = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            if path.is_dir() {
                if self.recursive {
                    subdirs.push(path);
                }
            } else {
                self.files.push_back(path);
            }
        }
        self.dirs.extend(subdirs.into_iter().rev());
        Ok(())
    }
}

impl Iterator for Discovery {
    type Item = ReportCandidate;

    fn next(&mut self) -> Option<ReportCandidate> {
        loop {
            if let Some(path) = self.files.pop_front() {
                return Some(self.candidate(path, Origin::Scan));
            }

            if let Some(dir) = self.dirs.pop() {
                if let Err(e) = self.expand(&dir) {
                    return Some(ReportCandidate {
                        path: dir,
                        origin: Origin::Directory,
                        verdict: Verdict::Unreadable(e.to_string()),
                    });
                }
                continue;
            }

            let input = self.inputs.next()?;
            if input.is_dir() {
                self.dirs.push(input);
                continue;
            }
            return Some(self.candidate(input, Origin::Argument));
        }
    }
}
