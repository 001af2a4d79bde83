//! Package requirements in pip/setuptools syntax and the version ordering
//! used to pick the release a requirement resolves to.
//!
//! Only the subset of PEP 440 that index lookups need is implemented:
//! epochs, release segments, `a`/`b`/`rc` pre-releases, post and dev
//! releases, local labels, `==`/`!=` wildcards and the compatible-release
//! operator.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequirementError {
    #[error("requirement {0:?} has no project name")]
    MissingName(String),

    #[error("invalid version specifier {clause:?} in {input:?}")]
    BadSpecifier { input: String, clause: String },

    #[error("invalid version {0:?}")]
    BadVersion(String),
}

/// Normalize a project name the way package indexes do: lowercase, runs of
/// `-`, `_` and `.` collapsed to a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_sep {
                out.push('-');
            }
            in_sep = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_sep = false;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreKind {
    Alpha,
    Beta,
    Rc,
}

/// A parsed release version.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

type SortKey<'a> = (u64, Vec<u64>, (u8, u8, u64), (u8, u64), (u8, u64), Option<&'a str>);

impl Version {
    pub fn parse(raw: &str) -> Result<Self, RequirementError> {
        let bad = || RequirementError::BadVersion(raw.to_string());
        let lowered = raw.trim().to_ascii_lowercase();
        let s = lowered.strip_prefix('v').unwrap_or(lowered.as_str());

        let (s, local) = match s.split_once('+') {
            Some((head, local)) if !local.is_empty() => (head, Some(local.to_string())),
            Some(_) => return Err(bad()),
            None => (s, None),
        };
        let (epoch, s) = match s.split_once('!') {
            Some((e, rest)) => (e.parse::<u64>().map_err(|_| bad())?, rest),
            None => (0, s),
        };

        let mut cur = Cursor::new(s);
        let mut release = vec![cur.number().ok_or_else(bad)?];
        while cur.peek() == Some('.') && cur.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            cur.bump();
            release.push(cur.number().ok_or_else(bad)?);
        }

        let mut pre = None;
        let save = cur.pos;
        cur.separator();
        if let Some(kind) = cur.keyword(&[
            ("alpha", PreKind::Alpha),
            ("beta", PreKind::Beta),
            ("preview", PreKind::Rc),
            ("pre", PreKind::Rc),
            ("rc", PreKind::Rc),
            ("a", PreKind::Alpha),
            ("b", PreKind::Beta),
            ("c", PreKind::Rc),
        ]) {
            cur.separator();
            pre = Some((kind, cur.number().unwrap_or(0)));
        } else {
            cur.pos = save;
        }

        let mut post = None;
        let save = cur.pos;
        if cur.peek() == Some('-') && cur.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            cur.bump();
            post = cur.number();
        } else {
            cur.separator();
            if cur.keyword(&[("post", ()), ("rev", ()), ("r", ())]).is_some() {
                cur.separator();
                post = Some(cur.number().unwrap_or(0));
            } else {
                cur.pos = save;
            }
        }

        let mut dev = None;
        let save = cur.pos;
        cur.separator();
        if cur.keyword(&[("dev", ())]).is_some() {
            cur.separator();
            dev = Some(cur.number().unwrap_or(0));
        } else {
            cur.pos = save;
        }

        if !cur.at_end() {
            return Err(bad());
        }

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    fn trimmed_release(&self) -> Vec<u64> {
        let mut rel = self.release.clone();
        while rel.len() > 1 && rel.last() == Some(&0) {
            rel.pop();
        }
        rel
    }

    fn sort_key(&self) -> SortKey<'_> {
        let pre = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => (0, 0, 0),
            (Some((kind, n)), _, _) => (1, kind as u8, n),
            _ => (2, 0, 0),
        };
        let post = self.post.map_or((0, 0), |n| (1, n));
        let dev = self.dev.map_or((1, 0), |n| (0, n));
        (
            self.epoch,
            self.trimmed_release(),
            pre,
            post,
            dev,
            self.local.as_deref(),
        )
    }

    fn public_cmp(&self, other: &Self) -> Ordering {
        let (a0, a1, a2, a3, a4, _) = self.sort_key();
        let (b0, b1, b2, b3, b4, _) = other.sort_key();
        (a0, a1, a2, a3, a4).cmp(&(b0, b1, b2, b3, b4))
    }

    fn release_padded(&self, len: usize) -> Vec<u64> {
        let mut rel = self.release.clone();
        rel.resize(rel.len().max(len), 0);
        rel
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl FromStr for Version {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Cursor<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.s[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.s.len()
    }

    fn separator(&mut self) {
        if matches!(self.peek(), Some('.' | '-' | '_')) {
            self.bump();
        }
    }

    fn number(&mut self) -> Option<u64> {
        let digits: String = self.rest().chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        self.pos += digits.len();
        digits.parse().ok()
    }

    fn keyword<T: Copy>(&mut self, words: &[(&str, T)]) -> Option<T> {
        let rest = self.rest();
        let (word, value) = words.iter().find(|(w, _)| rest.starts_with(w))?;
        self.pos += word.len();
        Some(*value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Arbitrary,
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Arbitrary => "===",
            Self::Compatible => "~=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
        }
    }
}

/// One `OP VERSION` clause of a requirement.
#[derive(Debug, Clone)]
pub struct Specifier {
    op: Operator,
    raw: String,
    version: Option<Version>,
    wildcard: bool,
}

impl Specifier {
    fn parse(input: &str, clause: &str) -> Result<Self, RequirementError> {
        let bad = || RequirementError::BadSpecifier {
            input: input.to_string(),
            clause: clause.to_string(),
        };
        let clause = clause.trim();
        let (op, rest) = [
            Operator::Arbitrary,
            Operator::Compatible,
            Operator::Equal,
            Operator::NotEqual,
            Operator::LessEqual,
            Operator::GreaterEqual,
            Operator::Less,
            Operator::Greater,
        ]
        .into_iter()
        .find_map(|op| clause.strip_prefix(op.as_str()).map(|rest| (op, rest.trim())))
        .ok_or_else(bad)?;

        if rest.is_empty() {
            return Err(bad());
        }
        if op == Operator::Arbitrary {
            return Ok(Self {
                op,
                raw: rest.to_string(),
                version: None,
                wildcard: false,
            });
        }

        let (text, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) if matches!(op, Operator::Equal | Operator::NotEqual) => (prefix, true),
            Some(_) => return Err(bad()),
            None => (rest, false),
        };
        let version = Version::parse(text).map_err(|_| bad())?;
        if op == Operator::Compatible && version.release.len() < 2 {
            return Err(bad());
        }

        Ok(Self {
            op,
            raw: rest.to_string(),
            version: Some(version),
            wildcard,
        })
    }

    fn names_prerelease(&self) -> bool {
        self.version.as_ref().is_some_and(Version::is_prerelease)
    }

    fn contains(&self, raw: &str, candidate: Option<&Version>) -> bool {
        if self.op == Operator::Arbitrary {
            return raw.trim().eq_ignore_ascii_case(&self.raw);
        }
        let (Some(v), Some(spec)) = (candidate, self.version.as_ref()) else {
            return false;
        };
        match self.op {
            Operator::Equal if self.wildcard => prefix_match(v, spec),
            Operator::NotEqual if self.wildcard => !prefix_match(v, spec),
            Operator::Equal => equal(v, spec),
            Operator::NotEqual => !equal(v, spec),
            Operator::LessEqual => v.public_cmp(spec) != Ordering::Greater,
            Operator::GreaterEqual => v.public_cmp(spec) != Ordering::Less,
            Operator::Less => {
                v.public_cmp(spec) == Ordering::Less
                    && (spec.is_prerelease()
                        || !v.is_prerelease()
                        || v.trimmed_release() != spec.trimmed_release())
            }
            Operator::Greater => {
                v.public_cmp(spec) == Ordering::Greater
                    && (spec.post.is_some()
                        || v.post.is_none()
                        || v.trimmed_release() != spec.trimmed_release())
            }
            Operator::Compatible => {
                let mut prefix = spec.clone();
                prefix.release.pop();
                prefix.pre = None;
                prefix.post = None;
                prefix.dev = None;
                v.public_cmp(spec) != Ordering::Less && prefix_match(v, &prefix)
            }
            Operator::Arbitrary => unreachable!("handled above"),
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.raw)
    }
}

fn equal(v: &Version, spec: &Version) -> bool {
    if spec.local.is_some() {
        v == spec
    } else {
        v.public_cmp(spec) == Ordering::Equal
    }
}

fn prefix_match(v: &Version, prefix: &Version) -> bool {
    v.epoch == prefix.epoch
        && v.release_padded(prefix.release.len())[..prefix.release.len()] == prefix.release[..]
}

/// A parsed requirement: a project name plus zero or more specifiers.
#[derive(Debug, Clone)]
pub struct Requirement {
    name: String,
    specifiers: Vec<Specifier>,
    raw: String,
}

impl Requirement {
    pub fn parse(input: &str) -> Result<Self, RequirementError> {
        let head = input.split(';').next().unwrap_or_default().trim();
        let name_len = head
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(head.len());
        let name = &head[..name_len];
        if name.is_empty() {
            return Err(RequirementError::MissingName(input.to_string()));
        }

        let mut rest = head[name_len..].trim_start();
        if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']').ok_or_else(|| RequirementError::BadSpecifier {
                input: input.to_string(),
                clause: rest.to_string(),
            })?;
            rest = after[end + 1..].trim_start();
        }
        if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            rest = inner;
        }

        let specifiers = rest
            .split(',')
            .filter(|clause| !clause.trim().is_empty())
            .map(|clause| Specifier::parse(input, clause))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            specifiers,
            raw: input.trim().to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn specifiers(&self) -> &[Specifier] {
        &self.specifiers
    }

    /// Whether `version` satisfies every specifier. Pre-release filtering is
    /// left to [`Requirement::best_match`].
    pub fn contains(&self, version: &str) -> bool {
        let parsed = Version::parse(version).ok();
        self.specifiers
            .iter()
            .all(|spec| spec.contains(version, parsed.as_ref()))
    }

    /// Pick the highest version satisfying the requirement.
    ///
    /// Pre-releases are only eligible when a specifier names one or when no
    /// final release matches.
    pub fn best_match<'a, I>(&self, versions: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let matching: Vec<(&'a str, Option<Version>)> = versions
            .into_iter()
            .map(|raw| (raw, Version::parse(raw).ok()))
            .filter(|(raw, parsed)| {
                self.specifiers
                    .iter()
                    .all(|spec| spec.contains(raw, parsed.as_ref()))
            })
            .collect();

        let allow_pre = self.specifiers.iter().any(Specifier::names_prerelease);
        let highest = |pre_ok: bool| {
            matching
                .iter()
                .filter(|(_, v)| pre_ok || !v.as_ref().is_some_and(Version::is_prerelease))
                .max_by(|(ra, a), (rb, b)| match (a, b) {
                    (Some(a), Some(b)) => a.cmp(b),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => ra.cmp(rb),
                })
                .map(|(raw, _)| *raw)
        };

        highest(allow_pre).or_else(|| highest(true))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
