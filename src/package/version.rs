//! npm-style version ranges on top of `semver`.
//!
//! npm and `semver` disagree on a few spellings:
//!
//! | npm               | semver                |
//! |-------------------|-----------------------|
//! | `1.2.3`           | `=1.2.3` (exact)      |
//! | `>=1.0.0 <2.0.0`  | `>=1.0.0, <2.0.0`     |
//! | `1.2 - 2.3`       | `>=1.2, <=2.3`        |
//! | `1.x`, `^1.x`     | `=1`, `^1`            |
//! | `a || b`          | any of the alternatives |
//!
//! Values that are not ranges at all (URLs, git specs, `file:`, dist-tags
//! such as `latest`) do not parse.

use semver::{Version, VersionReq};

/// Parsed npm range: satisfied when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    pub fn parse(raw: &str) -> Option<Self> {
        let alternatives = raw
            .split("||")
            .map(|alt| normalize(alt.trim()).and_then(|req| VersionReq::parse(&req).ok()))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { alternatives })
    }

    pub fn satisfies(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Rewrite one `||` alternative into `semver` syntax.
fn normalize(alt: &str) -> Option<String> {
    if alt.is_empty() {
        return Some("*".to_string());
    }

    if let Some((low, high)) = alt.split_once(" - ") {
        let low = comparator("", low.trim())?;
        let high = comparator("", high.trim())?;
        return Some(format!(">={}, <={}", strip_op(&low), strip_op(&high)));
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in alt.split_whitespace() {
        if is_operator(token) {
            pending_op = Some(token);
            continue;
        }
        let (op, version) = split_op(token);
        let op = pending_op.take().unwrap_or(op);
        comparators.push(comparator(op, version)?);
    }
    if pending_op.is_some() || comparators.is_empty() {
        return None;
    }

    Some(comparators.join(", "))
}

/// One comparator in `semver` syntax, or `None` if `version` is not a version.
fn comparator(op: &str, version: &str) -> Option<String> {
    let version = version.strip_prefix(['v', 'V']).unwrap_or(version);

    let parts: Vec<&str> = version
        .split('.')
        .take_while(|part| !is_wildcard(part))
        .collect();
    if parts.is_empty() {
        return Some("*".to_string());
    }

    let first = parts[0];
    if !first.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }

    let op = if op.is_empty() { "=" } else { op };
    Some(format!("{op}{}", parts.join(".")))
}

fn split_op(token: &str) -> (&str, &str) {
    let idx = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    token.split_at(idx)
}

fn strip_op(comparator: &str) -> &str {
    comparator.trim_start_matches(['<', '>', '=', '^', '~'])
}

fn is_operator(token: &str) -> bool {
    matches!(token, "<" | "<=" | ">" | ">=" | "=" | "^" | "~")
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "*" | "x" | "X")
}
