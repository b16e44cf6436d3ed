//! npm-style version range matching on top of `semver`.
//!
//! Only answers "does this installed version satisfy this declared range";
//! there is no registry here, so nothing ever picks a "highest" version.

use semver::{Version, VersionReq};

/// A declared dependency range, classified for matching.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeSpec {
    /// Any installed version is acceptable (`*`, empty, `latest`).
    Any,
    /// One or more `||` alternatives; at least one must match.
    Alternatives(Vec<VersionReq>),
    /// Not a semver range: a dist-tag, `file:`/`link:`/`workspace:` spec,
    /// a git URL, or something unparsable. Matches any installed version.
    Unsupported(String),
}

impl RangeSpec {
    /// Classify a declared range.
    #[must_use]
    pub fn parse(range: &str) -> Self {
        let range = range.trim();

        if range.is_empty() || range == "latest" {
            return Self::Any;
        }

        if !looks_like_semver_range(range) {
            return Self::Unsupported(range.to_string());
        }

        let mut reqs = Vec::new();
        for alt in range.split("||").map(str::trim) {
            if is_wildcard(alt) || alt.is_empty() {
                return Self::Any;
            }
            match parse_alternative(alt) {
                Some(req) => reqs.push(req),
                None => return Self::Unsupported(range.to_string()),
            }
        }

        Self::Alternatives(reqs)
    }

    /// Whether the range places no constraint on the installed version.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        !matches!(self, Self::Alternatives(_))
    }

    /// Check an installed version string against this range.
    ///
    /// An installed version that is not valid semver never satisfies a
    /// semver range.
    #[must_use]
    pub fn matches(&self, installed: &str) -> bool {
        match self {
            Self::Any | Self::Unsupported(_) => true,
            Self::Alternatives(reqs) => {
                let Ok(version) = Version::parse(strip_v(installed.trim())) else {
                    return false;
                };
                reqs.iter().any(|req| req.matches(&version))
            }
        }
    }
}

/// Check whether `installed` satisfies the declared `range`.
#[must_use]
pub fn version_satisfies(installed: &str, range: &str) -> bool {
    RangeSpec::parse(range).matches(installed)
}

/// Cheap pre-check so tags and protocol specs are not fed to the parser.
fn looks_like_semver_range(range: &str) -> bool {
    if range.contains(':') || range.contains('/') || range.contains('#') {
        return false;
    }
    range.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(c, '.' | '-' | '+' | '*' | '^' | '~' | '<' | '>' | '=' | '|' | ' ')
    }) && range.chars().any(|c| c.is_ascii_digit() || c == '*')
}

fn is_wildcard(token: &str) -> bool {
    matches!(token, "*" | "x" | "X")
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// Parse one `||` alternative into a `VersionReq`.
///
/// Handles hyphen ranges (`1.0.0 - 2.0.0`), x-ranges (`1.x`, `1.2.*`),
/// partial versions (`1`, `1.2`), exact versions (`1.2.3` means `=1.2.3`
/// in npm, not `^1.2.3`) and space-separated comparator sets
/// (`>= 2.1.2 < 3.0.0`).
fn parse_alternative(alt: &str) -> Option<VersionReq> {
    if let Some((low, high)) = alt.split_once(" - ") {
        let low = normalize_comparator(">=", low.trim())?;
        let high = normalize_comparator("<=", high.trim())?;
        return VersionReq::parse(&format!("{low}, {high}")).ok();
    }

    let comparators: Vec<String> = split_comparators(alt)
        .into_iter()
        .map(|(op, version)| normalize_comparator(op, version))
        .collect::<Option<_>>()?;

    if comparators.is_empty() {
        return None;
    }

    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Split `">= 2.1.2 <3.0.0"` into `[(">=", "2.1.2"), ("<", "3.0.0")]`.
///
/// An operator separated from its version by whitespace is re-attached.
fn split_comparators(alt: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in alt.split_whitespace() {
        let split = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
            .unwrap_or(token.len());
        let (op, version) = token.split_at(split);

        if version.is_empty() {
            pending_op = Some(op);
            continue;
        }

        let op = if op.is_empty() {
            pending_op.take().unwrap_or("")
        } else {
            pending_op = None;
            op
        };
        out.push((op, version));
    }

    out
}

/// Render one comparator in the syntax `semver` accepts.
fn normalize_comparator(op: &str, version: &str) -> Option<String> {
    let version = strip_v(version);
    if version.is_empty() {
        return None;
    }

    // Drop everything from the first wildcard part: "1.x.x" -> ["1"].
    let (core, suffix) = match version.find(['-', '+']) {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };
    let parts: Vec<&str> = core
        .split('.')
        .take_while(|p| !is_wildcard(p))
        .collect();

    if parts.is_empty() {
        return Some("*".to_string());
    }
    if parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let partial = parts.len() < 3;
    let joined = parts.join(".");

    Some(match (op, partial) {
        // Bare partial version is an x-range: "1.2" -> "1.2.*".
        ("", true) => format!("{joined}.*"),
        // Bare full version is exact in npm.
        ("", false) => format!("={joined}{suffix}"),
        (op, true) => format!("{op}{joined}"),
        (op, false) => format!("{op}{joined}{suffix}"),
    })
}
