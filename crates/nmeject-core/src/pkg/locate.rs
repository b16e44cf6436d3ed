//! Upward `node_modules` lookup with version fallback.
//!
//! Mirrors Node's module resolution: the nearest installation root wins,
//! but a candidate whose version does not satisfy the declared range is
//! skipped and the search continues outward.

use super::error::EjectError;
use super::manifest::Manifest;
use super::version::RangeSpec;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Name of an installation root directory.
pub const NODE_MODULES: &str = "node_modules";

/// Name of the executable alias directory inside an installation root.
pub const BIN_DIR: &str = ".bin";

/// Path of package `name` inside the installation root `node_modules`.
///
/// Scoped names (`@scope/pkg`) map to `node_modules/@scope/pkg`.
#[must_use]
pub fn package_dir(node_modules: &Path, name: &str) -> PathBuf {
    match name.split_once('/') {
        Some((scope, pkg)) if scope.starts_with('@') => node_modules.join(scope).join(pkg),
        _ => node_modules.join(name),
    }
}

/// Installation roots to search from `base_dir`, nearest first.
///
/// Every ancestor of `base_dir` (including itself) contributes
/// `<ancestor>/node_modules`, except ancestors that are themselves
/// installation roots: `node_modules/node_modules` is never a lookup path.
pub fn search_roots(base_dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    base_dir
        .ancestors()
        .filter(|dir| dir.file_name().map_or(true, |n| n != NODE_MODULES))
        .map(|dir| dir.join(NODE_MODULES))
}

/// Resolve dependency `name` as seen from the package at `base_dir`.
///
/// Returns the canonical (symlink-resolved) path of the first installed
/// copy, walking outward, whose version satisfies `range`. With no range,
/// or a range that places no constraint, the nearest copy wins.
///
/// # Errors
/// `DependencyUnresolved` when no installation root up to the filesystem
/// root holds a satisfying copy. A candidate without a readable
/// package.json stops the search with `ManifestNotFound` or
/// `ManifestInvalid`.
pub fn resolve(base_dir: &Path, name: &str, range: Option<&str>) -> Result<PathBuf, EjectError> {
    let spec = range.map(RangeSpec::parse);
    let constrained = spec.as_ref().filter(|s| !s.is_unconstrained());

    for root in search_roots(base_dir) {
        let candidate = package_dir(&root, name);
        if !candidate.is_dir() {
            trace!(candidate = %candidate.display(), "not installed here");
            continue;
        }

        let manifest = Manifest::load(&candidate)?;
        if let Some(spec) = constrained {
            if !spec.matches(&manifest.version) {
                debug!(
                    name,
                    range = range.unwrap_or("*"),
                    found = %manifest.version,
                    candidate = %candidate.display(),
                    "version mismatch, continuing search outward"
                );
                continue;
            }
        }

        let real = dunce::canonicalize(&candidate).map_err(|e| EjectError::io(&candidate, e))?;
        debug!(name, path = %real.display(), "resolved");
        return Ok(real);
    }

    Err(EjectError::unresolved(name, range, base_dir))
}
