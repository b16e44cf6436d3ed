//! Executable alias (`.bin`) extraction.

use super::locate::{BIN_DIR, NODE_MODULES};
use super::manifest::{BinField, Manifest};
use nmeject_util::path::{normalize, relative_to};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A command alias exposed by a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Command name, i.e. the file name under `.bin/`.
    pub name: String,
    /// Script path relative to the alias directory; used verbatim as the
    /// symlink target.
    pub target: PathBuf,
}

/// Strip an npm scope: `@scope/name` becomes `name`.
#[must_use]
pub fn descope(name: &str) -> &str {
    match name.split_once('/') {
        Some((scope, rest)) if scope.starts_with('@') => rest,
        _ => name,
    }
}

/// The alias directory serving a package: `.bin` inside the nearest
/// `node_modules` ancestor of `package_dir`.
///
/// Falls back to a `.bin` sibling of the package when it is not installed
/// under any `node_modules`.
#[must_use]
pub fn alias_dir_for(package_dir: &Path) -> PathBuf {
    package_dir
        .ancestors()
        .skip(1)
        .find(|dir| dir.file_name().is_some_and(|n| n == NODE_MODULES))
        .map_or_else(
            || {
                package_dir
                    .parent()
                    .unwrap_or(package_dir)
                    .join(BIN_DIR)
            },
            |nm| nm.join(BIN_DIR),
        )
}

/// Alias entries for a package installed at `package_dir`, relative to the
/// alias directory of its own installation root.
#[must_use]
pub fn extract(manifest: &Manifest, package_dir: &Path) -> Vec<AliasEntry> {
    extract_for_alias_dir(manifest, package_dir, &alias_dir_for(package_dir))
}

/// Alias entries for a package at `package_dir`, with targets relative to
/// `alias_dir`.
///
/// Entries are sorted by alias name. Entries with an unusable alias name or
/// a script path that leaves the package are dropped.
#[must_use]
pub fn extract_for_alias_dir(
    manifest: &Manifest,
    package_dir: &Path,
    alias_dir: &Path,
) -> Vec<AliasEntry> {
    let raw: Vec<(&str, &str)> = match &manifest.bin {
        None => return Vec::new(),
        Some(BinField::Path(script)) => vec![(descope(&manifest.name), script.as_str())],
        Some(BinField::Map(map)) => map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
    };

    let mut entries: Vec<AliasEntry> = raw
        .into_iter()
        .filter(|(name, _)| is_valid_alias_name(name))
        .filter_map(|(name, script)| {
            let script = Path::new(script);
            if script.has_root() {
                return None;
            }
            let absolute = normalize(&package_dir.join(script));
            if !absolute.starts_with(normalize(package_dir)) || absolute == normalize(package_dir) {
                return None;
            }
            let target = relative_to(alias_dir, &absolute)?;
            Some(AliasEntry {
                name: name.to_string(),
                target,
            })
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// An alias name must be a single, ordinary path component.
fn is_valid_alias_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
