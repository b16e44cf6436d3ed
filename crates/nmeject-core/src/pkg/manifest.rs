//! Read-only access to `package.json` descriptors.

use super::error::EjectError;
use nmeject_util::fs::read_to_string_lossy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of a package descriptor.
pub const PACKAGE_JSON: &str = "package.json";

/// The `bin` field of a package.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinField {
    /// `"bin": "cli.js"`, aliased under the package name.
    Path(String),
    /// `"bin": { "tsc": "bin/tsc" }`.
    Map(BTreeMap<String, String>),
}

/// A parsed package descriptor.
///
/// Only the fields the eject engine needs are kept. Dependency maps are
/// `BTreeMap`s so iteration is always sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, deserialize_with = "string_ranges")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "string_ranges")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinField>,
}

impl Manifest {
    /// Load `<dir>/package.json`.
    ///
    /// # Errors
    /// `ManifestNotFound` if the file is absent, `ManifestInvalid` if it
    /// cannot be read or does not describe a package.
    pub fn load(dir: &Path) -> Result<Self, EjectError> {
        Self::load_file(&dir.join(PACKAGE_JSON))
    }

    /// Load a package descriptor from an explicit file path.
    ///
    /// # Errors
    /// Same as [`Manifest::load`].
    pub fn load_file(path: &Path) -> Result<Self, EjectError> {
        if !path.is_file() {
            return Err(EjectError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = read_to_string_lossy(path)
            .map_err(|e| EjectError::manifest_invalid(path, format!("Failed to read: {e}")))?;

        Self::parse(&content).map_err(|msg| EjectError::manifest_invalid(path, msg))
    }

    /// Parse package.json text.
    fn parse(content: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| format!("Invalid JSON: {e}"))?;

        if !value.is_object() {
            return Err("package.json must be a JSON object".to_string());
        }

        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// Dependency edges to follow from this package, sorted by name.
    ///
    /// With `include_dev`, devDependencies are merged in; a name declared in
    /// both sections keeps its `dependencies` range.
    #[must_use]
    pub fn edges(&self, include_dev: bool) -> Vec<(String, String)> {
        let mut merged: BTreeMap<&str, &str> = BTreeMap::new();

        if include_dev {
            for (name, range) in &self.dev_dependencies {
                merged.insert(name, range);
            }
        }
        for (name, range) in &self.dependencies {
            merged.insert(name, range);
        }

        merged
            .into_iter()
            .map(|(name, range)| (name.to_string(), range.to_string()))
            .collect()
    }
}

/// Path to the manifest file inside a package directory.
#[must_use]
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(PACKAGE_JSON)
}

/// Deserialize a dependency section, dropping entries whose range is not a string.
fn string_ranges<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, range)| match range {
            Value::String(s) => Some((name, s)),
            _ => None,
        })
        .collect())
}
