use crate::error::Error;
use crate::paths::absolutize;
use crate::pkg::{GraphOptions, NODE_MODULES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration for the nmeject CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// What to eject and where.
///
/// Serializes as `{ "in": ..., "out": ..., "manifest": ..., "devDependencies": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EjectOptions {
    /// Root package.json.
    pub manifest: PathBuf,

    /// Installation root the dependencies were installed into. Defaults to
    /// `node_modules` next to the manifest.
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,

    /// Output directory.
    pub out: PathBuf,

    /// Include the root package's devDependencies.
    #[serde(rename = "devDependencies", default)]
    pub include_dev: bool,
}

/// A partially specified [`EjectOptions`], as read from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EjectOptionsFile {
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    #[serde(rename = "in", default)]
    pub source_root: Option<PathBuf>,
    #[serde(default)]
    pub out: Option<PathBuf>,
    #[serde(rename = "devDependencies", default)]
    pub include_dev: Option<bool>,
}

impl EjectOptionsFile {
    /// Read options from a JSON file. Relative paths inside the file are
    /// resolved against the file's directory.
    ///
    /// # Errors
    /// `ConfigRead` if the file cannot be read, `ConfigParse` if it is not a
    /// valid options object.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Self = serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        Ok(Self {
            manifest: parsed.manifest.map(|p| absolutize(base, &p)),
            source_root: parsed.source_root.map(|p| absolutize(base, &p)),
            out: parsed.out.map(|p| absolutize(base, &p)),
            include_dev: parsed.include_dev,
        })
    }
}

impl EjectOptions {
    /// Create options for ejecting the package described by `manifest` into `out`.
    #[must_use]
    pub fn new(manifest: PathBuf, out: PathBuf) -> Self {
        Self {
            manifest,
            source_root: None,
            out,
            include_dev: false,
        }
    }

    /// Set the installation root.
    #[must_use]
    pub fn with_source_root(mut self, source_root: Option<PathBuf>) -> Self {
        self.source_root = source_root;
        self
    }

    /// Include root devDependencies.
    #[must_use]
    pub fn with_dev(mut self, include_dev: bool) -> Self {
        self.include_dev = include_dev;
        self
    }

    /// Resolve relative paths against `cwd`.
    #[must_use]
    pub fn resolve_paths(self, cwd: &Path) -> Self {
        Self {
            manifest: absolutize(cwd, &self.manifest),
            source_root: self.source_root.map(|p| absolutize(cwd, &p)),
            out: absolutize(cwd, &self.out),
            include_dev: self.include_dev,
        }
    }

    /// Directory of the root package.
    #[must_use]
    pub fn root_dir(&self) -> PathBuf {
        match self.manifest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Effective installation root.
    #[must_use]
    pub fn source_root(&self) -> PathBuf {
        self.source_root
            .clone()
            .unwrap_or_else(|| self.root_dir().join(NODE_MODULES))
    }

    /// Graph construction options derived from these options.
    #[must_use]
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            source_root: self.source_root(),
            out_root: self.out.clone(),
            include_dev: self.include_dev,
        }
    }
}
