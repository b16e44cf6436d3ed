//! Eject engine error types.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stable error codes, one per [`EjectError`] variant.
pub mod codes {
    pub const EJECT_MANIFEST_NOT_FOUND: &str = "EJECT_MANIFEST_NOT_FOUND";
    pub const EJECT_MANIFEST_INVALID: &str = "EJECT_MANIFEST_INVALID";
    pub const EJECT_DEPENDENCY_UNRESOLVED: &str = "EJECT_DEPENDENCY_UNRESOLVED";
    pub const EJECT_COPY_FAILED: &str = "EJECT_COPY_FAILED";
    pub const EJECT_LINK_FAILED: &str = "EJECT_LINK_FAILED";
    pub const EJECT_IO_ERROR: &str = "EJECT_IO_ERROR";
}

/// Errors raised while resolving or materializing a dependency tree.
///
/// Every variant carries enough context (name, range, path) to diagnose the
/// failure without re-running the resolution.
#[derive(Debug, Error)]
pub enum EjectError {
    #[error("package.json not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("Invalid package.json at {}: {message}", path.display())]
    ManifestInvalid { path: PathBuf, message: String },

    #[error(
        "Could not resolve {name}@{} from {}",
        range.as_deref().unwrap_or("*"),
        from.display()
    )]
    DependencyUnresolved {
        name: String,
        range: Option<String>,
        from: PathBuf,
    },

    #[error("Failed to copy {name} to {}: {source}", path.display())]
    CopyFailure {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to link .bin/{alias} for {name}: {source}")]
    LinkFailure {
        name: String,
        alias: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EjectError {
    /// Get the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ManifestNotFound { .. } => codes::EJECT_MANIFEST_NOT_FOUND,
            Self::ManifestInvalid { .. } => codes::EJECT_MANIFEST_INVALID,
            Self::DependencyUnresolved { .. } => codes::EJECT_DEPENDENCY_UNRESOLVED,
            Self::CopyFailure { .. } => codes::EJECT_COPY_FAILED,
            Self::LinkFailure { .. } => codes::EJECT_LINK_FAILED,
            Self::Io { .. } => codes::EJECT_IO_ERROR,
        }
    }

    pub fn manifest_invalid(path: &Path, message: impl Into<String>) -> Self {
        Self::ManifestInvalid {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unresolved(name: &str, range: Option<&str>, from: &Path) -> Self {
        Self::DependencyUnresolved {
            name: name.to_string(),
            range: range.map(String::from),
            from: from.to_path_buf(),
        }
    }

    #[must_use]
    pub fn copy_failure(name: &str, path: &Path, source: io::Error) -> Self {
        Self::CopyFailure {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn link_failure(name: &str, alias: &str, source: io::Error) -> Self {
        Self::LinkFailure {
            name: name.to_string(),
            alias: alias.to_string(),
            source,
        }
    }

    #[must_use]
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
