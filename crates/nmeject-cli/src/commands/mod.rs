pub mod eject;
pub mod graph;
pub mod version;

use nmeject_core::config::EjectOptionsFile;
use nmeject_core::paths::{absolutize, find_manifest};
use nmeject_core::pkg::PACKAGE_JSON;
use nmeject_core::{EjectOptions, Error};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output directory used by `graph` when none is given.
pub const DEFAULT_OUT_DIR: &str = "ejected";

/// Flags shared by commands that read an installed project.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Root package.json (defaults to the nearest one above the working directory)
    #[arg(long, env = "NMEJECT_MANIFEST", value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Installation root (defaults to node_modules next to the manifest)
    #[arg(long = "in", env = "NMEJECT_IN", value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Include the root package's devDependencies
    #[arg(long, env = "NMEJECT_DEV")]
    pub dev: bool,

    /// JSON file with `manifest`, `in`, `out` and `devDependencies`
    #[arg(long, env = "NMEJECT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    /// Merge flags over the config file and resolve every path against `cwd`.
    ///
    /// `default_out` is used when neither the flags nor the file name an
    /// output directory; `None` makes the output directory mandatory.
    pub fn options(
        &self,
        cwd: &Path,
        out: Option<&Path>,
        default_out: Option<&str>,
    ) -> Result<EjectOptions, Error> {
        let file = match &self.config {
            Some(path) => EjectOptionsFile::load(&absolutize(cwd, path))?,
            None => EjectOptionsFile::default(),
        };

        let manifest = self
            .manifest
            .as_deref()
            .map(|p| absolutize(cwd, p))
            .or(file.manifest)
            .or_else(|| find_manifest(cwd))
            .unwrap_or_else(|| cwd.join(PACKAGE_JSON));

        let out = out
            .map(|p| absolutize(cwd, p))
            .or(file.out)
            .or_else(|| default_out.map(|d| cwd.join(d)))
            .ok_or_else(|| Error::other("no output directory given (use --out or NMEJECT_OUT)"))?;

        let source_root = self
            .source_root
            .as_deref()
            .map(|p| absolutize(cwd, p))
            .or(file.source_root);

        Ok(EjectOptions::new(manifest, out)
            .with_source_root(source_root)
            .with_dev(self.dev || file.include_dev.unwrap_or(false))
            .resolve_paths(cwd))
    }
}

/// Machine-readable error payload.
#[derive(Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorResult {
    ok: bool,
    error: ErrorInfo,
}

/// Report `err` and exit with status 1.
///
/// With `--json` the error goes to stdout as `{ "ok": false, "error": ... }`;
/// otherwise it is printed to stderr.
pub fn fail(err: &Error, json: bool) -> ! {
    if json {
        let result = ErrorResult {
            ok: false,
            error: ErrorInfo {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        };
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        eprintln!("error [{}]: {err}", err.code());
    }
    std::process::exit(1);
}

/// Display `path` relative to `base` when it lies underneath it.
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map_or_else(|_| path.display().to_string(), |p| p.display().to_string())
}
