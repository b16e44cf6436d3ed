//! `nmeject eject` command implementation.

use super::{display_path, fail, SourceArgs};
use miette::{IntoDiagnostic, Result};
use nmeject_core::pkg::{eject, EjectReport};
use nmeject_core::Error;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One ejected package in the JSON output.
#[derive(Serialize)]
struct EjectedPackage {
    name: String,
    version: String,
    destination: PathBuf,
    nested: bool,
}

/// JSON result for `eject`.
#[derive(Serialize)]
struct EjectJsonResult {
    ok: bool,
    out: PathBuf,
    report: EjectReport,
    packages: Vec<EjectedPackage>,
}

/// Run the eject command.
pub fn run(cwd: &Path, source: &SourceArgs, out: Option<&Path>, json: bool) -> Result<()> {
    let options = match source.options(cwd, out, None) {
        Ok(options) => options,
        Err(e) => fail(&e, json),
    };

    debug!(
        manifest = %options.manifest.display(),
        source_root = %options.source_root().display(),
        out = %options.out.display(),
        dev = options.include_dev,
        "ejecting"
    );

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let outcome = match runtime.block_on(eject(&options)) {
        Ok(outcome) => outcome,
        Err(e) => fail(&Error::from(e), json),
    };

    if json {
        let result = EjectJsonResult {
            ok: true,
            out: options.out.clone(),
            report: outcome.report,
            packages: outcome
                .nodes
                .iter()
                .map(|n| EjectedPackage {
                    name: n.name.clone(),
                    version: n.version.clone(),
                    destination: n.destination_path.clone(),
                    nested: n.nested,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
        return Ok(());
    }

    let report = outcome.report;
    println!(
        "Ejected {} packages into {}",
        outcome.nodes.len(),
        options.out.display()
    );
    println!(
        "  {} copied, {} already present, {} files, {} .bin links",
        report.copied, report.skipped, report.files, report.links
    );
    for node in outcome.nodes.iter().filter(|n| n.nested) {
        println!(
            "  nested: {}@{} at {}",
            node.name,
            node.version,
            display_path(&node.destination_path, &options.out)
        );
    }

    Ok(())
}
