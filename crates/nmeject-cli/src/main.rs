#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use commands::SourceArgs;
use miette::Result;
use nmeject_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nmeject")]
#[command(author, version, about = "Flatten an installed node_modules tree into a standalone directory", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Copy the root package's dependency closure into a flat output tree
    Eject {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(long, env = "NMEJECT_OUT", value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Show where each dependency would land, without copying anything
    Graph {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory the destinations are computed against
        #[arg(long, env = "NMEJECT_OUT", value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    tracing::debug!(cwd = %config.cwd.display(), "nmeject starting");

    match &cli.command {
        Commands::Version => commands::version::run(config.json_logs),
        Commands::Eject { source, out } => {
            commands::eject::run(&config.cwd, source, out.as_deref(), config.json_logs)
        }
        Commands::Graph { source, out } => {
            commands::graph::run(&config.cwd, source, out.as_deref(), config.json_logs)
        }
    }
}
