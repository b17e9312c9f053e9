//! AEBridge CLI: reconcile a project graph against an upstream config.
//!
//! Usage:
//!   aebridge sync <CONFIG>       Reconcile the project and optionally render
//!   aebridge render <JOB>        Render a composition of an existing project
//!   aebridge validate <CONFIG>   Check a config without touching any project
//!   aebridge info <PROJECT>      Show a saved project graph

use std::path::PathBuf;

use aebridge_common::config::AppConfig;
use aebridge_common::logging::{cli_logging, init_logging};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "aebridge",
    about = "Bridge upstream renders into a compositing project",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a project against a desired-state config
    Sync {
        /// Path to the config JSON
        config: PathBuf,

        /// Host behavior switches (JSON)
        #[arg(long)]
        host_options: Option<PathBuf>,

        /// Write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Render a composition of an existing project
    Render {
        /// Path to the render job JSON
        job: PathBuf,

        /// Host behavior switches (JSON)
        #[arg(long)]
        host_options: Option<PathBuf>,
    },

    /// Validate a config and list missing footage
    Validate {
        /// Path to the config JSON
        config: PathBuf,
    },

    /// Show a saved project graph
    Info {
        /// Path to the project file
        project: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = AppConfig::load();

    let mut logging = cli_logging(cli.verbose, cli.json_logs || app.logging.json);
    if !cli.verbose {
        logging.level = app.logging.level.clone();
    }
    init_logging(&logging);

    match cli.command {
        Commands::Sync {
            config,
            host_options,
            report,
        } => commands::sync::run(config, host_options, report, &app).await,
        Commands::Render { job, host_options } => {
            commands::render::run(job, host_options, &app).await
        }
        Commands::Validate { config } => commands::validate::run(config),
        Commands::Info { project } => commands::info::run(project),
    }
}
