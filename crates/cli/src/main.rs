//! moor CLI - project-state anchors and replayable command journeys

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod ipc;
mod locks;
mod track;
mod util;

/// moor - drop anchors on your project state and replay command journeys
#[derive(Parser)]
#[command(name = "moor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize moor in the current directory
    Init,
    /// Snapshot the project tree as a named anchor
    Save {
        /// Anchor name
        name: String,
    },
    /// Restore the project tree to an anchor's state
    Restore {
        /// Anchor name
        name: String,
        /// Fail with Busy instead of waiting for an in-flight tracking batch
        #[arg(long)]
        no_wait: bool,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// List all anchors
    List,
    /// Show one anchor's details
    Show {
        /// Anchor name
        name: String,
    },
    /// Diff an anchor against the current tree
    Diff {
        /// Anchor name
        name: String,
    },
    /// Delete an anchor
    Remove {
        /// Anchor name
        name: String,
    },
    /// Track an anchor: keep it current while files change (runs until stopped)
    Auto {
        /// Anchor name
        name: String,
    },
    /// Stop tracking an anchor
    Stop {
        /// Anchor name
        name: String,
    },
    /// Show store and tracking status
    Status,
    /// Record a command journey interactively (Ctrl+D or 'stop' to finish)
    Record {
        /// Journey name
        name: String,
    },
    /// Replay a recorded journey
    Play {
        /// Journey name
        name: String,
        /// Abort on the first divergence from the recording
        #[arg(long)]
        strict: bool,
        /// Print steps without executing them
        #[arg(long)]
        dry_run: bool,
    },
    /// List recorded journeys
    Journeys,
    /// Delete a journey
    RemoveJourney {
        /// Journey name
        name: String,
    },
    /// Export an anchor to a portable file
    ExportAnchor {
        /// Anchor name
        name: String,
        /// Output file
        output: PathBuf,
    },
    /// Import an anchor from a portable file
    ImportAnchor {
        /// Export file
        file: PathBuf,
    },
    /// Export a journey to a portable file
    ExportJourney {
        /// Journey name
        name: String,
        /// Output file
        output: PathBuf,
    },
    /// Import a journey from a portable file
    ImportJourney {
        /// Export file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cmd::init::run(),
        Commands::Save { name } => cmd::save::run(&name).await,
        Commands::Restore { name, no_wait, yes } => cmd::restore::run(&name, no_wait, yes).await,
        Commands::List => cmd::list::run(),
        Commands::Show { name } => cmd::show::run(&name),
        Commands::Diff { name } => cmd::diff::run(&name).await,
        Commands::Remove { name } => cmd::remove::run(&name).await,
        Commands::Auto { name } => track::run(&name).await,
        Commands::Stop { name } => cmd::stop::run(&name).await,
        Commands::Status => cmd::status::run(),
        Commands::Record { name } => cmd::record::run(&name),
        Commands::Play {
            name,
            strict,
            dry_run,
        } => cmd::play::run(&name, strict, dry_run),
        Commands::Journeys => cmd::journeys::run(),
        Commands::RemoveJourney { name } => cmd::journeys::remove(&name),
        Commands::ExportAnchor { name, output } => cmd::transfer::export_anchor(&name, &output),
        Commands::ImportAnchor { file } => cmd::transfer::import_anchor(&file),
        Commands::ExportJourney { name, output } => cmd::transfer::export_journey(&name, &output),
        Commands::ImportJourney { file } => cmd::transfer::import_journey(&file),
    }
}
