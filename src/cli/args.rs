use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "prepase",
    version,
    about = "Notes with language tools, sharing codes and handwriting rendering"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the document store and session
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the analysis backend
    #[clap(long)]
    pub backend_url: Option<String>,

    /// Keep notes, objects and the login session for this run only. Every
    /// invocation starts empty, so this suits commands that need no stored
    /// state, such as `lookup` or `config`.
    #[clap(long)]
    pub ephemeral: bool,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the prepase application
    #[clap(subcommand)]
    pub command: Commands,
}
