//! CLI definitions for pagehand.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pagehand CLI.
#[derive(Parser)]
#[command(name = "pagehand")]
#[command(about = "Natural-language commands for web pages")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.pagehand/config.toml)
    #[arg(short, long, global = true, env = "PAGEHAND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a single command against a page
    Run {
        /// Page target id (default: first open page)
        #[arg(short, long)]
        target: Option<String>,

        /// The command, e.g. "scroll down" or "click the login button"
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Read commands from stdin, one per line
    Repl {
        /// Page target id (default: first open page)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Validate the configuration file and exit
    CheckConfig,
}
