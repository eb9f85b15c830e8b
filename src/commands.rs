//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct holding the global options and a `Commands` enum
//! with one variant per editor action.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use vim_assist::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Ask { message, .. } = &cli.command {
//!     println!("asking {message}");
//! }
//! ```

use crate::sync::SyncStrategy;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Directory holding the session record (`config.json`).
    #[arg(long, global = true, env = "VIMASSIST_STATE_DIR", value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Settings file to use instead of `config.yaml` in the config directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug, PartialEq)]
#[command(about, long_about = None)]
pub enum Commands {
    /// Write the default settings file and an empty session record.
    Init,

    /// Sync a directory into the knowledge base and start a new conversation.
    #[clap(name = "update-docs", alias = "u")]
    UpdateDocs {
        /// Directory whose top-level files become the knowledge base. `~` is expanded.
        doc_dir: String,

        /// Overrides `sync_strategy` from the settings file.
        #[arg(long, value_enum)]
        strategy: Option<SyncStrategy>,
    },

    /// Ask the assistant about the knowledge base.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question.
        message: String,

        /// Render the answer as markdown when stdout is a terminal.
        #[arg(long)]
        pretty: bool,
    },

    /// List the documents in the knowledge base.
    #[clap(name = "list-docs", alias = "l")]
    ListDocs,

    /// Revise text; the revision is printed to stdout.
    #[clap(name = "revise", alias = "r")]
    #[command(group(ArgGroup::new("input").required(true).args(["request", "stdin"])))]
    Revise {
        /// The text to rewrite. Empty asks for new content.
        #[arg(long, default_value = "")]
        selected: String,

        /// Context preceding the selection.
        #[arg(long, default_value = "")]
        before: String,

        /// Context following the selection.
        #[arg(long, default_value = "")]
        after: String,

        /// What to do with the text.
        #[arg(long)]
        request: Option<String>,

        /// Read the whole request as JSON from stdin.
        #[arg(long)]
        stdin: bool,
    },

    /// Start a new conversation, keeping the knowledge base.
    #[clap(name = "new-thread", alias = "n")]
    NewThread,

    /// Show the session record.
    Status,
}
