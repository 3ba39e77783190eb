//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `sync`: run one job end to end (scan, extract, TS ingest/emit,
//!   localized emit — spec §1, §4.1).

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }
}

/// Arguments shared by all commands, overriding whatever `.locsyncrc.json`
/// supplies (spec §9 ambient addition, mirroring the teacher's
/// `CommonArgs`).
#[derive(Debug, Clone, Parser)]
pub struct CommonArgs {
    /// Source file tree root (overrides config file).
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Root directory under which `<relative-path>.<lang>.ts` files live
    /// (overrides config file).
    #[arg(long)]
    pub ts_root: Option<PathBuf>,

    /// Root directory under which `<lang>/<relative-path>` localized files
    /// are written (overrides config file).
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Destination language (repeatable; overrides config file's
    /// destinations, if any are given).
    #[arg(long = "lang")]
    pub langs: Vec<String>,

    /// Wire in the line-based demo parser instead of expecting a caller to
    /// supply one (this crate ships no concrete file-format parser — see
    /// `core::parser`).
    #[arg(long)]
    pub demo_parser: bool,
}

#[derive(Debug, Parser)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one synchronization job.
    Sync(SyncArgs),
}
