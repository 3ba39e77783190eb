//! `locsync` CLI entry point.
//!
//! Thin dispatcher over the library's `cli` module — see spec §1's
//! Non-goal that the binary stays a thin external-collaborator shim.

use std::process::ExitCode;

use clap::Parser;
use locsync::cli::{Arguments, ExitStatus};

fn main() -> ExitCode {
    let args = Arguments::parse();

    match locsync::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitStatus::Error.into()
        }
    }
}
