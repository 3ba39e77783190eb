//! Command dispatcher: resolves settings, builds a `Job`, and runs it.

use std::env;

use anyhow::{Context, Result};
use colored::Colorize;

use super::args::{Arguments, Command, CommonArgs};
use super::exit_status::ExitStatus;
use crate::config::load_config;
use crate::core::model::{JobId, Namespace};
use crate::core::parser::fixture::LineParser;
use crate::core::{Job, JobBuilder, MemoryStore};

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Sync(args)) => sync(args.common),
        None => anyhow::bail!("no command provided. Use --help to see available commands."),
    }
}

fn sync(common: CommonArgs) -> Result<ExitStatus> {
    let cwd = env::current_dir().context("failed to determine current directory")?;
    let loaded = load_config(&cwd)?;
    let settings = loaded.settings;

    let source_root = common.source_root.unwrap_or_else(|| cwd.clone());
    let ts_root = common.ts_root.unwrap_or_else(|| cwd.join("ts"));
    let output_root = common.output_root.unwrap_or_else(|| cwd.join("out"));

    if common.langs.is_empty() {
        anyhow::bail!("no destination languages given; pass --lang at least once");
    }
    let destinations = common.langs;

    if !common.demo_parser {
        anyhow::bail!(
            "this build ships no concrete file-format parser; pass --demo-parser to run \
             the line-based demonstration parser, or embed this crate as a library and \
             supply your own `Parser`"
        );
    }

    let mut job = JobBuilder::new(
        Namespace::new("default"),
        JobId::new("default"),
        source_root,
        Box::new(MemoryStore::new()),
    )
    .destinations(destinations)
    .parser(Box::new(LineParser))
    .settings(settings)
    .ts_path({
        let ts_root = ts_root.clone();
        move |file, lang| ts_root.join(format!("{}.{lang}.ts", file.relative_path))
    })
    .output_path({
        let output_root = output_root.clone();
        move |file, lang| output_root.join(lang).join(&file.relative_path)
    })
    .build()?;

    let report = run_job_and_report(&mut job)?;

    if !report.diagnostics.is_empty() {
        for warning in report.diagnostics.iter() {
            eprintln!("{} {warning}", "warning:".yellow().bold());
        }
        return Ok(ExitStatus::Failure);
    }

    Ok(ExitStatus::Success)
}

fn run_job_and_report(job: &mut Job<'_>) -> Result<crate::core::JobReport> {
    let report = crate::core::run_job(job)?;
    println!(
        "{} {} scanned, {} parsed, {} ts emitted, {} localized emitted",
        "sync:".green().bold(),
        report.files_scanned,
        report.files_parsed,
        report.ts_files_emitted,
        report.localized_files_emitted,
    );
    Ok(report)
}
