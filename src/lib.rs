//! locsync - incremental localization synchronization engine.
//!
//! locsync keeps three artifacts in sync for a software project: a tree of
//! source files, a persistent translation store, and a tree of per-language
//! TS interchange files plus localized output files. It runs one job at a
//! time, sequentially, on a single thread.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (thin dispatcher, see `core::job`
//!   for the actual engine entry point)
//! - `config`: Job settings loading and merging
//! - `core`: The reconciliation engine (scan, extract, TS ingest/emit,
//!   localize, translate, store, hooks)

pub mod cli;
pub mod config;
pub mod core;
