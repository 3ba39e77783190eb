//! The reconciliation engine.
//!
//! This module contains the incremental reconciliation core: detecting
//! which source files and TS files have changed since the last run,
//! resolving renames by content hashing, disambiguating duplicate strings
//! within a file, matching items against the store, fuzzy-reusing
//! translations across files and languages, and regenerating only the
//! outputs that actually need regeneration.
//!
//! ## Module Structure
//!
//! - `model`: Entity and property-key types persisted by a `Store`
//! - `store`: The `Store` trait, the identity-map `CachedStore`, and the
//!   in-memory `MemoryStore` reference implementation
//! - `hooks`: The named-phase hook bus
//! - `parser`: The `Parser` capability the engine drives
//! - `normalize`: Encoding autodetection and content hashing
//! - `job`: `Job`, `JobSettings`, and the job fingerprint
//! - `scan`: Source tree walk and rename reconciliation
//! - `extract`: Parsing callback glue and disambiguation
//! - `ts_format`: Shared TS (gettext-style) block parsing and rendering
//! - `ts_ingest`: Reading TS files into the store
//! - `ts_emit`: Regenerating TS files from the store
//! - `localize`: Rendering localized output files
//! - `translate`: Translation resolution order
//! - `pipeline`: The job runner that drives all phases in order
//! - `diagnostics`: Warning/error accumulation for a job run

pub mod diagnostics;
pub mod extract;
pub mod hooks;
pub mod job;
pub mod localize;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod scan;
pub mod store;
pub mod translate;
pub mod ts_emit;
pub mod ts_format;
pub mod ts_ingest;

pub use diagnostics::Diagnostics;
pub use hooks::HookBus;
pub use job::{Job, JobBuilder, JobReport, JobSettings};
pub use model::*;
pub use parser::{ExtractAction, ExtractedString, Parser};
pub use pipeline::run_job;
pub use store::{CachedStore, MemoryStore, Store};
