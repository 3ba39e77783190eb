//! Non-fatal warning collection (spec §2, §7).
//!
//! The teacher has no `log`/`tracing` dependency and reports problems as
//! data (`MessageScanWarning`, `ParseErrorIssue`) collected during a run and
//! printed once at the end (`cli/report.rs`). `Diagnostics` follows the same
//! shape: a job accumulates warnings here instead of writing to stderr
//! mid-run, and the CLI shim prints them after `run_job` returns.

use std::fmt;

/// One non-fatal problem encountered during a job run. Carries enough
/// context (file, optional language) for the caller to report it without
/// re-deriving it from the warning message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub file: Option<String>,
    pub lang: Option<String>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, &self.lang) {
            (Some(file), Some(lang)) => write!(f, "{file} [{lang}]: {}", self.message),
            (Some(file), None) => write!(f, "{file}: {}", self.message),
            (None, _) => write!(f, "{}", self.message),
        }
    }
}

/// Collects every non-fatal warning raised during one job run (malformed TS
/// blocks, unknown keys, dropped files — spec §7 "per-file/per-block
/// failures"). Fatal errors never land here: they propagate as `Err` and
/// abort the run before the commit step.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.warnings.push(Warning {
            file: None,
            lang: None,
            message: message.into(),
        });
    }

    pub fn push_for_file(&mut self, file: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Warning {
            file: Some(file.into()),
            lang: None,
            message: message.into(),
        });
    }

    pub fn push_for_file_lang(
        &mut self,
        file: impl Into<String>,
        lang: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.warnings.push(Warning {
            file: Some(file.into()),
            lang: Some(lang.into()),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}
