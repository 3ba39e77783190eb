//! Job configuration, fingerprinting, and the builder that assembles one
//! run (spec §4.1, §9).

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::core::diagnostics::Diagnostics;
use crate::core::hooks::HookBus;
use crate::core::model::{FileRow, JobId, Namespace};
use crate::core::normalize::content_hash;
use crate::core::parser::Parser;
use crate::core::store::Store;

/// Bumped whenever the engine's own output-affecting behavior changes, so a
/// stale store forces a full rebuild rather than silently mixing output
/// generations (spec §4.1, property family `job-engine:`).
pub const ENGINE_VERSION: &str = "1";

/// Output encoding for localized file emission (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    /// `\uXXXX`-escaped ASCII, Java `.properties` style (spec §4.6).
    Java,
}

impl Default for OutputEncoding {
    fn default() -> Self {
        OutputEncoding::Utf8
    }
}

/// A similar-language fallback rule (spec §4.7 step 5, GLOSSARY "Similar
/// language"): `destination` may inherit translations from any of `sources`
/// when its own is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarLanguageRule {
    pub destination: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub as_fuzzy: bool,
}

/// Per-job configuration, loaded from `.locsyncrc.json` and/or set
/// programmatically (spec §9 ambient addition, mirroring the teacher's
/// `config::Config`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobSettings {
    pub normalize_strings: bool,
    pub reuse_translations: bool,
    pub reuse_as_fuzzy_default: bool,
    pub reuse_as_fuzzy: Vec<String>,
    pub reuse_as_not_fuzzy: Vec<String>,
    pub reuse_uncertain: bool,
    pub output_only_mode: bool,
    pub rebuild_ts_files: bool,
    pub debug_nosave_loc: bool,
    pub output_default_lang_file: bool,
    pub disable_optimizations: bool,
    pub similar_languages: Vec<SimilarLanguageRule>,
    pub output_encoding: OutputEncoding,
    pub output_bom: bool,
    pub source_language: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            normalize_strings: true,
            reuse_translations: true,
            reuse_as_fuzzy_default: false,
            reuse_as_fuzzy: Vec::new(),
            reuse_as_not_fuzzy: Vec::new(),
            reuse_uncertain: true,
            output_only_mode: false,
            rebuild_ts_files: false,
            debug_nosave_loc: false,
            output_default_lang_file: false,
            disable_optimizations: false,
            similar_languages: Vec::new(),
            output_encoding: OutputEncoding::Utf8,
            output_bom: false,
            source_language: "en".to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// A stable hash of the job configuration that affects output (spec §4.1).
/// Mismatches force optimizations off for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFingerprint(pub String);

#[derive(Serialize)]
struct FingerprintInput<'a> {
    destinations: &'a [String],
    parser_name: &'a str,
    parser_version: &'a str,
    engine_version: &'a str,
    settings_json: String,
}

/// Compute the job fingerprint over everything that affects output:
/// destination languages, parser identity, engine version, and settings
/// (spec §4.1).
pub fn compute_fingerprint(
    destinations: &[String],
    parser: &dyn Parser,
    settings: &JobSettings,
) -> Result<JobFingerprint> {
    let settings_json = serde_json::to_string(settings)?;
    let input = FingerprintInput {
        destinations,
        parser_name: parser.name(),
        parser_version: parser.version(),
        engine_version: ENGINE_VERSION,
        settings_json,
    };
    let canonical = serde_json::to_string(&input)?;
    Ok(JobFingerprint(content_hash(&canonical)))
}

/// Maps a source `FileRow` plus a language to the TS or localized output
/// path for it. Filesystem layout templating (`%FILE%`, `%LANG%`, etc.) is
/// explicitly out of scope (spec §1, §6); callers resolve templates and
/// hand the engine a plain function.
pub type PathTemplate<'a> = Box<dyn Fn(&FileRow, &str) -> PathBuf + 'a>;

/// One configured job run (spec §2, §4.1).
pub struct Job<'a> {
    pub namespace: Namespace,
    pub job_id: JobId,
    pub source_root: PathBuf,
    pub destinations: Vec<String>,
    pub store: Box<dyn Store>,
    pub parser: Box<dyn Parser>,
    pub hooks: HookBus<'a>,
    pub settings: JobSettings,
    pub ts_path: PathTemplate<'a>,
    pub output_path: PathTemplate<'a>,
    /// External "modified set"; if `None`, every destination is considered
    /// modified (spec §4.1 `modified_languages`).
    pub modified_set: Option<Vec<String>>,
}

impl<'a> Job<'a> {
    /// Intersection of destinations with the external modified set, or all
    /// destinations if none was supplied (spec §4.1).
    pub fn modified_languages(&self) -> Vec<String> {
        match &self.modified_set {
            None => self.destinations.clone(),
            Some(modified) => self
                .destinations
                .iter()
                .filter(|d| modified.contains(d))
                .cloned()
                .collect(),
        }
    }

    pub fn fingerprint(&self) -> Result<JobFingerprint> {
        compute_fingerprint(&self.destinations, self.parser.as_ref(), &self.settings)
    }
}

/// Assembles a [`Job`], validating configuration errors up front (spec §7:
/// "missing source directory, empty destination list, missing parser" are
/// fatal before any work starts).
pub struct JobBuilder<'a> {
    namespace: Namespace,
    job_id: JobId,
    source_root: PathBuf,
    destinations: Vec<String>,
    store: Box<dyn Store>,
    parser: Option<Box<dyn Parser>>,
    hooks: HookBus<'a>,
    settings: JobSettings,
    ts_path: Option<PathTemplate<'a>>,
    output_path: Option<PathTemplate<'a>>,
    modified_set: Option<Vec<String>>,
}

impl<'a> JobBuilder<'a> {
    pub fn new(namespace: Namespace, job_id: JobId, source_root: impl Into<PathBuf>, store: Box<dyn Store>) -> Self {
        Self {
            namespace,
            job_id,
            source_root: source_root.into(),
            destinations: Vec::new(),
            store,
            parser: None,
            hooks: HookBus::new(),
            settings: JobSettings::default(),
            ts_path: None,
            output_path: None,
            modified_set: None,
        }
    }

    pub fn destinations(mut self, langs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.destinations = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn parser(mut self, parser: Box<dyn Parser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn hooks(mut self, hooks: HookBus<'a>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn settings(mut self, settings: JobSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn ts_path(mut self, f: impl Fn(&FileRow, &str) -> PathBuf + 'a) -> Self {
        self.ts_path = Some(Box::new(f));
        self
    }

    pub fn output_path(mut self, f: impl Fn(&FileRow, &str) -> PathBuf + 'a) -> Self {
        self.output_path = Some(Box::new(f));
        self
    }

    pub fn modified_set(mut self, langs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.modified_set = Some(langs.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<Job<'a>> {
        if self.destinations.is_empty() {
            bail!("configuration error: job has no destination languages");
        }
        let Some(parser) = self.parser else {
            bail!("configuration error: job has no parser");
        };
        if !self.source_root.exists() {
            bail!(
                "configuration error: source root {} does not exist",
                self.source_root.display()
            );
        }
        let ts_path = self
            .ts_path
            .unwrap_or_else(|| Box::new(|file: &FileRow, lang: &str| PathBuf::from(format!("{}.{lang}.ts", file.relative_path))));
        let output_path = self
            .output_path
            .unwrap_or_else(|| Box::new(|file: &FileRow, lang: &str| PathBuf::from(format!("{lang}/{}", file.relative_path))));

        Ok(Job {
            namespace: self.namespace,
            job_id: self.job_id,
            source_root: self.source_root,
            destinations: self.destinations,
            store: self.store,
            parser,
            hooks: self.hooks,
            settings: self.settings,
            ts_path,
            output_path,
            modified_set: self.modified_set,
        })
    }
}

/// Per-phase counters and collected warnings for one job run (spec §4.1,
/// mirrors the teacher's `CommandResult`/`CommandSummary` pattern).
#[derive(Debug, Default, Clone)]
pub struct JobReport {
    pub files_scanned: usize,
    pub files_parsed: usize,
    pub files_skipped_fast_path: usize,
    pub files_renamed: usize,
    pub files_orphaned: usize,
    pub ts_files_ingested: usize,
    pub ts_files_emitted: usize,
    pub ts_files_unchanged: usize,
    pub localized_files_emitted: usize,
    pub localized_files_unchanged: usize,
    pub optimizations_enabled: bool,
    pub diagnostics: Diagnostics,
}

/// Per-(namespace, language) counters, keyed for callers that need a
/// breakdown rather than a single aggregate.
pub type LanguageCounts = HashMap<String, usize>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::fixture::LineParser;
    use crate::core::store::MemoryStore;

    #[test]
    fn build_fails_without_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let builder = JobBuilder::new(
            Namespace::new("ns"),
            JobId::new("job"),
            dir.path(),
            Box::new(MemoryStore::new()),
        )
        .parser(Box::new(LineParser));
        assert!(builder.build().is_err());
    }

    #[test]
    fn build_fails_without_parser() {
        let dir = tempfile::tempdir().unwrap();
        let builder = JobBuilder::new(
            Namespace::new("ns"),
            JobId::new("job"),
            dir.path(),
            Box::new(MemoryStore::new()),
        )
        .destinations(["fr"]);
        assert!(builder.build().is_err());
    }

    #[test]
    fn build_fails_when_source_root_missing() {
        let builder = JobBuilder::new(
            Namespace::new("ns"),
            JobId::new("job"),
            "/does/not/exist/locsync-test",
            Box::new(MemoryStore::new()),
        )
        .destinations(["fr"])
        .parser(Box::new(LineParser));
        assert!(builder.build().is_err());
    }

    #[test]
    fn modified_languages_defaults_to_all_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let job = JobBuilder::new(
            Namespace::new("ns"),
            JobId::new("job"),
            dir.path(),
            Box::new(MemoryStore::new()),
        )
        .destinations(["fr", "de"])
        .parser(Box::new(LineParser))
        .build()
        .unwrap();
        assert_eq!(job.modified_languages(), vec!["fr".to_string(), "de".to_string()]);
    }

    #[test]
    fn modified_languages_intersects_with_modified_set() {
        let dir = tempfile::tempdir().unwrap();
        let job = JobBuilder::new(
            Namespace::new("ns"),
            JobId::new("job"),
            dir.path(),
            Box::new(MemoryStore::new()),
        )
        .destinations(["fr", "de"])
        .parser(Box::new(LineParser))
        .modified_set(["de"])
        .build()
        .unwrap();
        assert_eq!(job.modified_languages(), vec!["de".to_string()]);
    }

    #[test]
    fn fingerprint_changes_when_settings_change() {
        let dir = tempfile::tempdir().unwrap();
        let settings_a = JobSettings::default();
        let mut settings_b = JobSettings::default();
        settings_b.reuse_translations = !settings_b.reuse_translations;

        let job_a = JobBuilder::new(
            Namespace::new("ns"),
            JobId::new("job"),
            dir.path(),
            Box::new(MemoryStore::new()),
        )
        .destinations(["fr"])
        .parser(Box::new(LineParser))
        .settings(settings_a)
        .build()
        .unwrap();

        let job_b = JobBuilder::new(
            Namespace::new("ns"),
            JobId::new("job"),
            dir.path(),
            Box::new(MemoryStore::new()),
        )
        .destinations(["fr"])
        .parser(Box::new(LineParser))
        .settings(settings_b)
        .build()
        .unwrap();

        assert_ne!(job_a.fingerprint().unwrap(), job_b.fingerprint().unwrap());
    }
}
