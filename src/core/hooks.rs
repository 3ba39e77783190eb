//! Named-phase hook dispatch (spec §4.1, §9).
//!
//! Modeled as a mapping from phase name to an ordered list of handlers, each
//! a boxed closure with a well-typed parameter tuple per phase, exactly as
//! the design note in spec §9 recommends. Handlers are invoked in
//! registration order; a phase is reduced with `combine_and` (all handlers
//! must return `true`) or `combine_or` (any handler returning `true` is
//! enough), matching the per-phase semantics used by the pipeline:
//!
//! - veto phases (`is_file_orphaned`, `can_process_source_file`,
//!   `can_extract`, `can_translate`) use `combine_and` — any handler saying
//!   "no" wins, consistent with "all must agree to proceed".
//! - mutation phases (`rewrite_path`, `rewrite_parsed_ts_file_item`,
//!   `rewrite_translation`, `get_translation_pre`, `get_translation`) are
//!   fired in order and each may mutate its by-reference parameters; they
//!   don't reduce to a boolean at all, so they're dispatched with
//!   [`HookBus::for_each`] instead of [`HookBus::all`]/[`HookBus::any`].
//! - lifecycle phases (`before_job`, `after_job`,
//!   `before_update_database_from_source_files`,
//!   `before_update_database_from_ts_file`, `before_generate_ts_files`,
//!   `before_generate_localized_files`) are informational and dispatched
//!   with `for_each`.

use std::collections::HashMap;

/// Identifies a hook firing point. New phases can be added by a caller
/// without changing the engine; the engine only ever fires the phases it
/// knows about, listed in spec §4.1/§6/§9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeJob,
    AfterJob,
    RewritePath,
    AfterLoadSourceFileForProcessing,
    IsFileOrphaned,
    CanProcessSourceFile,
    CanExtract,
    BeforeUpdateDatabaseFromSourceFiles,
    BeforeUpdateDatabaseFromTsFile,
    RewriteParsedTsFileItem,
    BeforeGenerateTsFiles,
    CanTranslate,
    GetTranslationPre,
    GetTranslation,
    RewriteTranslation,
    BeforeGenerateLocalizedFiles,
}

/// A veto-style handler: receives the veto parameter by reference (so it
/// can inspect, not mutate) and returns whether processing may continue.
pub type VetoHandler<'a, T> = Box<dyn Fn(&T) -> bool + 'a>;

/// A mutation-style handler: receives its parameter by mutable reference.
pub type MutHandler<'a, T> = Box<dyn Fn(&mut T) + 'a>;

/// Mutable fields of one TS block an ingest hook may rewrite (spec §4.4:
/// "may mutate translation, comment, fuzzy, or set an item-level
/// `item_comment`").
#[derive(Debug, Clone, Default)]
pub struct TsItemRewrite {
    pub translation: String,
    pub comment: String,
    pub fuzzy: bool,
    pub item_comment: Option<String>,
}

/// The hook bus for one job run. Each phase has its own typed registration
/// method because each phase has a different parameter shape; there is
/// deliberately no single `register(phase, handler: Box<dyn Any>)` escape
/// hatch, so a caller can't wire a handler to the wrong phase type.
#[derive(Default)]
pub struct HookBus<'a> {
    lifecycle: HashMap<Phase, Vec<Box<dyn Fn() + 'a>>>,
    rewrite_path: Vec<MutHandler<'a, String>>,
    after_load_source_file_for_processing: Vec<Box<dyn Fn(&str, &str) -> bool + 'a>>,
    is_file_orphaned: Vec<VetoHandler<'a, str>>,
    can_process_source_file: Vec<VetoHandler<'a, str>>,
    can_extract: Vec<VetoHandler<'a, str>>,
    can_translate: Vec<VetoHandler<'a, str>>,
    rewrite_parsed_ts_file_item: Vec<MutHandler<'a, TsItemRewrite>>,
    get_translation_pre: Vec<Box<dyn Fn(&str, &str, &str) -> Option<String> + 'a>>,
    get_translation: Vec<Box<dyn Fn(&str, &str, &str) -> Option<String> + 'a>>,
    rewrite_translation: Vec<Box<dyn Fn(&mut String, &str) + 'a>>,
}

impl<'a> HookBus<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lifecycle handler fired with no parameters.
    pub fn on_lifecycle(&mut self, phase: Phase, handler: impl Fn() + 'a) {
        self.lifecycle.entry(phase).or_default().push(Box::new(handler));
    }

    /// Fire all handlers registered for a lifecycle phase, in order.
    pub fn fire_lifecycle(&self, phase: Phase) {
        if let Some(handlers) = self.lifecycle.get(&phase) {
            for h in handlers {
                h();
            }
        }
    }

    /// Register a `rewrite_path` handler: may rewrite the relative path of
    /// a found source file before scan reconciliation compares it to the
    /// store (spec §4.2).
    pub fn on_rewrite_path(&mut self, handler: impl Fn(&mut String) + 'a) {
        self.rewrite_path.push(Box::new(handler));
    }

    /// Apply every registered `rewrite_path` handler in registration order.
    pub fn rewrite_path(&self, path: &mut String) {
        for h in &self.rewrite_path {
            h(path);
        }
    }

    /// Register an `after_load_source_file_for_processing` veto handler:
    /// may inspect a source file's relative path and loaded, normalized
    /// text and veto further processing (spec §4.3).
    pub fn on_after_load_source_file_for_processing(&mut self, handler: impl Fn(&str, &str) -> bool + 'a) {
        self.after_load_source_file_for_processing.push(Box::new(handler));
    }

    /// `combine_and`: every registered handler must return `true`.
    pub fn after_load_source_file_for_processing(&self, relative_path: &str, text: &str) -> bool {
        self.after_load_source_file_for_processing
            .iter()
            .all(|h| h(relative_path, text))
    }

    /// Register an `is_file_orphaned` veto handler: may veto marking a
    /// file's no-longer-found items as orphaned (spec §4.3).
    pub fn on_is_file_orphaned(&mut self, handler: impl Fn(&str) -> bool + 'a) {
        self.is_file_orphaned.push(Box::new(handler));
    }

    /// `combine_and`: every registered handler must return `true`.
    pub fn is_file_orphaned(&self, relative_path: &str) -> bool {
        self.is_file_orphaned.iter().all(|h| h(relative_path))
    }

    /// Register a `can_process_source_file` veto handler.
    pub fn on_can_process_source_file(&mut self, handler: impl Fn(&str) -> bool + 'a) {
        self.can_process_source_file.push(Box::new(handler));
    }

    /// `combine_and`: every registered handler must return `true`.
    pub fn can_process_source_file(&self, relative_path: &str) -> bool {
        self.can_process_source_file.iter().all(|h| h(relative_path))
    }

    /// Register a `can_extract` veto handler.
    pub fn on_can_extract(&mut self, handler: impl Fn(&str) -> bool + 'a) {
        self.can_extract.push(Box::new(handler));
    }

    /// `combine_and`: every registered handler must return `true`.
    pub fn can_extract(&self, string: &str) -> bool {
        self.can_extract.iter().all(|h| h(string))
    }

    /// Register a `can_translate` veto handler.
    pub fn on_can_translate(&mut self, handler: impl Fn(&str) -> bool + 'a) {
        self.can_translate.push(Box::new(handler));
    }

    /// `combine_and`: every registered handler must return `true`.
    pub fn can_translate(&self, string: &str) -> bool {
        self.can_translate.iter().all(|h| h(string))
    }

    /// Register a `rewrite_parsed_ts_file_item` handler (spec §4.4).
    pub fn on_rewrite_parsed_ts_file_item(&mut self, handler: impl Fn(&mut TsItemRewrite) + 'a) {
        self.rewrite_parsed_ts_file_item.push(Box::new(handler));
    }

    /// Apply every registered `rewrite_parsed_ts_file_item` handler in order.
    pub fn rewrite_parsed_ts_file_item(&self, item: &mut TsItemRewrite) {
        for h in &self.rewrite_parsed_ts_file_item {
            h(item);
        }
    }

    /// Register a `get_translation_pre` handler (spec §4.7 step 1).
    pub fn on_get_translation_pre(&mut self, handler: impl Fn(&str, &str, &str) -> Option<String> + 'a) {
        self.get_translation_pre.push(Box::new(handler));
    }

    /// First handler to return `Some` wins; `None` if none do.
    pub fn get_translation_pre(&self, string: &str, context: &str, lang: &str) -> Option<String> {
        self.get_translation_pre.iter().find_map(|h| h(string, context, lang))
    }

    /// Register a `get_translation` handler (spec §4.7 step 4).
    pub fn on_get_translation(&mut self, handler: impl Fn(&str, &str, &str) -> Option<String> + 'a) {
        self.get_translation.push(Box::new(handler));
    }

    /// First handler to return `Some` wins; `None` if none do.
    pub fn get_translation(&self, string: &str, context: &str, lang: &str) -> Option<String> {
        self.get_translation.iter().find_map(|h| h(string, context, lang))
    }

    /// Register a `rewrite_translation` handler (spec §4.6 step 3).
    pub fn on_rewrite_translation(&mut self, handler: impl Fn(&mut String, &str) + 'a) {
        self.rewrite_translation.push(Box::new(handler));
    }

    /// Apply every registered `rewrite_translation` handler in order,
    /// reporting whether any handler actually ran (the caller re-applies
    /// NFC only if so, per spec §4.6 step 3).
    pub fn rewrite_translation(&self, translation: &mut String, lang: &str) -> bool {
        for h in &self.rewrite_translation {
            h(translation, lang);
        }
        !self.rewrite_translation.is_empty()
    }
}
