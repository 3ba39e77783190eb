//! The `Store` capability and its identity-map cache (spec §6, §9).
//!
//! The concrete database driver beneath this is out of scope per spec §1;
//! this module defines the `Store` trait the engine drives, a fully
//! in-memory `MemoryStore` reference implementation that stands in for the
//! "concrete driver", and `CachedStore<S>`, the identity-map decorator
//! described in spec §4/§9 ("Cached store: identity maps replace ORM
//! pass-through caching... use weak dictionaries keyed by entity id per
//! entity kind, and an explicit `preload_translations_for_job` that fills
//! caches from one join query").

use std::collections::HashMap;

use crate::core::model::{
    FileId, FileRow, ItemId, ItemRow, JobId, Namespace, PropertyKey, StringId, StringRow,
    TranslationId, TranslationRow, Usn,
};

/// Result of a fuzzy-reuse lookup (spec §4.7 step 3, §6
/// `find_best_translation`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestTranslation {
    pub translation: String,
    pub fuzzy: bool,
    pub comment: String,
    /// `true` if more than one distinct translation was found across the
    /// candidate files/namespaces — triggers the `reuse_uncertain` gate.
    pub multiple_variants: bool,
}

/// Entity CRUD, preload, and property access the engine drives (spec §6).
pub trait Store {
    fn find_string(&self, text: &str, context: &str) -> Option<StringId>;
    fn get_or_create_string(&mut self, text: &str, context: &str) -> StringId;
    fn string(&self, id: StringId) -> StringRow;
    fn set_string_skip(&mut self, id: StringId, skip: bool);

    fn find_file(&self, ns: &Namespace, job: &JobId, relative_path: &str) -> Option<FileId>;
    fn get_or_create_file(&mut self, ns: &Namespace, job: &JobId, relative_path: &str) -> FileId;
    fn file(&self, id: FileId) -> FileRow;
    fn set_file_path(&mut self, id: FileId, relative_path: &str);
    fn set_file_orphaned(&mut self, id: FileId, orphaned: bool);
    fn files_for_job(&self, ns: &Namespace, job: &JobId) -> Vec<FileId>;

    fn find_item(&self, file: FileId, string: StringId) -> Option<ItemId>;
    fn get_or_create_item(&mut self, file: FileId, string: StringId) -> ItemId;
    fn item(&self, id: ItemId) -> ItemRow;
    fn set_item_hint(&mut self, id: ItemId, hint: &str);
    fn set_item_comment(&mut self, id: ItemId, comment: &str);
    fn set_item_orphaned(&mut self, id: ItemId, orphaned: bool);
    fn set_item_plural(&mut self, id: ItemId, plural: Option<String>);
    fn items_for_file(&self, file: FileId) -> Vec<ItemId>;

    fn find_translation(&self, item: ItemId, lang: &str) -> Option<TranslationId>;
    fn translation(&self, id: TranslationId) -> TranslationRow;
    /// Create or update a translation's content. Creates the row (with
    /// `merge = false`) on first write.
    fn upsert_translation(
        &mut self,
        item: ItemId,
        lang: &str,
        string: &str,
        fuzzy: bool,
        comment: &str,
    ) -> TranslationId;
    fn set_translation_merge(&mut self, id: TranslationId, merge: bool);

    fn get_property(&self, key: &PropertyKey) -> Option<String>;
    fn set_property(&mut self, key: &PropertyKey, value: &str);

    /// Warm all caches relevant to `(namespace, job_id)` across `langs` from
    /// a single pass, rather than one query per item (spec §6).
    fn preload_translations_for_job(&mut self, ns: &Namespace, job: &JobId, langs: &[String]);

    /// Build a per-language existence set keyed by `MD5(string)` and
    /// `MD5(string ⟂ context)`, used to short-circuit fuzzy lookups
    /// (spec §6). A no-op for `MemoryStore`, whose lookups are already
    /// O(1) hash-map hits; kept as a distinct call so a real driver can
    /// batch it.
    fn preload_strings_for_lang(&mut self, lang: &str);

    /// Highest USN over all items and translations of `(file_id, lang)`
    /// (spec §3, §4.5, §8 invariant 8).
    fn highest_usn_for_file_lang(&self, file: FileId, lang: &str) -> Usn;

    /// Best available translation for `(string, context)` in `lang` from
    /// other files/namespaces (spec §4.7 step 3, §6). `allow_orphaned`
    /// controls whether orphaned items are eligible donors.
    fn find_best_translation(
        &self,
        ns: &Namespace,
        filepath: &str,
        string: &str,
        context: &str,
        lang: &str,
        allow_orphaned: bool,
    ) -> Option<BestTranslation>;
}

/// A fully in-memory `Store`. Stands in for the out-of-scope concrete
/// database driver so the crate is runnable and testable without one.
#[derive(Default)]
pub struct MemoryStore {
    strings: Vec<StringRow>,
    string_index: HashMap<(String, String), StringId>,

    files: Vec<FileRow>,
    file_index: HashMap<(Namespace, JobId, String), FileId>,

    items: Vec<ItemRow>,
    item_index: HashMap<(FileId, StringId), ItemId>,
    item_seq: Vec<u64>,

    translations: Vec<TranslationRow>,
    translation_index: HashMap<(ItemId, String), TranslationId>,
    translation_seq: Vec<u64>,

    properties: HashMap<String, String>,

    next_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

impl Store for MemoryStore {
    fn find_string(&self, text: &str, context: &str) -> Option<StringId> {
        self.string_index
            .get(&(text.to_string(), context.to_string()))
            .copied()
    }

    fn get_or_create_string(&mut self, text: &str, context: &str) -> StringId {
        if let Some(id) = self.find_string(text, context) {
            return id;
        }
        let id = StringId(self.strings.len() as u64);
        self.strings.push(StringRow {
            text: text.to_string(),
            context: context.to_string(),
            skip: false,
        });
        self.string_index
            .insert((text.to_string(), context.to_string()), id);
        id
    }

    fn string(&self, id: StringId) -> StringRow {
        self.strings[id.0 as usize].clone()
    }

    fn set_string_skip(&mut self, id: StringId, skip: bool) {
        self.strings[id.0 as usize].skip = skip;
    }

    fn find_file(&self, ns: &Namespace, job: &JobId, relative_path: &str) -> Option<FileId> {
        self.file_index
            .get(&(ns.clone(), job.clone(), relative_path.to_string()))
            .copied()
    }

    fn get_or_create_file(&mut self, ns: &Namespace, job: &JobId, relative_path: &str) -> FileId {
        if let Some(id) = self.find_file(ns, job, relative_path) {
            return id;
        }
        let id = FileId(self.files.len() as u64);
        self.files.push(FileRow {
            namespace: ns.clone(),
            job_id: job.clone(),
            relative_path: relative_path.to_string(),
            orphaned: false,
        });
        self.file_index
            .insert((ns.clone(), job.clone(), relative_path.to_string()), id);
        id
    }

    fn file(&self, id: FileId) -> FileRow {
        self.files[id.0 as usize].clone()
    }

    fn set_file_path(&mut self, id: FileId, relative_path: &str) {
        let row = &mut self.files[id.0 as usize];
        let old_key = (row.namespace.clone(), row.job_id.clone(), row.relative_path.clone());
        self.file_index.remove(&old_key);
        row.relative_path = relative_path.to_string();
        let new_key = (row.namespace.clone(), row.job_id.clone(), row.relative_path.clone());
        self.file_index.insert(new_key, id);
    }

    fn set_file_orphaned(&mut self, id: FileId, orphaned: bool) {
        self.files[id.0 as usize].orphaned = orphaned;
    }

    fn files_for_job(&self, ns: &Namespace, job: &JobId) -> Vec<FileId> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| &f.namespace == ns && &f.job_id == job)
            .map(|(i, _)| FileId(i as u64))
            .collect()
    }

    fn find_item(&self, file: FileId, string: StringId) -> Option<ItemId> {
        self.item_index.get(&(file, string)).copied()
    }

    fn get_or_create_item(&mut self, file: FileId, string: StringId) -> ItemId {
        if let Some(id) = self.find_item(file, string) {
            return id;
        }
        let id = ItemId(self.items.len() as u64);
        self.items.push(ItemRow {
            file_id: file,
            string_id: string,
            hint: String::new(),
            comment: String::new(),
            orphaned: false,
            plural: None,
        });
        let seq = self.bump();
        self.item_seq.push(seq);
        self.item_index.insert((file, string), id);
        id
    }

    fn item(&self, id: ItemId) -> ItemRow {
        self.items[id.0 as usize].clone()
    }

    fn set_item_hint(&mut self, id: ItemId, hint: &str) {
        self.items[id.0 as usize].hint = hint.to_string();
        let seq = self.bump();
        self.item_seq[id.0 as usize] = seq;
    }

    fn set_item_comment(&mut self, id: ItemId, comment: &str) {
        self.items[id.0 as usize].comment = comment.to_string();
        let seq = self.bump();
        self.item_seq[id.0 as usize] = seq;
    }

    fn set_item_orphaned(&mut self, id: ItemId, orphaned: bool) {
        self.items[id.0 as usize].orphaned = orphaned;
    }

    fn set_item_plural(&mut self, id: ItemId, plural: Option<String>) {
        self.items[id.0 as usize].plural = plural;
    }

    fn items_for_file(&self, file: FileId) -> Vec<ItemId> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, it)| it.file_id == file)
            .map(|(i, _)| ItemId(i as u64))
            .collect()
    }

    fn find_translation(&self, item: ItemId, lang: &str) -> Option<TranslationId> {
        self.translation_index.get(&(item, lang.to_string())).copied()
    }

    fn translation(&self, id: TranslationId) -> TranslationRow {
        self.translations[id.0 as usize].clone()
    }

    fn upsert_translation(
        &mut self,
        item: ItemId,
        lang: &str,
        string: &str,
        fuzzy: bool,
        comment: &str,
    ) -> TranslationId {
        // Fuzzy+empty is illegal; coerce to non-fuzzy (spec §3 invariant).
        let fuzzy = fuzzy && !string.is_empty();
        if let Some(id) = self.find_translation(item, lang) {
            let row = &mut self.translations[id.0 as usize];
            row.string = string.to_string();
            row.fuzzy = fuzzy;
            row.comment = comment.to_string();
            let seq = self.bump();
            self.translation_seq[id.0 as usize] = seq;
            return id;
        }
        let id = TranslationId(self.translations.len() as u64);
        self.translations.push(TranslationRow {
            item_id: item,
            language: lang.to_string(),
            string: string.to_string(),
            fuzzy,
            comment: comment.to_string(),
            merge: false,
        });
        let seq = self.bump();
        self.translation_seq.push(seq);
        self.translation_index.insert((item, lang.to_string()), id);
        id
    }

    fn set_translation_merge(&mut self, id: TranslationId, merge: bool) {
        self.translations[id.0 as usize].merge = merge;
        let seq = self.bump();
        self.translation_seq[id.0 as usize] = seq;
    }

    fn get_property(&self, key: &PropertyKey) -> Option<String> {
        self.properties.get(&key.to_string()).cloned()
    }

    fn set_property(&mut self, key: &PropertyKey, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    fn preload_translations_for_job(&mut self, _ns: &Namespace, _job: &JobId, _langs: &[String]) {
        // MemoryStore has no connection-level cache to warm; a real driver
        // would issue one join query here. Kept as an explicit call site so
        // `CachedStore` has something concrete to preload from.
    }

    fn preload_strings_for_lang(&mut self, _lang: &str) {}

    fn highest_usn_for_file_lang(&self, file: FileId, lang: &str) -> Usn {
        let item_ids = self.items_for_file(file);
        let mut max_seq = 0u64;
        for id in &item_ids {
            max_seq = max_seq.max(self.item_seq[id.0 as usize]);
        }
        for id in &item_ids {
            if let Some(t) = self.find_translation(*id, lang) {
                max_seq = max_seq.max(self.translation_seq[t.0 as usize]);
            }
        }
        Usn(max_seq)
    }

    fn find_best_translation(
        &self,
        _ns: &Namespace,
        filepath: &str,
        string: &str,
        context: &str,
        lang: &str,
        allow_orphaned: bool,
    ) -> Option<BestTranslation> {
        let Some(string_id) = self.find_string(string, context) else {
            return None;
        };
        let _ = filepath; // reserved for excluding the requesting file once multi-file donor ranking needs it
        let mut variants: Vec<(String, bool, String)> = Vec::new();

        for (idx, item) in self.items.iter().enumerate() {
            if item.string_id != string_id {
                continue;
            }
            if !allow_orphaned && item.orphaned {
                continue;
            }
            let item_id = ItemId(idx as u64);
            if let Some(t_id) = self.find_translation(item_id, lang) {
                let t = self.translation(t_id);
                if t.string.is_empty() {
                    continue;
                }
                let already = variants.iter().any(|(s, _, _)| s == &t.string);
                if !already {
                    variants.push((t.string.clone(), t.fuzzy, t.comment.clone()));
                }
            }
        }

        if variants.is_empty() {
            return None;
        }
        let multiple_variants = variants.len() > 1;
        let (translation, fuzzy, comment) = variants.into_iter().next().unwrap();
        Some(BestTranslation {
            translation,
            fuzzy,
            comment,
            multiple_variants,
        })
    }
}

/// Identity-map cache in front of any [`Store`] (spec §9). Mirrors the
/// teacher's ORM-replacing identity-map pattern: every read first consults
/// a per-entity-kind map keyed by id; every write updates both the
/// underlying store and the cache so subsequent reads never go stale.
pub struct CachedStore<S: Store> {
    inner: S,
    string_cache: HashMap<StringId, StringRow>,
    file_cache: HashMap<FileId, FileRow>,
    item_cache: HashMap<ItemId, ItemRow>,
    translation_cache: HashMap<TranslationId, TranslationRow>,
    property_cache: HashMap<String, String>,
    all_items_cache: HashMap<FileId, Vec<ItemId>>,
    all_files_cache: HashMap<(Namespace, JobId), Vec<FileId>>,
}

impl<S: Store> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            string_cache: HashMap::new(),
            file_cache: HashMap::new(),
            item_cache: HashMap::new(),
            translation_cache: HashMap::new(),
            property_cache: HashMap::new(),
            all_items_cache: HashMap::new(),
            all_files_cache: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn invalidate_file_list(&mut self, ns: &Namespace, job: &JobId) {
        self.all_files_cache.remove(&(ns.clone(), job.clone()));
    }

    fn invalidate_item_list(&mut self, file: FileId) {
        self.all_items_cache.remove(&file);
    }
}

impl<S: Store> Store for CachedStore<S> {
    fn find_string(&self, text: &str, context: &str) -> Option<StringId> {
        self.inner.find_string(text, context)
    }

    fn get_or_create_string(&mut self, text: &str, context: &str) -> StringId {
        let id = self.inner.get_or_create_string(text, context);
        let row = self.inner.string(id);
        self.string_cache.insert(id, row);
        id
    }

    fn string(&self, id: StringId) -> StringRow {
        self.string_cache
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.inner.string(id))
    }

    fn set_string_skip(&mut self, id: StringId, skip: bool) {
        self.inner.set_string_skip(id, skip);
        let row = self.inner.string(id);
        self.string_cache.insert(id, row);
    }

    fn find_file(&self, ns: &Namespace, job: &JobId, relative_path: &str) -> Option<FileId> {
        self.inner.find_file(ns, job, relative_path)
    }

    fn get_or_create_file(&mut self, ns: &Namespace, job: &JobId, relative_path: &str) -> FileId {
        let id = self.inner.get_or_create_file(ns, job, relative_path);
        let row = self.inner.file(id);
        self.file_cache.insert(id, row);
        self.invalidate_file_list(ns, job);
        id
    }

    fn file(&self, id: FileId) -> FileRow {
        self.file_cache
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.inner.file(id))
    }

    fn set_file_path(&mut self, id: FileId, relative_path: &str) {
        self.inner.set_file_path(id, relative_path);
        let row = self.inner.file(id);
        self.file_cache.insert(id, row);
    }

    fn set_file_orphaned(&mut self, id: FileId, orphaned: bool) {
        self.inner.set_file_orphaned(id, orphaned);
        let row = self.inner.file(id);
        self.file_cache.insert(id, row);
    }

    fn files_for_job(&self, ns: &Namespace, job: &JobId) -> Vec<FileId> {
        if let Some(cached) = self.all_files_cache.get(&(ns.clone(), job.clone())) {
            return cached.clone();
        }
        self.inner.files_for_job(ns, job)
    }

    fn find_item(&self, file: FileId, string: StringId) -> Option<ItemId> {
        self.inner.find_item(file, string)
    }

    fn get_or_create_item(&mut self, file: FileId, string: StringId) -> ItemId {
        let id = self.inner.get_or_create_item(file, string);
        let row = self.inner.item(id);
        self.item_cache.insert(id, row);
        self.invalidate_item_list(file);
        id
    }

    fn item(&self, id: ItemId) -> ItemRow {
        self.item_cache
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.inner.item(id))
    }

    fn set_item_hint(&mut self, id: ItemId, hint: &str) {
        self.inner.set_item_hint(id, hint);
        let row = self.inner.item(id);
        self.item_cache.insert(id, row);
    }

    fn set_item_comment(&mut self, id: ItemId, comment: &str) {
        self.inner.set_item_comment(id, comment);
        let row = self.inner.item(id);
        self.item_cache.insert(id, row);
    }

    fn set_item_orphaned(&mut self, id: ItemId, orphaned: bool) {
        self.inner.set_item_orphaned(id, orphaned);
        let row = self.inner.item(id);
        self.item_cache.insert(id, row);
    }

    fn set_item_plural(&mut self, id: ItemId, plural: Option<String>) {
        self.inner.set_item_plural(id, plural);
        let row = self.inner.item(id);
        self.item_cache.insert(id, row);
    }

    fn items_for_file(&self, file: FileId) -> Vec<ItemId> {
        if let Some(cached) = self.all_items_cache.get(&file) {
            return cached.clone();
        }
        self.inner.items_for_file(file)
    }

    fn find_translation(&self, item: ItemId, lang: &str) -> Option<TranslationId> {
        self.inner.find_translation(item, lang)
    }

    fn translation(&self, id: TranslationId) -> TranslationRow {
        self.translation_cache
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.inner.translation(id))
    }

    fn upsert_translation(
        &mut self,
        item: ItemId,
        lang: &str,
        string: &str,
        fuzzy: bool,
        comment: &str,
    ) -> TranslationId {
        let id = self.inner.upsert_translation(item, lang, string, fuzzy, comment);
        let row = self.inner.translation(id);
        self.translation_cache.insert(id, row);
        id
    }

    fn set_translation_merge(&mut self, id: TranslationId, merge: bool) {
        self.inner.set_translation_merge(id, merge);
        let row = self.inner.translation(id);
        self.translation_cache.insert(id, row);
    }

    fn get_property(&self, key: &PropertyKey) -> Option<String> {
        if let Some(v) = self.property_cache.get(&key.to_string()) {
            return Some(v.clone());
        }
        self.inner.get_property(key)
    }

    fn set_property(&mut self, key: &PropertyKey, value: &str) {
        self.inner.set_property(key, value);
        self.property_cache.insert(key.to_string(), value.to_string());
    }

    fn preload_translations_for_job(&mut self, ns: &Namespace, job: &JobId, langs: &[String]) {
        self.inner.preload_translations_for_job(ns, job, langs);
        let files = self.inner.files_for_job(ns, job);
        self.all_files_cache.insert((ns.clone(), job.clone()), files.clone());
        for file in files {
            let row = self.inner.file(file);
            self.file_cache.insert(file, row);
            let items = self.inner.items_for_file(file);
            self.all_items_cache.insert(file, items.clone());
            for item in items {
                let row = self.inner.item(item);
                self.item_cache.insert(item, row);
                for lang in langs {
                    if let Some(t_id) = self.inner.find_translation(item, lang) {
                        let row = self.inner.translation(t_id);
                        self.translation_cache.insert(t_id, row);
                    }
                }
            }
        }
    }

    fn preload_strings_for_lang(&mut self, lang: &str) {
        self.inner.preload_strings_for_lang(lang);
    }

    fn highest_usn_for_file_lang(&self, file: FileId, lang: &str) -> Usn {
        self.inner.highest_usn_for_file_lang(file, lang)
    }

    fn find_best_translation(
        &self,
        ns: &Namespace,
        filepath: &str,
        string: &str,
        context: &str,
        lang: &str,
        allow_orphaned: bool,
    ) -> Option<BestTranslation> {
        self.inner
            .find_best_translation(ns, filepath, string, context, lang, allow_orphaned)
    }
}
