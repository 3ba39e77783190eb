//! Parsing and disambiguation glue: the slow path of source processing
//! (spec §4.3).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use unicode_normalization::UnicodeNormalization;

use crate::core::diagnostics::Diagnostics;
use crate::core::hooks::HookBus;
use crate::core::model::{FileId, ItemId, PropertyKey};
use crate::core::normalize::{content_hash, read_and_normalize};
use crate::core::parser::{ExtractAction, ExtractedString, Parser};
use crate::core::store::Store;
use crate::core::ts_format::disambiguation_key;

/// Result of processing one found source file (spec §4.2/§4.3).
pub struct FileProcessResult {
    pub skipped_fast_path: bool,
    /// Ordered item ids, in parser emission order, persisted so TS/localized
    /// emission is stable across runs (spec §3, §5).
    pub item_ids: Vec<ItemId>,
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn nfc_if_non_ascii(s: &str) -> String {
    if s.is_ascii() {
        s.to_string()
    } else {
        s.nfc().collect()
    }
}

/// Process one source file: fast-path restore from stored properties if
/// its content hash hasn't changed and optimizations are enabled,
/// otherwise invoke the parser and disambiguate/record every string (spec
/// §4.3). Returns `Ok(None)` if a hook vetoed the file or the parser
/// failed; in both cases the file's existing store state is left
/// untouched (spec §4.2, §7).
#[allow(clippy::too_many_arguments)]
pub fn process_file(
    store: &mut dyn Store,
    hooks: &HookBus,
    parser: &dyn Parser,
    file_id: FileId,
    relative_path: &str,
    absolute_path: &Path,
    normalize_strings: bool,
    optimizations_enabled: bool,
    diagnostics: &mut Diagnostics,
) -> Result<Option<FileProcessResult>> {
    if !hooks.can_process_source_file(relative_path) {
        diagnostics.push_for_file(relative_path, "vetoed by can_process_source_file hook");
        return Ok(None);
    }

    let bytes = fs::read(absolute_path)?;
    let (text, _encoding) = read_and_normalize(&bytes);

    if !hooks.after_load_source_file_for_processing(relative_path, &text) {
        diagnostics.push_for_file(relative_path, "vetoed by after_load_source_file_for_processing hook");
        return Ok(None);
    }

    let current_hash = content_hash(&text);

    if optimizations_enabled {
        if let Some(stored_hash) = store.get_property(&PropertyKey::Source(file_id)) {
            if stored_hash == current_hash {
                if let Some(items_csv) = store.get_property(&PropertyKey::Items(file_id)) {
                    let item_ids: Vec<ItemId> = items_csv
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .filter_map(|s| s.parse::<u64>().ok())
                        .map(ItemId)
                        .collect();
                    return Ok(Some(FileProcessResult {
                        skipped_fast_path: true,
                        item_ids,
                    }));
                }
            }
        }
    }

    let mut seen_keys: HashMap<String, ()> = HashMap::new();
    let mut seen_source_keys: HashMap<String, ()> = HashMap::new();
    let mut item_ids: Vec<ItemId> = Vec::new();
    let mut parse_error: Option<anyhow::Error> = None;

    {
        let mut on_string = |extracted: &ExtractedString| -> ExtractAction {
            let mut string = extracted.string.clone();
            if !string.is_empty() {
                let force_normalize = extracted.flags.iter().any(|f| f == "normalize");
                let skip_normalize = extracted.flags.iter().any(|f| f == "dont-normalize");
                if force_normalize || (normalize_strings && !skip_normalize) {
                    string = normalize_whitespace(&string);
                }
            }
            if string.is_empty() {
                return ExtractAction::Drop;
            }

            string = nfc_if_non_ascii(&string);
            let mut context = nfc_if_non_ascii(&extracted.context);
            let hint = nfc_if_non_ascii(&extracted.hint);

            let mut key = disambiguation_key(&string, &context);
            if seen_keys.contains_key(&key) {
                if !extracted.source_key.is_empty() {
                    if seen_source_keys.contains_key(&extracted.source_key) {
                        diagnostics.push_for_file(
                            relative_path,
                            format!("source_key '{}' collides within file", extracted.source_key),
                        );
                    }
                    context = extracted.source_key.clone();
                } else if !hint.is_empty() {
                    context = hint.clone();
                } else {
                    let mut suffix = 1u32;
                    loop {
                        let candidate = format!("{context}.{suffix}");
                        let candidate_key = disambiguation_key(&string, &candidate);
                        if !seen_keys.contains_key(&candidate_key) {
                            context = candidate;
                            break;
                        }
                        suffix += 1;
                    }
                }
                key = disambiguation_key(&string, &context);
            }
            if !extracted.source_key.is_empty() {
                seen_source_keys.insert(extracted.source_key.clone(), ());
            }
            seen_keys.insert(key, ());

            if !hooks.can_extract(&string) {
                return ExtractAction::Drop;
            }

            let string_id = store.get_or_create_string(&string, &context);
            let item_id = store.get_or_create_item(file_id, string_id);
            item_ids.push(item_id);

            if store.item(item_id).hint != hint {
                store.set_item_hint(item_id, &hint);
            }
            if let Some(plural) = &extracted.plural {
                let plural_nfc = nfc_if_non_ascii(plural);
                if store.item(item_id).plural.as_deref() != Some(plural_nfc.as_str()) {
                    store.set_item_plural(item_id, Some(plural_nfc));
                }
            }

            ExtractAction::Keep
        };

        if let Err(e) = parser.extract(&text, &mut on_string) {
            parse_error = Some(e);
        }
    }

    if let Some(e) = parse_error {
        diagnostics.push_for_file(relative_path, format!("parse error: {e}"));
        return Ok(None);
    }

    let old_items: Vec<ItemId> = store
        .get_property(&PropertyKey::Items(file_id))
        .map(|csv| {
            csv.split(',')
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.parse::<u64>().ok())
                .map(ItemId)
                .collect()
        })
        .unwrap_or_default();

    let allow_orphaning = hooks.is_file_orphaned(relative_path);
    for old_id in &old_items {
        if !item_ids.contains(old_id) && allow_orphaning {
            store.set_item_orphaned(*old_id, true);
        }
    }
    for new_id in &item_ids {
        store.set_item_orphaned(*new_id, false);
    }

    let items_csv = item_ids.iter().map(|id| id.0.to_string()).collect::<Vec<_>>().join(",");
    store.set_property(&PropertyKey::Source(file_id), &current_hash);
    store.set_property(&PropertyKey::Hash(file_id), &content_hash(&text));
    store.set_property(&PropertyKey::Size(file_id), &bytes.len().to_string());
    store.set_property(&PropertyKey::Items(file_id), &items_csv);

    Ok(Some(FileProcessResult {
        skipped_fast_path: false,
        item_ids,
    }))
}
