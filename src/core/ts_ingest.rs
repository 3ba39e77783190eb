//! TS file ingestion: read, validate, and apply translations to the store
//! (spec §4.4).

use anyhow::{bail, Result};

use crate::core::diagnostics::Diagnostics;
use crate::core::hooks::{HookBus, TsItemRewrite};
use crate::core::model::{FileId, PropertyKey};
use crate::core::normalize::content_hash;
use crate::core::store::Store;
use crate::core::ts_format::{disambiguation_key, split_into_blocks, parse_block, ParsedBlock, PLURAL_SEPARATOR};

/// Whether ingestion actually ran (`false` means the fast path skipped it
/// because the TS text hash matched the stored one).
pub struct TsIngestOutcome {
    pub ran: bool,
    pub applied: usize,
    pub skipped: usize,
}

/// Join `msgstr`/`msgstr[N]` values back into the single string a
/// `Translation` row stores, mirroring the split `emit_ts_file` applies on
/// the way out (spec §4.5's plural round-trip).
fn resolve_translation_text(parsed: &ParsedBlock) -> String {
    if parsed.msgid_plural.is_some() {
        parsed.msgstr.join(&PLURAL_SEPARATOR.to_string())
    } else {
        parsed.msgstr.first().cloned().unwrap_or_default()
    }
}

/// Ingest one TS file's text for `(file_id, lang)` (spec §4.4). Drops
/// malformed blocks with a diagnostic; a mid-file header-like block with no
/// key is fatal for this file only (spec §7).
pub fn ingest_ts_text(
    store: &mut dyn Store,
    hooks: &HookBus,
    file_id: FileId,
    lang: &str,
    ts_display_path: &str,
    text: &str,
    optimizations_enabled: bool,
    diagnostics: &mut Diagnostics,
) -> Result<TsIngestOutcome> {
    let hash = content_hash(text);
    if optimizations_enabled {
        if let Some(stored) = store.get_property(&PropertyKey::Ts(file_id, lang.to_string())) {
            if stored == hash {
                return Ok(TsIngestOutcome {
                    ran: false,
                    applied: 0,
                    skipped: 0,
                });
            }
        }
    }

    let blocks = split_into_blocks(text);
    let mut applied = 0usize;
    let mut skipped = 0usize;

    for (index, block_lines) in blocks.iter().enumerate() {
        let parsed = parse_block(block_lines);

        if parsed.is_empty_header_candidate() {
            if index == 0 {
                continue;
            }
            bail!(
                "malformed TS file {ts_display_path} [{lang}]: empty block without an ID mid-file"
            );
        }

        let Some(id_key) = &parsed.id_key else {
            diagnostics.push_for_file_lang(ts_display_path, lang, "block missing '#: ID:' reference");
            skipped += 1;
            continue;
        };
        let expected_key = disambiguation_key(&parsed.msgid, &parsed.msgctxt);
        if id_key != &expected_key {
            diagnostics.push_for_file_lang(
                ts_display_path,
                lang,
                format!("block ID {id_key} does not match recomputed key {expected_key}"),
            );
            skipped += 1;
            continue;
        }

        let Some(string_id) = store.find_string(&parsed.msgid, &parsed.msgctxt) else {
            diagnostics.push_for_file_lang(
                ts_display_path,
                lang,
                format!("unknown string '{}' (context '{}')", parsed.msgid, parsed.msgctxt),
            );
            skipped += 1;
            continue;
        };

        let Some(item_id) = store.find_item(file_id, string_id) else {
            diagnostics.push_for_file_lang(ts_display_path, lang, "string not an item of this file");
            skipped += 1;
            continue;
        };

        if store.string(string_id).skip {
            skipped += 1;
            continue;
        }

        let mut rewrite = TsItemRewrite {
            translation: resolve_translation_text(&parsed),
            comment: parsed.translator_comment.clone(),
            fuzzy: parsed.flags.iter().any(|f| f == "fuzzy"),
            item_comment: None,
        };
        hooks.rewrite_parsed_ts_file_item(&mut rewrite);

        if rewrite.translation.is_empty() {
            rewrite.fuzzy = false;
        }

        if let Some(item_comment) = &rewrite.item_comment {
            if store.item(item_id).comment != *item_comment {
                store.set_item_comment(item_id, item_comment);
            }
        }

        if let Some(existing_id) = store.find_translation(item_id, lang) {
            let existing = store.translation(existing_id);
            if existing.merge {
                store.set_translation_merge(existing_id, false);
                skipped += 1;
                continue;
            }
            if existing.string == rewrite.translation
                && existing.comment == rewrite.comment
                && existing.fuzzy == rewrite.fuzzy
            {
                continue;
            }
        } else if rewrite.translation.is_empty() && rewrite.comment.is_empty() {
            skipped += 1;
            continue;
        }

        store.upsert_translation(item_id, lang, &rewrite.translation, rewrite.fuzzy, &rewrite.comment);
        applied += 1;
    }

    store.set_property(&PropertyKey::Ts(file_id, lang.to_string()), &hash);

    Ok(TsIngestOutcome {
        ran: true,
        applied,
        skipped,
    })
}
