//! TS file emission: regenerate gettext-style interchange files from the
//! store (spec §4.5).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::core::diagnostics::Diagnostics;
use crate::core::hooks::HookBus;
use crate::core::job::{JobSettings, ENGINE_VERSION};
use crate::core::model::{FileId, ItemId, ItemRow, Namespace, PropertyKey, StringRow, Usn};
use crate::core::normalize::content_hash;
use crate::core::store::Store;
use crate::core::translate::{resolve_translation, Resolved};
use crate::core::ts_format::{disambiguation_key, render_field, PLURAL_SEPARATOR};

/// Outcome of one `emit_ts_file` call.
pub struct TsEmitOutcome {
    pub regenerated: bool,
    /// Whether the USN changed, which forces localized re-emission for
    /// this `(file, lang)` regardless of its own gating (spec §4.5).
    pub force_localized: bool,
    pub item_count: usize,
}

fn parse_items_csv(csv: &str) -> Vec<ItemId> {
    csv.split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u64>().ok())
        .map(ItemId)
        .collect()
}

fn ordered_items(store: &dyn Store, file_id: FileId) -> Vec<ItemId> {
    store
        .get_property(&PropertyKey::Items(file_id))
        .map(|csv| parse_items_csv(&csv))
        .unwrap_or_default()
}

fn stored_usn(store: &dyn Store, file_id: FileId, lang: &str) -> Usn {
    store
        .get_property(&PropertyKey::Usn(file_id, lang.to_string()))
        .and_then(|s| s.parse::<u64>().ok())
        .map(Usn)
        .unwrap_or_default()
}

/// Maximum USN over `lang` and every similar-language source feeding it
/// (spec §4.5: "current_usn = maximum USN over the file's items/
/// translations for lang *and* all similar-language sources of lang").
fn current_usn_for(store: &dyn Store, file_id: FileId, lang: &str, settings: &JobSettings) -> Usn {
    let mut usn = store.highest_usn_for_file_lang(file_id, lang);
    for rule in &settings.similar_languages {
        if rule.destination == lang {
            for source in &rule.sources {
                let source_usn = store.highest_usn_for_file_lang(file_id, source);
                if source_usn > usn {
                    usn = source_usn;
                }
            }
        }
    }
    usn
}

fn header(lang: &str) -> String {
    format!(
        "msgid \"\"\nmsgstr \"\"\n\"Content-Type: text/plain; charset=UTF-8\\n\"\n\"Content-Transfer-Encoding: 8bit\\n\"\n\"Language: {lang}\\n\"\n\"Generated-By: {ENGINE_VERSION}\\n\"\n"
    )
}

fn dev_comment_lines(item: &ItemRow, string: &StringRow) -> Vec<String> {
    let mut lines = Vec::new();
    if !item.hint.is_empty() && item.hint != string.text {
        lines.push(item.hint.clone());
    }
    if !item.comment.is_empty() {
        lines.push(item.comment.clone());
    }
    lines
}

/// Build one item's block text (spec §4.5 step 3/4), or `None` if the
/// string or a `can_translate` veto drops it.
fn render_item_block(item: &ItemRow, string: &StringRow, relative_path: &str, resolved: &Resolved) -> String {
    let mut out = String::new();

    if !resolved.comment.is_empty() {
        for line in resolved.comment.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    for line in dev_comment_lines(item, string) {
        out.push_str("#. ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("#: File: ");
    out.push_str(relative_path);
    out.push('\n');
    out.push_str("#: ID: ");
    out.push_str(&disambiguation_key(&string.text, &string.context));
    out.push('\n');
    if resolved.fuzzy {
        out.push_str("#, fuzzy\n");
    }
    if !string.context.is_empty() {
        out.push_str(&render_field("msgctxt", &string.context));
        out.push('\n');
    }

    let plural_variants: Vec<&str> = resolved.text.split(PLURAL_SEPARATOR).collect();
    if let Some(plural) = &item.plural {
        out.push_str(&render_field("msgid", &string.text));
        out.push('\n');
        out.push_str(&render_field("msgid_plural", plural));
        out.push('\n');
        if plural_variants.len() > 1 {
            for (i, variant) in plural_variants.iter().enumerate() {
                out.push_str(&render_field(&format!("msgstr[{i}]"), variant));
                out.push('\n');
            }
        } else {
            out.push_str(&render_field("msgstr[0]", &resolved.text));
            out.push('\n');
        }
    } else {
        out.push_str(&render_field("msgid", &string.text));
        out.push('\n');
        out.push_str(&render_field("msgstr", &resolved.text));
        out.push('\n');
    }

    out
}

/// Emit (or skip regenerating) the TS file for `(file_id, lang)` at
/// `target_path`, per the gate and assembly order in spec §4.5.
/// `optimizations_enabled` comes from the job-wide fingerprint/engine/
/// plugin-version check (spec §4.1): when it's `false`, everything
/// regenerates regardless of `settings.disable_optimizations`.
#[allow(clippy::too_many_arguments)]
pub fn emit_ts_file(
    store: &mut dyn Store,
    hooks: &HookBus,
    ns: &Namespace,
    file_id: FileId,
    relative_path: &str,
    lang: &str,
    target_path: &Path,
    settings: &JobSettings,
    optimizations_enabled: bool,
    diagnostics: &mut Diagnostics,
) -> Result<TsEmitOutcome> {
    let current_usn = current_usn_for(store, file_id, lang, settings);
    let target_exists = target_path.exists();
    let usn_changed = current_usn != stored_usn(store, file_id, lang);
    let regenerate = !optimizations_enabled || settings.rebuild_ts_files || !target_exists || usn_changed;

    if !regenerate {
        return Ok(TsEmitOutcome {
            regenerated: false,
            force_localized: false,
            item_count: 0,
        });
    }

    let item_ids = ordered_items(store, file_id);
    let mut seen: HashSet<ItemId> = HashSet::new();
    let mut body = String::new();
    let mut count = 0usize;

    for item_id in item_ids {
        if !seen.insert(item_id) {
            diagnostics.push_for_file_lang(
                relative_path,
                lang,
                format!("item {} repeated in stored item order", item_id.0),
            );
            continue;
        }

        let item = store.item(item_id);
        let string = store.string(item.string_id);
        if string.skip {
            continue;
        }

        let resolved = resolve_translation(
            store,
            hooks,
            ns,
            relative_path,
            item_id,
            &string.text,
            &string.context,
            lang,
            settings,
            false,
        );

        if !hooks.can_translate(&string.text) {
            continue;
        }

        body.push_str(&render_item_block(&item, &string, relative_path, &resolved));
        body.push('\n');
        count += 1;
    }

    let mut text = header(lang);
    text.push('\n');
    text.push_str(&body);

    let new_hash = content_hash(&text);
    let stored_hash = store.get_property(&PropertyKey::Ts(file_id, lang.to_string()));
    let should_write = !optimizations_enabled
        || settings.rebuild_ts_files
        || !target_exists
        || stored_hash.as_deref() != Some(new_hash.as_str());

    if should_write {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target_path, &text)?;
    }

    store.set_property(&PropertyKey::TsCount(file_id, lang.to_string()), &count.to_string());
    store.set_property(&PropertyKey::Ts(file_id, lang.to_string()), &new_hash);
    store.set_property(&PropertyKey::Usn(file_id, lang.to_string()), &current_usn.0.to_string());

    Ok(TsEmitOutcome {
        regenerated: true,
        force_localized: usn_changed,
        item_count: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::JobId;
    use crate::core::store::MemoryStore;

    fn ns() -> Namespace {
        Namespace::new("proj")
    }
    fn job() -> JobId {
        JobId::new("job-1")
    }

    #[test]
    fn emits_header_and_item_block() {
        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        let string_id = store.get_or_create_string("Hello", "greeting");
        let item_id = store.get_or_create_item(file_id, string_id);
        store.set_property(&PropertyKey::Items(file_id), &item_id.0.to_string());
        store.upsert_translation(item_id, "fr", "Bonjour", false, "");

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.fr.ts");
        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        let outcome = emit_ts_file(
            &mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, true, &mut diagnostics,
        )
        .unwrap();

        assert!(outcome.regenerated);
        assert_eq!(outcome.item_count, 1);
        let text = fs::read_to_string(&target).unwrap();
        assert!(text.contains("Language: fr"));
        assert!(text.contains("msgctxt \"greeting\""));
        assert!(text.contains("msgid \"Hello\""));
        assert!(text.contains("msgstr \"Bonjour\""));
    }

    #[test]
    fn skips_regeneration_when_usn_unchanged_and_target_exists() {
        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        let string_id = store.get_or_create_string("Hello", "");
        let item_id = store.get_or_create_item(file_id, string_id);
        store.set_property(&PropertyKey::Items(file_id), &item_id.0.to_string());

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.fr.ts");
        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        emit_ts_file(&mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, true, &mut diagnostics)
            .unwrap();
        let second = emit_ts_file(
            &mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, true, &mut diagnostics,
        )
        .unwrap();

        assert!(!second.regenerated);
    }

    #[test]
    fn stale_optimizations_flag_forces_regeneration_even_with_unchanged_usn() {
        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        let string_id = store.get_or_create_string("Hello", "");
        let item_id = store.get_or_create_item(file_id, string_id);
        store.set_property(&PropertyKey::Items(file_id), &item_id.0.to_string());

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.fr.ts");
        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        emit_ts_file(&mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, true, &mut diagnostics)
            .unwrap();
        let second = emit_ts_file(
            &mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, false, &mut diagnostics,
        )
        .unwrap();

        assert!(second.regenerated);
    }

    #[test]
    fn translation_write_bumps_usn_and_forces_regeneration() {
        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        let string_id = store.get_or_create_string("Hello", "");
        let item_id = store.get_or_create_item(file_id, string_id);
        store.set_property(&PropertyKey::Items(file_id), &item_id.0.to_string());

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.fr.ts");
        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        emit_ts_file(&mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, true, &mut diagnostics)
            .unwrap();
        store.upsert_translation(item_id, "fr", "Bonjour", false, "");

        let second = emit_ts_file(
            &mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, true, &mut diagnostics,
        )
        .unwrap();
        assert!(second.regenerated);
        assert!(second.force_localized);
    }

    #[test]
    fn dropped_item_skipped_string_is_absent_from_output() {
        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        let string_id = store.get_or_create_string("Secret", "");
        store.set_string_skip(string_id, true);
        let item_id = store.get_or_create_item(file_id, string_id);
        store.set_property(&PropertyKey::Items(file_id), &item_id.0.to_string());

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.fr.ts");
        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        let outcome = emit_ts_file(
            &mut store, &hooks, &ns(), file_id, "a.txt", "fr", &target, &settings, true, &mut diagnostics,
        )
        .unwrap();
        assert_eq!(outcome.item_count, 0);
        let text = fs::read_to_string(&target).unwrap();
        assert!(!text.contains("Secret"));
    }
}
