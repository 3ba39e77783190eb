//! Translation resolution: the five-step attempt order (spec §4.7).

use crate::core::hooks::HookBus;
use crate::core::job::JobSettings;
use crate::core::model::{ItemId, Namespace};
use crate::core::store::Store;

/// Outcome of resolving one `(item, lang)` translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    pub fuzzy: bool,
    /// The translator comment carried by the Translation row this came
    /// from, if any (empty for hook-supplied results, which have none).
    pub comment: String,
}

fn is_fuzzy_for_lang(settings: &JobSettings, lang: &str, incoming_fuzzy: bool) -> bool {
    if incoming_fuzzy {
        return true;
    }
    let lang = lang.to_string();
    settings.reuse_as_fuzzy.contains(&lang)
        || (settings.reuse_as_fuzzy_default && !settings.reuse_as_not_fuzzy.contains(&lang))
}

/// Resolve the translation for `(item_id, lang)` of `(string, context)`
/// within `filepath`, trying each attempt in spec order and stopping at the
/// first non-empty result. `disallow_similar_lang` prevents infinite
/// recursion through similar-language fallback (spec §9) — results
/// discovered that way are never written back.
#[allow(clippy::too_many_arguments)]
pub fn resolve_translation(
    store: &mut dyn Store,
    hooks: &HookBus,
    ns: &Namespace,
    filepath: &str,
    item_id: ItemId,
    string: &str,
    context: &str,
    lang: &str,
    settings: &JobSettings,
    disallow_similar_lang: bool,
) -> Resolved {
    if let Some(pre) = hooks.get_translation_pre(string, context, lang) {
        if !pre.is_empty() {
            return Resolved {
                text: pre,
                fuzzy: false,
                comment: String::new(),
            };
        }
    }

    let string_id = store.item(item_id).string_id;
    let string_skip = store.string(string_id).skip;
    if !string_skip {
        if let Some(t_id) = store.find_translation(item_id, lang) {
            let t = store.translation(t_id);
            if !t.string.is_empty() {
                return Resolved {
                    text: t.string,
                    fuzzy: t.fuzzy,
                    comment: t.comment,
                };
            }
        }
    } else {
        return Resolved::default();
    }

    if settings.reuse_translations {
        if let Some(best) = store.find_best_translation(ns, filepath, string, context, lang, false) {
            if !(best.multiple_variants && !settings.reuse_uncertain) {
                let fuzzy = is_fuzzy_for_lang(settings, lang, best.fuzzy);
                store.upsert_translation(item_id, lang, &best.translation, fuzzy, &best.comment);
                return Resolved {
                    text: best.translation,
                    fuzzy,
                    comment: best.comment,
                };
            }
        }
    }

    if let Some(post) = hooks.get_translation(string, context, lang) {
        if !post.is_empty() {
            return Resolved {
                text: post,
                fuzzy: false,
                comment: String::new(),
            };
        }
    }

    if !disallow_similar_lang {
        let mut sources: Vec<(&String, bool)> = settings
            .similar_languages
            .iter()
            .filter(|rule| rule.destination == lang)
            .flat_map(|rule| rule.sources.iter().map(move |s| (s, rule.as_fuzzy)))
            .collect();
        sources.sort_by(|a, b| a.0.cmp(b.0));

        for (source_lang, as_fuzzy) in sources {
            let result = resolve_translation(
                store,
                hooks,
                ns,
                filepath,
                item_id,
                string,
                context,
                source_lang,
                settings,
                true,
            );
            if !result.text.is_empty() {
                return Resolved {
                    text: result.text,
                    fuzzy: result.fuzzy || as_fuzzy,
                    comment: result.comment,
                };
            }
        }
    }

    Resolved::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::SimilarLanguageRule;
    use crate::core::model::{JobId, PropertyKey};
    use crate::core::store::MemoryStore;

    fn ns() -> Namespace {
        Namespace::new("proj")
    }

    #[test]
    fn direct_lookup_wins_when_set() {
        let mut store = MemoryStore::new();
        let file = store.get_or_create_file(&ns(), &JobId::new("j"), "a.txt");
        let s = store.get_or_create_string("Hello", "");
        let item = store.get_or_create_item(file, s);
        store.upsert_translation(item, "fr", "Bonjour", false, "");

        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let resolved = resolve_translation(&mut store, &hooks, &ns(), "a.txt", item, "Hello", "", "fr", &settings, false);
        assert_eq!(resolved.text, "Bonjour");
    }

    #[test]
    fn reuse_applies_fuzzy_default_when_configured() {
        let mut store = MemoryStore::new();
        let file_a = store.get_or_create_file(&ns(), &JobId::new("j"), "a.txt");
        let file_b = store.get_or_create_file(&ns(), &JobId::new("j"), "b.txt");
        let s = store.get_or_create_string("Hello", "");
        let item_a = store.get_or_create_item(file_a, s);
        store.upsert_translation(item_a, "fr", "Bonjour", false, "");
        let item_b = store.get_or_create_item(file_b, s);

        let hooks = HookBus::new();
        let mut settings = JobSettings::default();
        settings.reuse_translations = true;
        settings.reuse_as_fuzzy_default = true;

        let resolved = resolve_translation(&mut store, &hooks, &ns(), "b.txt", item_b, "Hello", "", "fr", &settings, false);
        assert_eq!(resolved.text, "Bonjour");
        assert!(resolved.fuzzy);
        let t_id = store.find_translation(item_b, "fr").unwrap();
        assert_eq!(store.translation(t_id).string, "Bonjour");
    }

    #[test]
    fn reuse_uncertain_false_blocks_multiple_variants() {
        let mut store = MemoryStore::new();
        let file_a = store.get_or_create_file(&ns(), &JobId::new("j"), "a.txt");
        let file_b = store.get_or_create_file(&ns(), &JobId::new("j"), "b.txt");
        let file_c = store.get_or_create_file(&ns(), &JobId::new("j"), "c.txt");
        let s = store.get_or_create_string("Open", "");
        let item_a = store.get_or_create_item(file_a, s);
        store.upsert_translation(item_a, "fr", "Ouvrir", false, "");
        let item_b = store.get_or_create_item(file_b, s);
        store.upsert_translation(item_b, "fr", "Deplier", false, "");
        let item_c = store.get_or_create_item(file_c, s);

        let hooks = HookBus::new();
        let mut settings = JobSettings::default();
        settings.reuse_translations = true;
        settings.reuse_uncertain = false;

        let resolved = resolve_translation(&mut store, &hooks, &ns(), "c.txt", item_c, "Open", "", "fr", &settings, false);
        assert_eq!(resolved.text, "");
        assert!(store.find_translation(item_c, "fr").is_none());
    }

    #[test]
    fn skip_flag_on_string_suppresses_direct_lookup() {
        let mut store = MemoryStore::new();
        let file = store.get_or_create_file(&ns(), &JobId::new("j"), "a.txt");
        let s = store.get_or_create_string("Hello", "");
        let item = store.get_or_create_item(file, s);
        store.upsert_translation(item, "fr", "Bonjour", false, "");
        store.set_string_skip(s, true);

        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let resolved = resolve_translation(&mut store, &hooks, &ns(), "a.txt", item, "Hello", "", "fr", &settings, false);
        assert_eq!(resolved.text, "");
    }

    #[test]
    fn similar_language_fallback_does_not_write_back() {
        let mut store = MemoryStore::new();
        let file = store.get_or_create_file(&ns(), &JobId::new("j"), "a.txt");
        let s = store.get_or_create_string("Hello", "");
        let item = store.get_or_create_item(file, s);
        store.upsert_translation(item, "pt", "Ola", false, "");

        let hooks = HookBus::new();
        let mut settings = JobSettings::default();
        settings.similar_languages.push(SimilarLanguageRule {
            destination: "pt-BR".to_string(),
            sources: vec!["pt".to_string()],
            as_fuzzy: true,
        });

        let resolved = resolve_translation(
            &mut store, &hooks, &ns(), "a.txt", item, "Hello", "", "pt-BR", &settings, false,
        );
        assert_eq!(resolved.text, "Ola");
        assert!(resolved.fuzzy);
        assert!(store.find_translation(item, "pt-BR").is_none());
    }

    #[test]
    fn property_key_unused_import_guard() {
        // keep PropertyKey import meaningful if tests above are trimmed later
        let _ = PropertyKey::Source(crate::core::model::FileId(0)).to_string();
    }
}
