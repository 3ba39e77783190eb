//! Localized output file emission (spec §4.6).

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::Result;
use unicode_normalization::UnicodeNormalization;
use unicode_width::UnicodeWidthStr;

use crate::core::diagnostics::Diagnostics;
use crate::core::hooks::HookBus;
use crate::core::job::{JobSettings, OutputEncoding};
use crate::core::model::{FileId, JobId, Namespace, PropertyKey};
use crate::core::normalize::{content_hash, read_and_normalize};
use crate::core::parser::{ExtractedString, Parser};
use crate::core::store::Store;
use crate::core::translate::resolve_translation;
use crate::core::ts_format::disambiguation_key;

/// Outcome of one `localize_file` call.
pub struct LocalizeOutcome {
    pub rendered: bool,
    pub written: bool,
}

fn mtime_stamp(path: &Path) -> Option<String> {
    let meta = fs::metadata(path).ok()?;
    let modified = meta.modified().ok()?;
    let dur = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(format!("{}.{:09}", dur.as_secs(), dur.subsec_nanos()))
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

fn java_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut buf = [0u16; 2];
    for ch in text.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Encode `text` to the job's configured output encoding, BOM included if
/// requested (spec §4.6). `encoding_rs` refuses to encode *to* UTF-16 (the
/// WHATWG spec treats UTF-16 as decode-only), so the UTF-16/32 paths are
/// hand-rolled here, symmetric with `normalize::decode_utf16`/`decode_utf32`.
fn encode_output(text: &str, encoding: OutputEncoding, bom: bool) -> Vec<u8> {
    match encoding {
        OutputEncoding::Utf8 => {
            let mut out = Vec::with_capacity(text.len() + 3);
            if bom {
                out.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
            }
            out.extend_from_slice(text.as_bytes());
            out
        }
        OutputEncoding::Utf16Le => {
            let mut out = Vec::new();
            if bom {
                out.extend_from_slice(&[0xFF, 0xFE]);
            }
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
        OutputEncoding::Utf16Be => {
            let mut out = Vec::new();
            if bom {
                out.extend_from_slice(&[0xFE, 0xFF]);
            }
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
            out
        }
        OutputEncoding::Utf32Le => {
            let mut out = Vec::new();
            if bom {
                out.extend_from_slice(&[0xFF, 0xFE, 0x00, 0x00]);
            }
            for ch in text.chars() {
                out.extend_from_slice(&(ch as u32).to_le_bytes());
            }
            out
        }
        OutputEncoding::Utf32Be => {
            let mut out = Vec::new();
            if bom {
                out.extend_from_slice(&[0x00, 0x00, 0xFE, 0xFF]);
            }
            for ch in text.chars() {
                out.extend_from_slice(&(ch as u32).to_be_bytes());
            }
            out
        }
        OutputEncoding::Java => java_escape(text).into_bytes(),
    }
}

/// Render (and, if still warranted after the second gate, write) the
/// localized output for `(file_id, lang)` at `target_path` (spec §4.6).
/// `force` comes from TS emission's USN-change flag (spec §4.5).
/// `optimizations_enabled` comes from the job-wide fingerprint/engine/
/// plugin-version check (spec §4.1): when it's `false`, everything
/// regenerates regardless of `settings.disable_optimizations`.
#[allow(clippy::too_many_arguments)]
pub fn localize_file(
    store: &mut dyn Store,
    hooks: &HookBus,
    parser: &dyn Parser,
    ns: &Namespace,
    job_id: &JobId,
    file_id: FileId,
    relative_path: &str,
    source_path: &Path,
    lang: &str,
    target_path: &Path,
    settings: &JobSettings,
    force: bool,
    optimizations_enabled: bool,
    diagnostics: &mut Diagnostics,
) -> Result<LocalizeOutcome> {
    let target_exists = target_path.exists();
    let current_mtime = mtime_stamp(target_path);
    let stored_mtime = store.get_property(&PropertyKey::TargetMtime(file_id, job_id.clone(), lang.to_string()));
    let source_hash = store.get_property(&PropertyKey::Source(file_id));
    let stored_source_for_target =
        store.get_property(&PropertyKey::SourceForTarget(file_id, job_id.clone(), lang.to_string()));
    let ts_hash = store.get_property(&PropertyKey::Ts(file_id, lang.to_string()));
    let stored_ts_for_target =
        store.get_property(&PropertyKey::SourceTsForTarget(file_id, job_id.clone(), lang.to_string()));

    let skip = optimizations_enabled
        && !force
        && target_exists
        && current_mtime == stored_mtime
        && source_hash == stored_source_for_target
        && ts_hash == stored_ts_for_target;

    if skip {
        return Ok(LocalizeOutcome {
            rendered: false,
            written: false,
        });
    }

    let bytes = fs::read(source_path)?;
    let (text, _encoding) = read_and_normalize(&bytes);

    let mut seen_keys: HashMap<String, ()> = HashMap::new();
    let mut seen_source_keys: HashMap<String, ()> = HashMap::new();

    let mut on_string = |extracted: &ExtractedString| -> String {
        let mut string = extracted.string.clone();
        if !string.is_empty() {
            let force_normalize = extracted.flags.iter().any(|f| f == "normalize");
            let skip_normalize = extracted.flags.iter().any(|f| f == "dont-normalize");
            if force_normalize || (settings.normalize_strings && !skip_normalize) {
                string = normalize_whitespace(&string);
            }
        }
        if string.is_empty() {
            return extracted.string.clone();
        }

        string = nfc_if_non_ascii(&string);
        let mut context = nfc_if_non_ascii(&extracted.context);

        let mut key = disambiguation_key(&string, &context);
        if seen_keys.contains_key(&key) {
            if !extracted.source_key.is_empty() {
                context = extracted.source_key.clone();
            } else if !extracted.hint.is_empty() {
                context = nfc_if_non_ascii(&extracted.hint);
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

        let Some(string_id) = store.find_string(&string, &context) else {
            return extracted.string.clone();
        };
        let Some(item_id) = store.find_item(file_id, string_id) else {
            return extracted.string.clone();
        };

        let resolved = resolve_translation(
            store, hooks, ns, relative_path, item_id, &string, &context, lang, settings, false,
        );

        let mut translation = if resolved.text.is_empty() {
            extracted.string.clone()
        } else {
            resolved.text
        };

        if hooks.rewrite_translation(&mut translation, lang) {
            translation = nfc_if_non_ascii(&translation);
        }

        if let Some(width_str) = extracted.flags.iter().find_map(|f| f.strip_prefix("pad:")) {
            if let Ok(width) = width_str.parse::<usize>() {
                while translation.width() < width {
                    translation.push(' ');
                }
            }
        }

        translation
    };

    let rendered = match parser.render(&text, lang, &mut on_string) {
        Ok(r) => r,
        Err(e) => {
            diagnostics.push_for_file_lang(relative_path, lang, format!("render error: {e}"));
            return Ok(LocalizeOutcome {
                rendered: false,
                written: false,
            });
        }
    };

    let new_hash = content_hash(&rendered);
    let stored_target_hash = store.get_property(&PropertyKey::Target(file_id, job_id.clone(), lang.to_string()));
    let should_write = !optimizations_enabled
        || stored_target_hash.as_deref() != Some(new_hash.as_str())
        || current_mtime != stored_mtime;

    if should_write {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encoded = encode_output(&rendered, settings.output_encoding, settings.output_bom);
        fs::write(target_path, &encoded)?;

        store.set_property(&PropertyKey::Target(file_id, job_id.clone(), lang.to_string()), &new_hash);
        if let Some(new_mtime) = mtime_stamp(target_path) {
            store.set_property(
                &PropertyKey::TargetMtime(file_id, job_id.clone(), lang.to_string()),
                &new_mtime,
            );
        }
        if let Some(h) = &source_hash {
            store.set_property(&PropertyKey::SourceForTarget(file_id, job_id.clone(), lang.to_string()), h);
        }
        if let Some(h) = &ts_hash {
            store.set_property(&PropertyKey::SourceTsForTarget(file_id, job_id.clone(), lang.to_string()), h);
        }
    }

    Ok(LocalizeOutcome {
        rendered: true,
        written: should_write,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::fixture::LineParser;
    use crate::core::store::MemoryStore;
    use std::fs;

    fn ns() -> Namespace {
        Namespace::new("proj")
    }
    fn job() -> JobId {
        JobId::new("job-1")
    }

    #[test]
    fn renders_translation_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "Hello\n").unwrap();
        let target = dir.path().join("fr/a.txt");

        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        let string_id = store.get_or_create_string("Hello", "");
        let item_id = store.get_or_create_item(file_id, string_id);
        store.upsert_translation(item_id, "fr", "Bonjour", false, "");
        store.set_property(&PropertyKey::Source(file_id), &content_hash("Hello\n"));

        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        let outcome = localize_file(
            &mut store, &hooks, &LineParser, &ns(), &job(), file_id, "a.txt", &source, "fr", &target,
            &settings, false, true, &mut diagnostics,
        )
        .unwrap();

        assert!(outcome.written);
        let text = fs::read_to_string(&target).unwrap();
        assert_eq!(text.trim(), "Bonjour");
    }

    #[test]
    fn falls_back_to_original_when_no_translation() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "Hello\n").unwrap();
        let target = dir.path().join("fr/a.txt");

        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");

        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        localize_file(
            &mut store, &hooks, &LineParser, &ns(), &job(), file_id, "a.txt", &source, "fr", &target,
            &settings, false, true, &mut diagnostics,
        )
        .unwrap();

        let text = fs::read_to_string(&target).unwrap();
        assert_eq!(text.trim(), "Hello");
    }

    #[test]
    fn skips_rewrite_when_nothing_changed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "Hello\n").unwrap();
        let target = dir.path().join("fr/a.txt");

        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        store.set_property(&PropertyKey::Source(file_id), &content_hash("Hello\n"));

        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        localize_file(
            &mut store, &hooks, &LineParser, &ns(), &job(), file_id, "a.txt", &source, "fr", &target,
            &settings, false, true, &mut diagnostics,
        )
        .unwrap();

        let second = localize_file(
            &mut store, &hooks, &LineParser, &ns(), &job(), file_id, "a.txt", &source, "fr", &target,
            &settings, false, true, &mut diagnostics,
        )
        .unwrap();
        assert!(!second.rendered);
    }

    #[test]
    fn stale_optimizations_flag_forces_rewrite_even_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "Hello\n").unwrap();
        let target = dir.path().join("fr/a.txt");

        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        store.set_property(&PropertyKey::Source(file_id), &content_hash("Hello\n"));

        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        localize_file(
            &mut store, &hooks, &LineParser, &ns(), &job(), file_id, "a.txt", &source, "fr", &target,
            &settings, false, true, &mut diagnostics,
        )
        .unwrap();

        let second = localize_file(
            &mut store, &hooks, &LineParser, &ns(), &job(), file_id, "a.txt", &source, "fr", &target,
            &settings, false, false, &mut diagnostics,
        )
        .unwrap();
        assert!(second.rendered);
        assert!(second.written);
    }

    #[test]
    fn pad_flag_pads_to_display_width_not_char_count() {
        struct PadParser;
        impl Parser for PadParser {
            fn name(&self) -> &str {
                "pad-fixture"
            }
            fn version(&self) -> &str {
                "1"
            }
            fn extract(
                &self,
                _buffer: &str,
                on_string: &mut dyn FnMut(&ExtractedString) -> crate::core::parser::ExtractAction,
            ) -> Result<()> {
                on_string(&ExtractedString {
                    string: "X".into(),
                    flags: vec!["pad:4".into()],
                    ..Default::default()
                });
                Ok(())
            }
            fn render(
                &self,
                _buffer: &str,
                _lang: &str,
                on_string: &mut dyn FnMut(&ExtractedString) -> String,
            ) -> Result<String> {
                Ok(on_string(&ExtractedString {
                    string: "X".into(),
                    flags: vec!["pad:4".into()],
                    ..Default::default()
                }))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "X\n").unwrap();
        let target = dir.path().join("fr/a.txt");

        let mut store = MemoryStore::new();
        let file_id = store.get_or_create_file(&ns(), &job(), "a.txt");
        let string_id = store.get_or_create_string("X", "");
        let item_id = store.get_or_create_item(file_id, string_id);
        // A double-width CJK character: 1 char, display width 2.
        store.upsert_translation(item_id, "fr", "\u{65e5}", false, "");

        let hooks = HookBus::new();
        let settings = JobSettings::default();
        let mut diagnostics = Diagnostics::new();

        localize_file(
            &mut store, &hooks, &PadParser, &ns(), &job(), file_id, "a.txt", &source, "fr", &target,
            &settings, false, true, &mut diagnostics,
        )
        .unwrap();

        let text = fs::read_to_string(&target).unwrap();
        let line = text.lines().next().unwrap();
        assert_eq!(line.width(), 4);
        assert_eq!(line.chars().count(), 3);
    }

    #[test]
    fn java_encoding_escapes_non_ascii() {
        let encoded = encode_output("caf\u{e9}", OutputEncoding::Java, false);
        assert_eq!(String::from_utf8(encoded).unwrap(), "caf\\u00e9");
    }

    #[test]
    fn utf16_le_bom_round_trips_through_read_and_normalize() {
        let encoded = encode_output("hi", OutputEncoding::Utf16Le, true);
        let (decoded, enc) = read_and_normalize(&encoded);
        assert_eq!(decoded, "hi");
        assert_eq!(enc, crate::core::normalize::DetectedEncoding::Utf16Le);
    }
}
