//! Cross-file translation reuse scenarios (spec §8 "concrete scenarios").

use std::fs;

use locsync::core::model::{JobId, Namespace};
use locsync::core::parser::fixture::LineParser;
use locsync::core::{Job, JobBuilder, JobSettings, MemoryStore, Store};

fn build_job<'a>(
    dir: &std::path::Path,
    ts_root: std::path::PathBuf,
    out_root: std::path::PathBuf,
    store: Box<dyn Store>,
    settings: JobSettings,
) -> Job<'a> {
    JobBuilder::new(Namespace::new("proj"), JobId::new("job-1"), dir, store)
        .destinations(["fr"])
        .parser(Box::new(LineParser))
        .settings(settings)
        .ts_path({
            let ts_root = ts_root.clone();
            move |file, lang| ts_root.join(format!("{}.{lang}.ts", file.relative_path))
        })
        .output_path({
            let out_root = out_root.clone();
            move |file, lang| out_root.join(lang).join(&file.relative_path)
        })
        .build()
        .unwrap()
}

/// Hand-translate the one non-header item block for `text` in a TS file on
/// disk, bypassing the parser (there being no concrete translation-entry UI
/// in this crate, per spec §1's Non-goals).
fn hand_translate(ts_path: &std::path::Path, text: &str, translation: &str) {
    let original = fs::read_to_string(ts_path).unwrap();
    let needle = format!("msgid \"{text}\"\nmsgstr \"\"");
    let replacement = format!("msgid \"{text}\"\nmsgstr \"{translation}\"");
    let translated = original.replacen(&needle, &replacement, 1);
    assert_ne!(original, translated, "expected item block for {text:?} not found");
    fs::write(ts_path, translated).unwrap();
}

#[test]
fn fuzzy_reuse_across_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "Hello\n").unwrap();
    let ts_root = dir.path().join("ts");
    let out_root = dir.path().join("out");

    let mut job = build_job(
        dir.path(),
        ts_root.clone(),
        out_root.clone(),
        Box::new(MemoryStore::new()),
        JobSettings::default(),
    );
    locsync::core::run_job(&mut job).unwrap();
    hand_translate(&ts_root.join("a.txt.fr.ts"), "Hello", "Bonjour");

    let mut job2 = build_job(
        dir.path(),
        ts_root.clone(),
        out_root.clone(),
        job.store,
        JobSettings::default(),
    );
    locsync::core::run_job(&mut job2).unwrap();

    fs::write(dir.path().join("b.txt"), "Hello\n").unwrap();
    let settings = JobSettings {
        reuse_translations: true,
        reuse_as_fuzzy_default: true,
        ..Default::default()
    };
    let mut job3 = build_job(dir.path(), ts_root.clone(), out_root.clone(), job2.store, settings);
    locsync::core::run_job(&mut job3).unwrap();

    let b_ts = fs::read_to_string(ts_root.join("b.txt.fr.ts")).unwrap();
    assert!(b_ts.contains("msgstr \"Bonjour\""));
    assert!(b_ts.contains("#, fuzzy"));
}

#[test]
fn skip_reuse_when_uncertain() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "Open\n").unwrap();
    fs::write(dir.path().join("b.txt"), "Open\n").unwrap();
    let ts_root = dir.path().join("ts");
    let out_root = dir.path().join("out");

    let mut job = build_job(
        dir.path(),
        ts_root.clone(),
        out_root.clone(),
        Box::new(MemoryStore::new()),
        JobSettings::default(),
    );
    locsync::core::run_job(&mut job).unwrap();
    hand_translate(&ts_root.join("a.txt.fr.ts"), "Open", "Ouvrir");
    hand_translate(&ts_root.join("b.txt.fr.ts"), "Open", "D\u{e9}plier");

    let mut job2 = build_job(
        dir.path(),
        ts_root.clone(),
        out_root.clone(),
        job.store,
        JobSettings::default(),
    );
    locsync::core::run_job(&mut job2).unwrap();

    fs::write(dir.path().join("c.txt"), "Open\n").unwrap();
    let settings = JobSettings {
        reuse_translations: true,
        reuse_uncertain: false,
        ..Default::default()
    };
    let mut job3 = build_job(dir.path(), ts_root.clone(), out_root.clone(), job2.store, settings);
    locsync::core::run_job(&mut job3).unwrap();

    let c_ts = fs::read_to_string(ts_root.join("c.txt.fr.ts")).unwrap();
    assert!(c_ts.contains("msgid \"Open\"\nmsgstr \"\""));
    assert!(!c_ts.contains("#, fuzzy"));
}
