//! The job runner: drives scan, extract, TS ingestion, TS emission, and
//! localized emission in order for one job (spec §4.1, §5).

use anyhow::Result;

use crate::core::extract::process_file;
use crate::core::hooks::Phase;
use crate::core::job::Job;
use crate::core::job::JobReport;
use crate::core::localize::localize_file;
use crate::core::model::PropertyKey;
use crate::core::scan::scan_and_reconcile;
use crate::core::ts_emit::emit_ts_file;
use crate::core::ts_ingest::ingest_ts_text;

/// Run `job` end to end, returning the per-phase counters and accumulated
/// diagnostics (spec §4.1). Every pipeline stage runs sequentially to
/// completion; there is no suspension point inside a stage (spec §5).
pub fn run_job(job: &mut Job) -> Result<JobReport> {
    let mut report = JobReport::default();
    job.hooks.fire_lifecycle(Phase::BeforeJob);

    let fingerprint = job.fingerprint()?;
    let stored_fingerprint = job.store.get_property(&PropertyKey::JobHash(job.namespace.clone(), job.job_id.clone()));
    let stored_engine = job.store.get_property(&PropertyKey::JobEngine(job.namespace.clone(), job.job_id.clone()));
    let stored_plugin = job.store.get_property(&PropertyKey::JobPlugin(job.namespace.clone(), job.job_id.clone()));

    let optimizations_enabled = !job.settings.disable_optimizations
        && stored_fingerprint.as_deref() == Some(fingerprint.0.as_str())
        && stored_engine.as_deref() == Some(crate::core::job::ENGINE_VERSION)
        && stored_plugin.as_deref() == Some(job.parser.version());
    report.optimizations_enabled = optimizations_enabled;

    job.store
        .preload_translations_for_job(&job.namespace, &job.job_id, &job.destinations);

    job.hooks.fire_lifecycle(Phase::BeforeUpdateDatabaseFromSourceFiles);

    let scan_outcome = scan_and_reconcile(
        job.store.as_mut(),
        &job.hooks,
        &job.namespace,
        &job.job_id,
        &job.source_root,
        &job.settings.include,
        &job.settings.exclude,
        &mut report.diagnostics,
    )?;
    report.files_renamed = scan_outcome.renamed;
    report.files_scanned = scan_outcome.found.len();

    for file_id in &scan_outcome.no_longer_orphaned {
        job.store.set_file_orphaned(*file_id, false);
    }

    let mut skipped_at_parse = std::collections::HashSet::new();

    if !job.settings.output_only_mode {
        for (relative_path, file_id, absolute_path) in &scan_outcome.found {
            let result = process_file(
                job.store.as_mut(),
                &job.hooks,
                job.parser.as_ref(),
                *file_id,
                relative_path,
                absolute_path,
                job.settings.normalize_strings,
                optimizations_enabled,
                &mut report.diagnostics,
            )?;
            match result {
                Some(outcome) if outcome.skipped_fast_path => {
                    report.files_skipped_fast_path += 1;
                    skipped_at_parse.insert(relative_path.clone());
                }
                Some(_) => {
                    report.files_parsed += 1;
                }
                None => {}
            }
        }

        for file_id in &scan_outcome.orphaned_candidates {
            job.store.set_file_orphaned(*file_id, true);
            report.files_orphaned += 1;
        }
    }

    if !job.settings.output_only_mode && !job.settings.rebuild_ts_files {
        job.hooks.fire_lifecycle(Phase::BeforeUpdateDatabaseFromTsFile);

        for (relative_path, file_id, _) in &scan_outcome.found {
            let languages: Vec<String> = if skipped_at_parse.contains(relative_path) {
                job.modified_languages()
            } else {
                job.destinations.clone()
            };

            for lang in &languages {
                let file_row = job.store.file(*file_id);
                let ts_path = (job.ts_path)(&file_row, lang);
                let Ok(text) = std::fs::read_to_string(&ts_path) else {
                    continue;
                };
                let display_path = ts_path.display().to_string();
                let outcome = ingest_ts_text(
                    job.store.as_mut(),
                    &job.hooks,
                    *file_id,
                    lang,
                    &display_path,
                    &text,
                    optimizations_enabled,
                    &mut report.diagnostics,
                )?;
                if outcome.ran {
                    report.ts_files_ingested += 1;
                }
            }
        }
    }

    job.hooks.fire_lifecycle(Phase::BeforeGenerateTsFiles);

    let mut force_localized: std::collections::HashMap<(crate::core::model::FileId, String), bool> =
        std::collections::HashMap::new();

    for (relative_path, file_id, _) in &scan_outcome.found {
        let languages: Vec<String> = if skipped_at_parse.contains(relative_path) {
            job.modified_languages()
        } else {
            job.destinations.clone()
        };

        for lang in &languages {
            let file_row = job.store.file(*file_id);
            let ts_path = (job.ts_path)(&file_row, lang);
            let outcome = emit_ts_file(
                job.store.as_mut(),
                &job.hooks,
                &job.namespace,
                *file_id,
                relative_path,
                lang,
                &ts_path,
                &job.settings,
                optimizations_enabled,
                &mut report.diagnostics,
            )?;
            if outcome.regenerated {
                report.ts_files_emitted += 1;
            } else {
                report.ts_files_unchanged += 1;
            }
            force_localized.insert((*file_id, lang.clone()), outcome.force_localized);
        }
    }

    if !job.settings.debug_nosave_loc {
        job.hooks.fire_lifecycle(Phase::BeforeGenerateLocalizedFiles);

        for (relative_path, file_id, absolute_path) in &scan_outcome.found {
            let mut languages: Vec<String> = if skipped_at_parse.contains(relative_path) {
                job.modified_languages()
            } else {
                job.destinations.clone()
            };
            if job.settings.output_default_lang_file && !languages.contains(&job.settings.source_language) {
                languages.push(job.settings.source_language.clone());
            }

            for lang in &languages {
                let file_row = job.store.file(*file_id);
                let output_path = (job.output_path)(&file_row, lang);
                let force = force_localized.get(&(*file_id, lang.clone())).copied().unwrap_or(false);
                let outcome = localize_file(
                    job.store.as_mut(),
                    &job.hooks,
                    job.parser.as_ref(),
                    &job.namespace,
                    &job.job_id,
                    *file_id,
                    relative_path,
                    absolute_path,
                    lang,
                    &output_path,
                    &job.settings,
                    force,
                    optimizations_enabled,
                    &mut report.diagnostics,
                )?;
                if outcome.written {
                    report.localized_files_emitted += 1;
                } else {
                    report.localized_files_unchanged += 1;
                }
            }
        }
    }

    job.store.set_property(
        &PropertyKey::JobHash(job.namespace.clone(), job.job_id.clone()),
        &fingerprint.0,
    );
    job.store.set_property(
        &PropertyKey::JobEngine(job.namespace.clone(), job.job_id.clone()),
        crate::core::job::ENGINE_VERSION,
    );
    job.store.set_property(
        &PropertyKey::JobPlugin(job.namespace.clone(), job.job_id.clone()),
        job.parser.version(),
    );

    job.hooks.fire_lifecycle(Phase::AfterJob);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::JobBuilder;
    use crate::core::model::{JobId, Namespace};
    use crate::core::parser::fixture::LineParser;
    use crate::core::store::MemoryStore;
    use std::fs;

    #[test]
    fn full_run_scans_emits_ts_and_localized_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Hello\n").unwrap();
        let ts_root = dir.path().join("ts");
        let out_root = dir.path().join("out");

        let mut job = JobBuilder::new(
            Namespace::new("proj"),
            JobId::new("job-1"),
            dir.path(),
            Box::new(MemoryStore::new()),
        )
        .destinations(["fr"])
        .parser(Box::new(LineParser))
        .ts_path({
            let ts_root = ts_root.clone();
            move |file, lang| ts_root.join(format!("{}.{lang}.ts", file.relative_path))
        })
        .output_path({
            let out_root = out_root.clone();
            move |file, lang| out_root.join(lang).join(&file.relative_path)
        })
        .build()
        .unwrap();

        let report = run_job(&mut job).unwrap();
        assert_eq!(report.files_parsed, 1);
        assert_eq!(report.ts_files_emitted, 1);
        assert_eq!(report.localized_files_emitted, 1);

        assert!(ts_root.join("a.txt.fr.ts").exists());
        assert!(out_root.join("fr/a.txt").exists());
    }

    #[test]
    fn second_run_with_no_changes_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Hello\n").unwrap();
        let ts_root = dir.path().join("ts");
        let out_root = dir.path().join("out");

        let store = Box::new(MemoryStore::new());
        let mut job = JobBuilder::new(Namespace::new("proj"), JobId::new("job-1"), dir.path(), store)
            .destinations(["fr"])
            .parser(Box::new(LineParser))
            .ts_path({
                let ts_root = ts_root.clone();
                move |file, lang| ts_root.join(format!("{}.{lang}.ts", file.relative_path))
            })
            .output_path({
                let out_root = out_root.clone();
                move |file, lang| out_root.join(lang).join(&file.relative_path)
            })
            .build()
            .unwrap();

        run_job(&mut job).unwrap();

        let mut job2 = JobBuilder::new(
            Namespace::new("proj"),
            JobId::new("job-1"),
            dir.path(),
            job.store,
        )
        .destinations(["fr"])
        .parser(Box::new(LineParser))
        .ts_path({
            let ts_root = ts_root.clone();
            move |file, lang| ts_root.join(format!("{}.{lang}.ts", file.relative_path))
        })
        .output_path({
            let out_root = out_root.clone();
            move |file, lang| out_root.join(lang).join(&file.relative_path)
        })
        .build()
        .unwrap();

        let report2 = run_job(&mut job2).unwrap();
        assert_eq!(report2.files_skipped_fast_path, 1);
        assert_eq!(report2.ts_files_unchanged, 1);
    }
}
