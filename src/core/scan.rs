//! Source tree scan and rename reconciliation (spec §4.2).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use glob::Pattern;
use walkdir::WalkDir;

use crate::core::diagnostics::Diagnostics;
use crate::core::hooks::HookBus;
use crate::core::model::{FileId, JobId, Namespace, PropertyKey};
use crate::core::normalize::{content_hash, read_and_normalize};
use crate::core::store::Store;

/// Outcome of one scan-and-reconcile pass. Orphan flags are not flipped
/// here: parsing may additionally assert a file orphaned (spec §4.2), so
/// the pipeline driver flips flags once after parsing completes.
pub struct ScanOutcome {
    /// `(relative_path, file_id, absolute_path)`, sorted by relative path
    /// (spec §5: "sort lexicographically on relative path").
    pub found: Vec<(String, FileId, PathBuf)>,
    /// Known to the store as non-orphaned, not found this run.
    pub orphaned_candidates: Vec<FileId>,
    /// Known to the store as orphaned, found again this run.
    pub no_longer_orphaned: Vec<FileId>,
    pub renamed: usize,
}

fn matches_any(patterns: &[Pattern], path: &str) -> bool {
    patterns.iter().any(|p| p.matches(path))
}

fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs.iter().filter_map(|g| Pattern::new(g).ok()).collect()
}

/// Walk `source_root`, apply include/exclude filters and the
/// `rewrite_path` hook, and return the resulting relative-path → absolute
/// path map (pre-reconciliation).
fn walk_source_tree(
    source_root: &Path,
    include: &[String],
    exclude: &[String],
    hooks: &HookBus,
) -> BTreeMap<String, PathBuf> {
    let include = compile_patterns(include);
    let exclude = compile_patterns(exclude);
    let mut found = BTreeMap::new();

    for entry in WalkDir::new(source_root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(source_root) else {
            continue;
        };
        let mut rel_str = rel.to_string_lossy().replace('\\', "/");
        hooks.rewrite_path(&mut rel_str);

        if !include.is_empty() && !matches_any(&include, &rel_str) {
            continue;
        }
        if matches_any(&exclude, &rel_str) {
            continue;
        }
        found.insert(rel_str, entry.path().to_path_buf());
    }
    found
}

/// Reconcile the scan against the store's known files for
/// `(namespace, job_id)`. Performs rename detection by content hash (spec
/// §4.2) before creating any genuinely-new `File` rows.
pub fn scan_and_reconcile(
    store: &mut dyn Store,
    hooks: &HookBus,
    ns: &Namespace,
    job_id: &JobId,
    source_root: &Path,
    include: &[String],
    exclude: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<ScanOutcome> {
    let walked = walk_source_tree(source_root, include, exclude, hooks);

    let known_ids = store.files_for_job(ns, job_id);
    let mut known_by_path: HashMap<String, FileId> = HashMap::new();
    let mut orphaned_by_path: HashMap<String, bool> = HashMap::new();
    for id in &known_ids {
        let row = store.file(*id);
        orphaned_by_path.insert(row.relative_path.clone(), row.orphaned);
        known_by_path.insert(row.relative_path, *id);
    }

    let mut new_paths: Vec<String> = Vec::new();
    let mut no_longer_orphaned = Vec::new();
    let mut resolved: HashMap<String, FileId> = HashMap::new();

    for path in walked.keys() {
        match known_by_path.get(path) {
            None => new_paths.push(path.clone()),
            Some(id) => {
                resolved.insert(path.clone(), *id);
                if orphaned_by_path.get(path).copied().unwrap_or(false) {
                    no_longer_orphaned.push(*id);
                }
            }
        }
    }

    let mut orphaned_candidates: Vec<FileId> = known_by_path
        .iter()
        .filter(|(path, _)| !walked.contains_key(*path))
        .filter(|(path, _)| !orphaned_by_path.get(*path).copied().unwrap_or(false))
        .map(|(_, id)| *id)
        .collect();

    let mut renamed = 0usize;

    if !new_paths.is_empty() && !orphaned_candidates.is_empty() {
        let mut new_by_size: HashMap<u64, Vec<String>> = HashMap::new();
        for path in &new_paths {
            if let Ok(meta) = fs::metadata(&walked[path]) {
                new_by_size.entry(meta.len()).or_default().push(path.clone());
            }
        }

        let mut orphan_sizes: HashMap<FileId, u64> = HashMap::new();
        for id in &orphaned_candidates {
            if let Some(size_str) = store.get_property(&PropertyKey::Size(*id)) {
                if let Ok(size) = size_str.parse::<u64>() {
                    orphan_sizes.insert(*id, size);
                }
            }
        }

        let mut renamed_new_paths = Vec::new();
        let mut renamed_orphan_ids = Vec::new();

        for (size, candidate_paths) in &new_by_size {
            let class_orphans: Vec<FileId> = orphan_sizes
                .iter()
                .filter(|(_, s)| **s == *size)
                .map(|(id, _)| *id)
                .collect();
            if class_orphans.is_empty() {
                continue;
            }
            for new_path in candidate_paths {
                let Ok(bytes) = fs::read(&walked[new_path]) else {
                    continue;
                };
                let (text, _) = read_and_normalize(&bytes);
                let hash = content_hash(&text);

                for orphan_id in &class_orphans {
                    if renamed_orphan_ids.contains(orphan_id) {
                        continue;
                    }
                    if let Some(stored_hash) = store.get_property(&PropertyKey::Hash(*orphan_id)) {
                        if stored_hash == hash {
                            store.set_file_path(*orphan_id, new_path);
                            resolved.insert(new_path.clone(), *orphan_id);
                            renamed_new_paths.push(new_path.clone());
                            renamed_orphan_ids.push(*orphan_id);
                            renamed += 1;
                            diagnostics.push_for_file(
                                new_path.clone(),
                                "detected as a rename; translations preserved",
                            );
                            break;
                        }
                    }
                }
            }
        }

        new_paths.retain(|p| !renamed_new_paths.contains(p));
        orphaned_candidates.retain(|id| !renamed_orphan_ids.contains(id));
    }

    for path in &new_paths {
        let id = store.get_or_create_file(ns, job_id, path);
        resolved.insert(path.clone(), id);
    }

    let mut found = Vec::new();
    for (path, abs) in &walked {
        if let Some(id) = resolved.get(path) {
            found.push((path.clone(), *id, abs.clone()));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(ScanOutcome {
        found,
        orphaned_candidates,
        no_longer_orphaned,
        renamed,
    })
}
