//! Job settings loading and merging (spec §9/§10 ambient addition).
//!
//! Mirrors the teacher's `config::Config`/`find_config_file` pattern: walk
//! up from a starting directory looking for a project config file, stopping
//! at `.git`, falling back to defaults if none is found.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::JobSettings;

pub const CONFIG_FILE_NAME: &str = ".locsyncrc.json";

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub settings: JobSettings,
    /// `true` if settings were loaded from a file, `false` if using defaults.
    pub from_file: bool,
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            let settings: JobSettings = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?;
            Ok(ConfigLoadResult {
                settings,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            settings: JobSettings::default(),
            from_file: false,
        }),
    }
}

pub fn default_config_json() -> Result<String> {
    serde_json::to_string_pretty(&JobSettings::default()).context("failed to render default config")
}
