//! Settings resolution: compiled defaults, then an optional JSON file, then
//! `TRUTHLOG_*` environment variables.
//!
//! The file is named by `TRUTHLOG_SETTINGS`, falling back to
//! `truthlog.json` in the working directory (the package root under
//! `cargo test`). Fields absent from the file keep their defaults.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::HarnessSettings;
use crate::errors::{Result, SettingsError};
use crate::level::Level;

/// Names the settings file to load.
pub const ENV_SETTINGS_FILE: &str = "TRUTHLOG_SETTINGS";
/// Settings file used when [`ENV_SETTINGS_FILE`] is unset.
pub const DEFAULT_SETTINGS_FILE: &str = "truthlog.json";
/// Overrides [`HarnessSettings::testdata_dir`].
pub const ENV_TESTDATA_DIR: &str = "TRUTHLOG_TESTDATA_DIR";
/// Overrides [`HarnessSettings::truth_file_name`].
pub const ENV_TRUTH_FILE: &str = "TRUTHLOG_TRUTH_FILE";
/// Overrides [`HarnessSettings::generated_suffix`].
pub const ENV_GENERATED_SUFFIX: &str = "TRUTHLOG_GENERATED_SUFFIX";
/// Overrides [`HarnessSettings::filter_level`].
pub const ENV_FILTER_LEVEL: &str = "TRUTHLOG_FILTER_LEVEL";

/// Resolve settings from the settings file and the environment.
pub fn load_settings() -> Result<HarnessSettings> {
    load_with(|name| std::env::var(name).ok())
}

/// Load settings from `path` with environment overrides.
///
/// A missing file yields defaults. Invalid JSON or an unparseable
/// `filterLevel` is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HarnessSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<HarnessSettings> {
    let path = lookup(ENV_SETTINGS_FILE)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE), PathBuf::from);
    let mut settings = read_settings_file(&path)?;
    apply_overrides(&mut settings, lookup);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<HarnessSettings> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(HarnessSettings::default());
        }
        Err(e) => return Err(e.into()),
    };
    debug!(path = %path.display(), "loading harness settings");
    let settings: HarnessSettings = serde_json::from_str(&content)?;
    if parse_filter_level(&settings.filter_level).is_none() {
        return Err(SettingsError::InvalidValue(format!(
            "filterLevel: {}",
            settings.filter_level
        )));
    }
    Ok(settings)
}

/// Apply environment variable overrides to loaded settings.
///
/// Empty values are ignored. An unparseable filter level is ignored with a
/// warning.
pub fn apply_env_overrides(settings: &mut HarnessSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
fn apply_overrides(settings: &mut HarnessSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read(ENV_TESTDATA_DIR) {
        settings.testdata_dir = PathBuf::from(v);
    }
    if let Some(v) = read(ENV_TRUTH_FILE) {
        settings.truth_file_name = v;
    }
    if let Some(v) = read(ENV_GENERATED_SUFFIX) {
        settings.generated_suffix = v;
    }
    if let Some(v) = read(ENV_FILTER_LEVEL) {
        if parse_filter_level(&v).is_some() {
            settings.filter_level = v;
        } else {
            tracing::warn!(key = ENV_FILTER_LEVEL, value = %v, "invalid filter level env var, ignoring");
        }
    }
}

/// Parse a filter expression such as `"debug|error"`.
pub fn parse_filter_level(val: &str) -> Option<Level> {
    val.parse().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
