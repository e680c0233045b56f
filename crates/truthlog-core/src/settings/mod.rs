//! Harness configuration with layered sources.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults**: [`HarnessSettings::default()`]
//! 2. **Settings file**: optional JSON, absent fields keep their defaults
//! 3. **Environment variables**: `TRUTHLOG_*` overrides (highest priority)

pub mod loader;

pub use loader::{
    DEFAULT_SETTINGS_FILE, ENV_SETTINGS_FILE, apply_env_overrides, load_settings,
    load_settings_from_path,
};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default directory holding per-test truth transcripts.
pub const DEFAULT_TESTDATA_DIR: &str = "testdata";
/// Default truth transcript file name inside a test's directory.
pub const DEFAULT_TRUTH_FILE_NAME: &str = "test.log";
/// Default suffix appended to the truth path for actual output.
pub const DEFAULT_GENERATED_SUFFIX: &str = ".generated";
/// Default filter for [`crate::LeveledLogger::from_settings`].
pub const DEFAULT_FILTER_LEVEL: &str = "info|error";

/// Configuration shared by the leveled logger and the test harness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessSettings {
    /// Directory containing one sub-directory per test.
    pub testdata_dir: PathBuf,
    /// Truth transcript file name inside a test's directory.
    pub truth_file_name: String,
    /// Suffix appended to the truth path to name the actual-output file.
    pub generated_suffix: String,
    /// Level filter expression, e.g. `"info|error"`.
    pub filter_level: String,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            testdata_dir: PathBuf::from(DEFAULT_TESTDATA_DIR),
            truth_file_name: DEFAULT_TRUTH_FILE_NAME.to_string(),
            generated_suffix: DEFAULT_GENERATED_SUFFIX.to_string(),
            filter_level: DEFAULT_FILTER_LEVEL.to_string(),
        }
    }
}

impl HarnessSettings {
    /// Truth transcript path for the named test.
    ///
    /// `::` separators in `test_name` become path separators, so
    /// `module::case` maps to `testdata/module/case/test.log`.
    pub fn truth_path(&self, test_name: &str) -> PathBuf {
        let mut path = self.testdata_dir.clone();
        for part in test_name.split("::").filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path.join(&self.truth_file_name)
    }

    /// Actual-output path that accompanies `truth_path`.
    pub fn generated_path(&self, truth_path: &Path) -> PathBuf {
        let mut name = truth_path.as_os_str().to_owned();
        name.push(&self.generated_suffix);
        PathBuf::from(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = HarnessSettings::default();
        assert_eq!(s.testdata_dir, PathBuf::from("testdata"));
        assert_eq!(s.truth_file_name, "test.log");
        assert_eq!(s.generated_suffix, ".generated");
        assert_eq!(s.filter_level, "info|error");
    }

    #[test]
    fn truth_path_for_simple_name() {
        let s = HarnessSettings::default();
        assert_eq!(
            s.truth_path("my_test"),
            Path::new("testdata").join("my_test").join("test.log")
        );
    }

    #[test]
    fn truth_path_splits_module_path() {
        let s = HarnessSettings::default();
        assert_eq!(
            s.truth_path("engine::tests::ordered"),
            Path::new("testdata")
                .join("engine")
                .join("tests")
                .join("ordered")
                .join("test.log")
        );
    }

    #[test]
    fn generated_path_appends_suffix() {
        let s = HarnessSettings::default();
        let truth = s.truth_path("t");
        assert_eq!(
            s.generated_path(&truth),
            Path::new("testdata").join("t").join("test.log.generated")
        );
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_value(HarnessSettings::default()).unwrap();
        assert_eq!(json["testdataDir"], "testdata");
        assert_eq!(json["truthFileName"], "test.log");
        assert_eq!(json["generatedSuffix"], ".generated");
        assert_eq!(json["filterLevel"], "info|error");
    }
}
