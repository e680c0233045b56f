//! Leveled logger writing `<level> <json>` lines.
//!
//! [`LeveledLogger`] gates each call by a bitmask filter and writes one line
//! per accepted call:
//!
//! ```text
//! error {"msg":"There was a problem.","data":"3.25"}
//! info  {"msg":"Connected."}
//! ```
//!
//! The destination is injected through the builder; the default is stderr.

use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::level::Level;
use crate::logger::Logger;
use crate::logmap::{LogValue, MapSlice};
use crate::settings::HarnessSettings;

/// Timestamp prefix format (`2024/01/15 12:00:00`).
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Logger that writes level-prefixed JSON lines to a destination.
pub struct LeveledLogger {
    out: Mutex<Box<dyn Write + Send>>,
    filter: AtomicU8,
    timestamps: bool,
}

impl LeveledLogger {
    /// Start building a logger.
    pub fn builder() -> LeveledLoggerBuilder {
        LeveledLoggerBuilder::default()
    }

    /// Logger writing to stderr with the default filter.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Logger writing to stderr, filtered by `settings.filter_level`.
    ///
    /// An unparseable filter falls back to [`Level::DEFAULT`].
    pub fn from_settings(settings: &HarnessSettings) -> Self {
        let filter = settings.filter_level.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid filter level in settings, using default");
            Level::DEFAULT
        });
        Self::builder().filter_level(filter).build()
    }

    /// Change the filter at runtime.
    ///
    /// This is expected to be called rarely and uses a relaxed atomic store
    /// rather than a lock. Calls racing with concurrent logging may observe
    /// either the old or the new filter for a short time.
    pub fn set_filter_level(&self, level: Level) {
        self.filter.store(level.bits(), Ordering::Relaxed);
    }

    /// Current filter.
    pub fn filter_level(&self) -> Level {
        Level::from_bits(self.filter.load(Ordering::Relaxed))
    }

    fn enabled(&self, level: Level) -> bool {
        self.filter_level().intersects(level)
    }

    fn write_line(&self, level: Level, keyvals: &[LogValue]) {
        let line = match MapSlice::from_keyvals(keyvals).to_json_string() {
            Ok(json) => format!("{level:<5} {json}"),
            Err(e) => logging_failure_line(&e.to_string()),
        };

        let mut out = self.out.lock();
        if self.timestamps {
            let now = chrono::Local::now().format(TIMESTAMP_FORMAT);
            let _ = write!(out, "{now} ");
        }
        let _ = out.write_all(line.as_bytes());
    }
}

impl Default for LeveledLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Synthetic error line reporting that a log call could not be rendered.
///
/// Includes the trailing newline.
pub fn logging_failure_line(error: &str) -> String {
    let quoted = serde_json::to_string(error).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "{:<5} {{\"msg\":\"logging failure\",\"error\":{quoted}}}\n",
        Level::ERROR
    )
}

impl Logger for LeveledLogger {
    fn error(&self, keyvals: &[LogValue]) {
        if self.enabled(Level::ERROR) {
            self.write_line(Level::ERROR, keyvals);
        }
    }

    fn info(&self, keyvals: &[LogValue]) {
        if self.enabled(Level::INFO) {
            self.write_line(Level::INFO, keyvals);
        }
    }

    fn debug(&self, keyvals: &[LogValue]) {
        if self.enabled(Level::DEBUG) {
            self.write_line(Level::DEBUG, keyvals);
        }
    }

    fn trace(&self, keyvals: &[LogValue]) {
        if self.enabled(Level::TRACE) {
            self.write_line(Level::TRACE, keyvals);
        }
    }
}

/// Builder for [`LeveledLogger`].
pub struct LeveledLoggerBuilder {
    out: Option<Box<dyn Write + Send>>,
    filter: Level,
    timestamps: bool,
}

impl Default for LeveledLoggerBuilder {
    fn default() -> Self {
        Self {
            out: None,
            filter: Level::DEFAULT,
            timestamps: false,
        }
    }
}

impl LeveledLoggerBuilder {
    /// Write log lines to `w`.
    #[must_use]
    pub fn output(mut self, w: impl Write + Send + 'static) -> Self {
        self.out = Some(Box::new(w));
        self
    }

    /// Only log messages whose level is in `level`.
    #[must_use]
    pub fn filter_level(mut self, level: Level) -> Self {
        self.filter = level;
        self
    }

    /// Prefix each line with a local date and time.
    #[must_use]
    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Build the logger.
    pub fn build(self) -> LeveledLogger {
        LeveledLogger {
            out: Mutex::new(self.out.unwrap_or_else(|| Box::new(std::io::stderr()))),
            filter: AtomicU8::new(self.filter.bits()),
            timestamps: self.timestamps,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv;
    use crate::logmap::Json;
    use serde::ser::Error as _;
    use std::sync::Arc;

    /// Cloneable in-memory destination.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn write_all_levels(l: &LeveledLogger, label: &str) {
        l.trace(&kv!("msg", "trace_message", "label", label));
        l.debug(&kv!("msg", "debug_message", "label", label));
        l.info(&kv!("msg", "info_message", "label", label));
        l.error(&kv!("msg", "error_message", "label", label));
    }

    #[test]
    fn writes_level_and_json() {
        let buf = SharedBuf::default();
        let l = LeveledLogger::builder().output(buf.clone()).build();
        l.error(&kv!("msg", "test_message"));
        assert_eq!(buf.contents(), "error {\"msg\":\"test_message\"}\n");
    }

    #[test]
    fn default_filter_is_info_and_error() {
        let buf = SharedBuf::default();
        let l = LeveledLogger::builder().output(buf.clone()).build();
        write_all_levels(&l, "default");
        assert_eq!(
            buf.contents(),
            concat!(
                "info  {\"msg\":\"info_message\",\"label\":\"default\"}\n",
                "error {\"msg\":\"error_message\",\"label\":\"default\"}\n",
            )
        );
    }

    #[test]
    fn filter_all_levels() {
        let buf = SharedBuf::default();
        let l = LeveledLogger::builder()
            .output(buf.clone())
            .filter_level(Level::ALL)
            .build();
        write_all_levels(&l, "all");
        let lines: Vec<String> = buf.contents().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("trace {"));
        assert!(lines[1].starts_with("debug {"));
        assert!(lines[2].starts_with("info  {"));
        assert!(lines[3].starts_with("error {"));
    }

    #[test]
    fn set_filter_level_at_runtime() {
        let buf = SharedBuf::default();
        let l = LeveledLogger::builder().output(buf.clone()).build();
        l.set_filter_level(Level::DEBUG | Level::ERROR);
        assert_eq!(l.filter_level(), Level::DEBUG | Level::ERROR);
        write_all_levels(&l, "changed");
        let out = buf.contents();
        assert!(out.contains("debug_message"));
        assert!(out.contains("error_message"));
        assert!(!out.contains("info_message"));
        assert!(!out.contains("trace_message"));
    }

    #[test]
    fn filter_none_drops_everything() {
        let buf = SharedBuf::default();
        let l = LeveledLogger::builder()
            .output(buf.clone())
            .filter_level(Level::NONE)
            .build();
        write_all_levels(&l, "none");
        assert!(buf.contents().is_empty());
    }

    #[test]
    fn timestamps_prefix_lines() {
        let buf = SharedBuf::default();
        let l = LeveledLogger::builder()
            .output(buf.clone())
            .timestamps(true)
            .build();
        l.info(&kv!("msg", "stamped"));
        let out = buf.contents();
        // "YYYY/MM/DD HH:MM:SS " is 20 characters.
        assert_eq!(&out[4..5], "/");
        assert_eq!(&out[10..11], " ");
        assert_eq!(&out[20..], "info  {\"msg\":\"stamped\"}\n");
    }

    #[test]
    fn encoding_failure_writes_logging_failure() {
        struct Exploding;
        impl serde::Serialize for Exploding {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(S::Error::custom("kaboom"))
            }
        }

        let buf = SharedBuf::default();
        let l = LeveledLogger::builder().output(buf.clone()).build();
        l.info(&kv!("msg", "x", "bad", Json(Exploding)));
        assert_eq!(
            buf.contents(),
            "error {\"msg\":\"logging failure\",\"error\":\"failed to serialize value: kaboom\"}\n"
        );
    }

    #[test]
    fn from_settings_applies_filter() {
        let settings = HarnessSettings {
            filter_level: "trace".to_string(),
            ..HarnessSettings::default()
        };
        let l = LeveledLogger::from_settings(&settings);
        assert_eq!(l.filter_level(), Level::TRACE);

        let settings = HarnessSettings {
            filter_level: "loud".to_string(),
            ..HarnessSettings::default()
        };
        let l = LeveledLogger::from_settings(&settings);
        assert_eq!(l.filter_level(), Level::DEFAULT);
    }

    #[test]
    fn concurrent_lines_are_not_interleaved() {
        let buf = SharedBuf::default();
        let l = LeveledLogger::builder().output(buf.clone()).build();
        std::thread::scope(|s| {
            for i in 0..16 {
                let l = &l;
                let _ = s.spawn(move || l.info(&kv!("msg", "concurrent", "i", i)));
            }
        });
        let out = buf.contents();
        assert_eq!(out.lines().count(), 16);
        for line in out.lines() {
            assert!(line.starts_with("info  {\"msg\":\"concurrent\",\"i\":\""));
            assert!(line.ends_with("\"}"));
        }
    }

    #[test]
    fn logging_failure_line_escapes_error() {
        assert_eq!(
            logging_failure_line("bad \"quote\""),
            "error {\"msg\":\"logging failure\",\"error\":\"bad \\\"quote\\\"\"}\n"
        );
    }
}
