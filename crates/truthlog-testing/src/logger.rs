//! The verification engine: a [`Logger`] that checks its output against a
//! truth transcript.
//!
//! Every call is rendered to its canonical line, emitted (to the runner, or
//! to an actual-output file when one is configured), and compared with the
//! next expected line. [`TestLogger::done`] reports expected lines that
//! never arrived and, on any failure, persists the actual output next to
//! the transcript so it can be inspected or copied over it.
//!
//! In order-insensitive mode nothing is compared per call. Both sides are
//! sorted and compared at [`done`](TestLogger::done) instead, which suits
//! concurrent producers.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use truthlog_core::settings::load_settings;
use truthlog_core::{
    HarnessSettings, Level, LogValue, Logger, MapSlice, kv, logging_failure_line,
};

use crate::deferred::DeferredFileWriter;
use crate::diff;
use crate::errors::{HarnessError, Result};
use crate::runner::{PanicRunner, TestRunner};

/// Field mask: given the expected line's fields as strings, returns the
/// keys whose values are not compared.
pub type FieldIgnoreFunc = Arc<dyn Fn(&HashMap<String, String>) -> Vec<String> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Collecting,
    Done,
}

struct State {
    cursor: usize,
    failed: bool,
    actual_lines: Vec<String>,
    phase: Phase,
}

/// Logger that verifies its output against a truth transcript.
pub struct TestLogger<R> {
    runner: R,
    truth: Vec<String>,
    truth_provided: bool,
    ignore_order: bool,
    do_fail: bool,
    ignorer: Option<FieldIgnoreFunc>,
    actual: Option<DeferredFileWriter>,
    state: Mutex<State>,
}

/// A rendered log call.
struct Rendered {
    level: Level,
    entries: MapSlice,
    line: String,
}

impl Rendered {
    fn new(level: Level, keyvals: &[LogValue]) -> std::result::Result<Self, String> {
        let entries = MapSlice::from_keyvals(keyvals);
        let json = entries
            .to_json_string()
            .map_err(|e| format!("error creating log string: {e}"))?;
        let line = format!("{level:<5} {}", json.trim_end_matches('\n'));
        Ok(Self {
            level,
            entries,
            line,
        })
    }

    fn failure(error: &str) -> Self {
        Self {
            level: Level::ERROR,
            entries: MapSlice::from_keyvals(&kv!("msg", "logging failure", "error", error)),
            line: logging_failure_line(error).trim_end_matches('\n').to_string(),
        }
    }
}

impl<R: TestRunner> TestLogger<R> {
    /// A logger with no transcript: every line is sent to `runner` and
    /// nothing is checked.
    pub fn new(runner: R) -> Self {
        Self::assemble(runner, Vec::new(), false, None)
    }

    fn assemble(
        runner: R,
        truth: Vec<String>,
        truth_provided: bool,
        actual: Option<DeferredFileWriter>,
    ) -> Self {
        Self {
            runner,
            truth,
            truth_provided,
            ignore_order: false,
            do_fail: true,
            ignorer: None,
            actual,
            state: Mutex::new(State {
                cursor: 0,
                failed: false,
                actual_lines: Vec::new(),
                phase: Phase::Collecting,
            }),
        }
    }

    /// The runner receiving diagnostics.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Whether any mismatch or logging failure has been seen so far.
    pub fn failed(&self) -> bool {
        self.state.lock().failed
    }

    /// Lines logged so far, without trailing newlines.
    pub fn actual_lines(&self) -> Vec<String> {
        self.state.lock().actual_lines.clone()
    }

    /// Render, emit, and (in ordered mode) check one log call.
    pub fn compare(&self, level: Level, keyvals: &[LogValue]) {
        let (rendered, render_failed) = match Rendered::new(level, keyvals) {
            Ok(r) => (r, false),
            Err(error) => (Rendered::failure(&error), true),
        };

        let mut state = self.state.lock();
        if render_failed {
            debug!(line = %rendered.line, "log call could not be rendered");
            state.failed = true;
        }

        self.emit(&mut state, &rendered.line);
        state.actual_lines.push(rendered.line.clone());

        if !self.truth_provided || self.ignore_order {
            return;
        }

        let want = self.truth.get(state.cursor).map_or("", String::as_str);
        if !self.cmp(want, &rendered.line, rendered.level, &rendered.entries) {
            self.runner.log(&format!(
                "unexpected log message (-want +got):\n{}",
                diff::string_diff(want, &rendered.line)
            ));
            state.failed = true;
            self.promote_actual(&mut state);
        }
        state.cursor += 1;
    }

    /// Whether `got` matches the expected line `want`.
    ///
    /// Without a field mask this is byte equality. With one, both lines are
    /// compared field by field: levels, field counts and keys must match,
    /// and values must match in string form unless the mask exempts them.
    pub fn cmp(&self, want: &str, got: &str, got_level: Level, got_entries: &MapSlice) -> bool {
        let Some(ignorer) = &self.ignorer else {
            return want == got;
        };
        if want.is_empty() {
            return false;
        }
        let Ok((want_level, want_entries)) = parse_line(want) else {
            return false;
        };
        if want_entries.len() != got_entries.len() || want_level != got_level {
            return false;
        }

        let ignored = ignorer(&want_entries.to_string_map());
        want_entries.iter().zip(got_entries.iter()).all(|(w, g)| {
            if w.key != g.key {
                return false;
            }
            if ignored.contains(&w.key) {
                return true;
            }
            matches!(
                (w.value.string_form(), g.value.string_form()),
                (Ok(a), Ok(b)) if a == b
            )
        })
    }

    /// Finish the test: report missing or mismatched lines, persist the
    /// actual output on failure, and fail the runner.
    ///
    /// Only the first call has any effect.
    pub fn done(&self) {
        let failed = {
            let mut state = self.state.lock();
            if state.phase == Phase::Done {
                return;
            }
            state.phase = Phase::Done;
            if !self.do_fail {
                return;
            }

            if self.ignore_order {
                self.compare_final_sorted(&mut state);
            } else if state.cursor < self.truth.len() {
                state.failed = true;
                for want in &self.truth[state.cursor..] {
                    self.runner.log(&format!(
                        "missing log message (-want +got):\n{}",
                        diff::string_diff(want, "")
                    ));
                }
                state.cursor = self.truth.len();
            }

            if state.failed {
                self.promote_actual(&mut state);
            }
            if let Some(Err(e)) = self.actual.as_ref().map(DeferredFileWriter::close) {
                self.report(&mut state, &format!("error closing actual file: {e}"));
            }
            state.failed
        };

        debug!(failed, "test logger finished");
        if failed {
            self.runner.fail();
        }
    }

    fn compare_final_sorted(&self, state: &mut State) {
        if !self.truth_provided {
            return;
        }
        let mut want = self.truth.clone();
        let mut got = state.actual_lines.clone();
        want.sort();
        got.sort();

        if want.len() != got.len() {
            self.runner.log(&format!(
                "unexpected number of log messages (-want +got):\n{}",
                diff::lines_diff(&want, &got)
            ));
            state.failed = true;
            return;
        }

        for (w, g) in want.iter().zip(&got) {
            let equal = match parse_line(g) {
                Ok((level, entries)) => self.cmp(w, g, level, &entries),
                Err(_) => self.ignorer.is_none() && w == g,
            };
            if !equal {
                self.runner.log(&format!(
                    "unexpected log message (-want +got):\n{}",
                    diff::string_diff(w, g)
                ));
                state.failed = true;
            }
        }
    }

    fn emit(&self, state: &mut State, line: &str) {
        match &self.actual {
            Some(actual) => {
                if let Err(e) = actual.write(format!("{line}\n").as_bytes()) {
                    self.report(state, &format!("error writing to actual file: {e}"));
                }
            }
            None => self.runner.log(line),
        }
    }

    fn promote_actual(&self, state: &mut State) {
        if let Some(Err(e)) = self.actual.as_ref().map(DeferredFileWriter::promote) {
            self.report(state, &format!("error writing to actual file: {e}"));
        }
    }

    /// Report a harness failure as a logging-failure line.
    fn report(&self, state: &mut State, error: &str) {
        self.runner
            .log(logging_failure_line(error).trim_end_matches('\n'));
        state.failed = true;
    }
}

impl TestLogger<PanicRunner> {
    /// Start configuring a logger. The runner is chosen at
    /// [`build`](TestLoggerBuilder::build).
    pub fn builder() -> TestLoggerBuilder {
        TestLoggerBuilder::default()
    }

    /// Logger for a named test, with conventional file locations.
    ///
    /// The transcript is `<testdata_dir>/<test_name>/test.log` and actual
    /// output goes to `<transcript>.generated`, both taken from
    /// [`load_settings`]. `::` in the name nests directories. Mismatches
    /// panic at [`done`](Self::done).
    pub fn convenient(test_name: &str, builder: TestLoggerBuilder) -> Result<Self> {
        let settings = load_settings()?;
        Self::convenient_with_settings(test_name, &settings, builder)
    }

    /// [`convenient`](Self::convenient) with explicit settings.
    pub fn convenient_with_settings(
        test_name: &str,
        settings: &HarnessSettings,
        builder: TestLoggerBuilder,
    ) -> Result<Self> {
        let truth = settings.truth_path(test_name);
        let generated = settings.generated_path(&truth);
        builder
            .truth_file(truth)
            .actual_output_file(generated)
            .build(PanicRunner::new())
    }

    /// [`convenient`](Self::convenient) using the current thread name,
    /// which libtest sets to the test's path.
    ///
    /// With `--test-threads=1` libtest runs tests on the `main` thread, so
    /// no name is available. That case, and unnamed threads, return
    /// [`HarnessError::NoTestName`].
    pub fn for_current_test(builder: TestLoggerBuilder) -> Result<Self> {
        let name = test_name_from_thread(std::thread::current().name())?;
        Self::convenient(&name, builder)
    }
}

fn test_name_from_thread(name: Option<&str>) -> Result<String> {
    match name {
        Some(name) if name != "main" => Ok(name.to_string()),
        other => Err(HarnessError::NoTestName(
            other.unwrap_or("<unnamed>").to_string(),
        )),
    }
}

impl<R: TestRunner> Logger for TestLogger<R> {
    fn error(&self, keyvals: &[LogValue]) {
        self.compare(Level::ERROR, keyvals);
    }

    fn info(&self, keyvals: &[LogValue]) {
        self.compare(Level::INFO, keyvals);
    }

    fn debug(&self, keyvals: &[LogValue]) {
        self.compare(Level::DEBUG, keyvals);
    }

    fn trace(&self, keyvals: &[LogValue]) {
        self.compare(Level::TRACE, keyvals);
    }
}

impl<R> Drop for TestLogger<R> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.phase == Phase::Collecting && self.do_fail && !std::thread::panicking() {
            warn!(
                logged = state.actual_lines.len(),
                expected = self.truth.len(),
                "test logger dropped without calling done(); output was not verified"
            );
        }
    }
}

impl<R> std::fmt::Debug for TestLogger<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestLogger")
            .field("truth_lines", &self.truth.len())
            .field("truth_provided", &self.truth_provided)
            .field("ignore_order", &self.ignore_order)
            .field("do_fail", &self.do_fail)
            .field("actual", &self.actual)
            .finish_non_exhaustive()
    }
}

/// Split a canonical line into its level and ordered fields.
///
/// The grammar is `LEVEL SP+ JSON`.
pub fn parse_line(line: &str) -> Result<(Level, MapSlice)> {
    let malformed = || HarnessError::MalformedLine(line.to_string());
    let (prefix, rest) = line.split_once(' ').ok_or_else(malformed)?;
    let level = prefix
        .parse::<Level>()
        .ok()
        .filter(|l| l.as_str().is_some())
        .ok_or_else(malformed)?;
    let entries = MapSlice::from_json(rest.trim_start())?;
    Ok((level, entries))
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

enum TruthSource {
    File(PathBuf),
    Lines(Vec<String>),
}

/// Configuration for a [`TestLogger`].
#[derive(Default)]
pub struct TestLoggerBuilder {
    truth: Option<TruthSource>,
    duplicate_truth: bool,
    actual_path: Option<PathBuf>,
    without_failure: bool,
    ignore_order: bool,
    ignorer: Option<FieldIgnoreFunc>,
}

impl TestLoggerBuilder {
    fn set_truth(mut self, source: TruthSource) -> Self {
        if self.truth.is_some() {
            self.duplicate_truth = true;
        } else {
            self.truth = Some(source);
        }
        self
    }

    /// Read expected lines from `path`. A missing file means no lines are
    /// expected and forces the actual output to be written.
    #[must_use]
    pub fn truth_file(self, path: impl Into<PathBuf>) -> Self {
        self.set_truth(TruthSource::File(path.into()))
    }

    /// Use `lines` as the expected lines.
    #[must_use]
    pub fn truth_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_truth(TruthSource::Lines(
            lines.into_iter().map(Into::into).collect(),
        ))
    }

    /// Write actual output to `path`: on failure, or immediately when there
    /// is no transcript to compare with.
    #[must_use]
    pub fn actual_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.actual_path = Some(path.into());
        self
    }

    /// Never fail the runner; [`TestLogger::done`] does nothing.
    #[must_use]
    pub fn without_failure(mut self) -> Self {
        self.without_failure = true;
        self
    }

    /// Compare sorted output at [`TestLogger::done`] instead of line by line.
    #[must_use]
    pub fn ignore_order(mut self) -> Self {
        self.ignore_order = true;
        self
    }

    /// Exempt fields chosen by `f` from value comparison.
    #[must_use]
    pub fn field_ignore_func<F>(mut self, f: F) -> Self
    where
        F: Fn(&HashMap<String, String>) -> Vec<String> + Send + Sync + 'static,
    {
        self.ignorer = Some(Arc::new(f));
        self
    }

    /// Exempt the listed keys of every line whose `msg` appears in `fields`.
    #[must_use]
    pub fn ignored_fields(self, fields: HashMap<String, Vec<String>>) -> Self {
        self.field_ignore_func(move |entries| {
            entries
                .get("msg")
                .and_then(|msg| fields.get(msg))
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Build the logger, reading the transcript and preparing the
    /// actual-output writer.
    pub fn build<R: TestRunner>(self, runner: R) -> Result<TestLogger<R>> {
        if self.duplicate_truth {
            return Err(HarnessError::MultipleTruthSources);
        }

        let (truth, truth_provided, truth_missing) = match self.truth {
            None => (Vec::new(), false, false),
            Some(TruthSource::Lines(lines)) => (lines, true, false),
            Some(TruthSource::File(path)) => match read_truth_file(&path)? {
                Some(lines) => (lines, true, false),
                None => (Vec::new(), true, true),
            },
        };

        let mut actual = match self.actual_path {
            Some(path) => {
                let writer = DeferredFileWriter::new(&path);
                if !truth_provided || truth_missing {
                    writer
                        .promote()
                        .map_err(|source| HarnessError::ActualOutput { path, source })?;
                }
                Some(writer)
            }
            None => None,
        };
        if actual.is_none() && self.ignore_order {
            actual = Some(DeferredFileWriter::in_memory());
        }

        debug!(
            truth_lines = truth.len(),
            truth_provided,
            ignore_order = self.ignore_order,
            "test logger ready"
        );

        let mut logger = TestLogger::assemble(runner, truth, truth_provided, actual);
        logger.ignore_order = self.ignore_order;
        logger.do_fail = !self.without_failure;
        logger.ignorer = self.ignorer;
        Ok(logger)
    }
}

impl std::fmt::Debug for TestLoggerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestLoggerBuilder")
            .field("actual_path", &self.actual_path)
            .field("without_failure", &self.without_failure)
            .field("ignore_order", &self.ignore_order)
            .field("has_ignorer", &self.ignorer.is_some())
            .finish_non_exhaustive()
    }
}

/// Read a transcript. `Ok(None)` if the file does not exist.
///
/// Invalid UTF-8 is replaced with U+FFFD rather than rejected.
fn read_truth_file(path: &Path) -> Result<Option<Vec<String>>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "truth file not found");
            return Ok(None);
        }
        Err(source) => {
            return Err(HarnessError::ReadTruth {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let body = content.strip_suffix('\n').unwrap_or(content.as_ref());
    if body.is_empty() {
        return Ok(Some(Vec::new()));
    }
    Ok(Some(body.split('\n').map(str::to_string).collect()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
