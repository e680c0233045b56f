//! The test-runner seam: where diagnostics go and how failure is signalled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Receiver of harness diagnostics.
pub trait TestRunner: Send + Sync {
    /// Record a diagnostic message.
    fn log(&self, message: &str);

    /// Mark the current test as failed.
    fn fail(&self);
}

impl<R: TestRunner + ?Sized> TestRunner for Arc<R> {
    fn log(&self, message: &str) {
        (**self).log(message);
    }

    fn fail(&self) {
        (**self).fail();
    }
}

impl<R: TestRunner + ?Sized> TestRunner for &R {
    fn log(&self, message: &str) {
        (**self).log(message);
    }

    fn fail(&self) {
        (**self).fail();
    }
}

/// Runner that keeps everything in memory for inspection.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    messages: Mutex<Vec<String>>,
    failed: AtomicBool,
}

impl RecordingRunner {
    /// Create an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages logged so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// All messages joined by newlines.
    pub fn output(&self) -> String {
        self.messages.lock().join("\n")
    }

    /// Whether [`TestRunner::fail`] was called.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Forget recorded messages and the failure flag.
    pub fn reset(&self) {
        self.messages.lock().clear();
        self.failed.store(false, Ordering::SeqCst);
    }
}

impl TestRunner for RecordingRunner {
    fn log(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }

    fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }
}

/// Runner for use inside `#[test]` functions.
///
/// Messages go to stderr, which libtest captures per test. [`fail`]
/// panics, failing the enclosing test.
///
/// [`fail`]: TestRunner::fail
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicRunner;

impl PanicRunner {
    /// Create a runner.
    pub fn new() -> Self {
        Self
    }
}

impl TestRunner for PanicRunner {
    fn log(&self, message: &str) {
        eprintln!("{message}");
    }

    fn fail(&self) {
        panic!("log output did not match the truth transcript");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_runner_collects() {
        let r = RecordingRunner::new();
        r.log("first");
        r.log("second");
        assert!(!r.failed());
        r.fail();
        assert!(r.failed());
        assert_eq!(r.messages(), vec!["first", "second"]);
        assert_eq!(r.output(), "first\nsecond");

        r.reset();
        assert!(r.messages().is_empty());
        assert!(!r.failed());
    }

    fn report(runner: impl TestRunner, message: &str) {
        runner.log(message);
    }

    #[test]
    fn shared_runner_through_arc_and_ref() {
        let r = Arc::new(RecordingRunner::new());
        report(Arc::clone(&r), "arc");
        report(&*r, "ref");
        r.fail();
        assert_eq!(r.messages(), vec!["arc", "ref"]);
        assert!(r.failed());
    }

    #[test]
    #[should_panic(expected = "did not match the truth transcript")]
    fn panic_runner_panics_on_fail() {
        let r = PanicRunner::new();
        r.log("diagnostic");
        r.fail();
    }
}
