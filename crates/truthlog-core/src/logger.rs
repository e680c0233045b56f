//! The [`Logger`] trait and its small implementations.
//!
//! Libraries accept an `Arc<dyn Logger>` so the main program decides where
//! logs go. [`DiscardLogger`] is the no-op default for libraries that were
//! never handed a logger, and [`with`] layers fixed context onto an existing
//! logger.

use std::sync::Arc;

use crate::level::Level;
use crate::logmap::LogValue;

/// Four-level structured logger.
///
/// Each method takes interleaved keys and values (see [`crate::kv!`]).
pub trait Logger: Send + Sync {
    /// Log at error level.
    fn error(&self, keyvals: &[LogValue]);
    /// Log at info level.
    fn info(&self, keyvals: &[LogValue]);
    /// Log at debug level.
    fn debug(&self, keyvals: &[LogValue]);
    /// Log at trace level.
    fn trace(&self, keyvals: &[LogValue]);

    /// Dispatch to the method for a single `level`. Combined levels are
    /// ignored.
    fn log(&self, level: Level, keyvals: &[LogValue]) {
        match level {
            Level::ERROR => self.error(keyvals),
            Level::INFO => self.info(keyvals),
            Level::DEBUG => self.debug(keyvals),
            Level::TRACE => self.trace(keyvals),
            _ => {}
        }
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn error(&self, keyvals: &[LogValue]) {
        (**self).error(keyvals);
    }

    fn info(&self, keyvals: &[LogValue]) {
        (**self).info(keyvals);
    }

    fn debug(&self, keyvals: &[LogValue]) {
        (**self).debug(keyvals);
    }

    fn trace(&self, keyvals: &[LogValue]) {
        (**self).trace(keyvals);
    }
}

impl<L: Logger + ?Sized> Logger for &L {
    fn error(&self, keyvals: &[LogValue]) {
        (**self).error(keyvals);
    }

    fn info(&self, keyvals: &[LogValue]) {
        (**self).info(keyvals);
    }

    fn debug(&self, keyvals: &[LogValue]) {
        (**self).debug(keyvals);
    }

    fn trace(&self, keyvals: &[LogValue]) {
        (**self).trace(keyvals);
    }
}

/// Logger that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardLogger;

impl DiscardLogger {
    /// Create a discard logger.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for DiscardLogger {
    fn error(&self, _keyvals: &[LogValue]) {}
    fn info(&self, _keyvals: &[LogValue]) {}
    fn debug(&self, _keyvals: &[LogValue]) {}
    fn trace(&self, _keyvals: &[LogValue]) {}
}

/// Logger that prepends fixed key-value pairs to every call.
pub struct ContextLogger {
    inner: Arc<dyn Logger>,
    keyvals: Vec<LogValue>,
}

impl ContextLogger {
    fn join(&self, keyvals: &[LogValue]) -> Vec<LogValue> {
        let mut all = Vec::with_capacity(self.keyvals.len() + keyvals.len());
        all.extend_from_slice(&self.keyvals);
        all.extend_from_slice(keyvals);
        all
    }
}

impl Logger for ContextLogger {
    fn error(&self, keyvals: &[LogValue]) {
        self.inner.error(&self.join(keyvals));
    }

    fn info(&self, keyvals: &[LogValue]) {
        self.inner.info(&self.join(keyvals));
    }

    fn debug(&self, keyvals: &[LogValue]) {
        self.inner.debug(&self.join(keyvals));
    }

    fn trace(&self, keyvals: &[LogValue]) {
        self.inner.trace(&self.join(keyvals));
    }
}

/// Return a logger with `keyvals` prepended to those passed on each call.
///
/// Returns `logger` itself when `keyvals` is empty.
pub fn with(logger: Arc<dyn Logger>, keyvals: &[LogValue]) -> Arc<dyn Logger> {
    if keyvals.is_empty() {
        return logger;
    }

    Arc::new(ContextLogger {
        inner: logger,
        keyvals: keyvals.to_vec(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
