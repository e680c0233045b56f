//! Forwarding `tracing` events into a [`Logger`].
//!
//! [`LoggerLayer`] implements [`tracing_subscriber::Layer`]. Each event
//! becomes one logger call: the event message is sent as the `msg` field,
//! followed by the remaining fields in recorded order. Levels map
//! TRACE→trace, DEBUG→debug, INFO→info, and WARN/ERROR→error.
//!
//! Code instrumented with `tracing` can therefore be checked against a truth
//! transcript by installing this layer in front of a test logger.

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::level::Level;
use crate::logger::Logger;
use crate::logmap::LogValue;

/// Field name used for the event message.
pub const MESSAGE_KEY: &str = "msg";

/// Map a `tracing` level onto the four logger levels.
pub fn level_from_tracing(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::TRACE,
        tracing::Level::DEBUG => Level::DEBUG,
        tracing::Level::INFO => Level::INFO,
        tracing::Level::WARN | tracing::Level::ERROR => Level::ERROR,
    }
}

/// Layer that forwards events to a [`Logger`].
pub struct LoggerLayer<L> {
    logger: L,
}

impl<L: Logger + 'static> LoggerLayer<L> {
    /// Forward events to `logger`.
    pub fn new(logger: L) -> Self {
        Self { logger }
    }
}

/// Visitor that collects the message and fields of an event.
#[derive(Default)]
struct KeyvalVisitor {
    message: Option<String>,
    fields: Vec<LogValue>,
}

impl KeyvalVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push(LogValue::Plain(field.name().to_string()));
            self.fields.push(LogValue::Plain(value));
        }
    }

    fn into_keyvals(self) -> Vec<LogValue> {
        let mut keyvals = Vec::with_capacity(self.fields.len() + 2);
        if let Some(message) = self.message {
            keyvals.push(LogValue::Plain(MESSAGE_KEY.to_string()));
            keyvals.push(LogValue::Plain(message));
        }
        keyvals.extend(self.fields);
        keyvals
    }
}

impl Visit for KeyvalVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

impl<S, L> Layer<S> for LoggerLayer<L>
where
    S: Subscriber,
    L: Logger + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = KeyvalVisitor::default();
        event.record(&mut visitor);
        self.logger.log(
            level_from_tracing(event.metadata().level()),
            &visitor.into_keyvals(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
