//! # truthlog-core
//!
//! Leveled structured logging with ordered key-value JSON encoding.
//!
//! - [`Level`]: bitmask of the four severities (trace, debug, info, error)
//! - [`logmap`]: interleaved key-value capture and order-preserving JSON
//! - [`Logger`]: the four-method logging trait, with [`DiscardLogger`] and
//!   the contextual [`with`] wrapper
//! - [`LeveledLogger`]: filters by level and writes `<level> <json>` lines
//! - [`LoggerLayer`]: forwards `tracing` events into any [`Logger`]
//! - [`settings`]: layered harness configuration

#![deny(unsafe_code)]

pub mod bridge;
pub mod errors;
pub mod level;
pub mod leveled;
pub mod logger;
pub mod logmap;
pub mod settings;

pub use bridge::LoggerLayer;
pub use errors::{EncodeError, SettingsError};
pub use level::{Level, ParseLevelError};
pub use leveled::{LeveledLogger, LeveledLoggerBuilder, logging_failure_line};
pub use logger::{ContextLogger, DiscardLogger, Logger, with};
pub use logmap::{Dbg, Json, LogValue, MapItem, MapSlice, Text, TextMarshaler, ToLogValue};
pub use settings::HarnessSettings;
