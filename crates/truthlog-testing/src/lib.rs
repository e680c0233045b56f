//! # truthlog-testing
//!
//! Verify structured log output against truth transcripts.
//!
//! A [`TestLogger`] is handed to the code under test in place of a real
//! logger. Each call is rendered to its canonical `<level> <json>` line and
//! compared with the next line of the transcript. Mismatches are reported
//! through a [`TestRunner`] as `-want +got` diffs, and on failure the actual
//! output is written next to the transcript.
//!
//! - [`logger`]: the verification engine and its builder
//! - [`deferred`]: buffer-then-promote file writer for actual output
//! - [`diff`]: diagnostic rendering
//! - [`runner`]: the runner seam plus recording and panicking runners

#![deny(unsafe_code)]

pub mod deferred;
pub mod diff;
pub mod errors;
pub mod logger;
pub mod runner;

pub use deferred::DeferredFileWriter;
pub use errors::{HarnessError, Result};
pub use logger::{FieldIgnoreFunc, TestLogger, TestLoggerBuilder, parse_line};
pub use runner::{PanicRunner, RecordingRunner, TestRunner};
