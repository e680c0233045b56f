//! Ordered key-value maps for log messages.
//!
//! A log call passes interleaved keys and values. [`MapSlice::from_keyvals`]
//! pairs them up in call order, and [`MapSlice::to_json_string`] renders the
//! result as a single JSON object that keeps field order and duplicate keys.
//!
//! # Value capabilities
//!
//! Each value is captured as a [`LogValue`], tried in this order:
//!
//! 1. [`Json`] wraps any `Serialize` type and embeds it as nested JSON, with
//!    fields in the order the type serializes them.
//! 2. [`Text`] wraps a [`TextMarshaler`] and embeds its text as a JSON string.
//! 3. Everything else is stringified with `Display`.
//!
//! # Parsing
//!
//! [`MapSlice::from_json`] parses a rendered object back into a `MapSlice`.
//! Entries pass through an unordered map, so every parsed value is stamped
//! with a process-wide sequence number and the entries are sorted by stamp
//! afterwards.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::EncodeError;

/// Value inserted for a trailing key that has no value.
pub const MISSING_VALUE: &str = "missing";

/// Text rendering used for `None` values.
pub const NIL_VALUE: &str = "<nil>";

/// Boxed error returned by [`TextMarshaler`] implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Types with a custom text encoding, emitted as a JSON string.
pub trait TextMarshaler {
    /// Encode `self` as text.
    fn marshal_text(&self) -> Result<String, BoxError>;
}

/// A captured log value.
#[derive(Clone, Debug, PartialEq)]
pub enum LogValue {
    /// Nested JSON from a `Serialize` implementation.
    Structured(Result<serde_json::Value, EncodeError>),
    /// Custom text from a [`TextMarshaler`].
    Text(Result<String, EncodeError>),
    /// Default stringification.
    Plain(String),
}

impl LogValue {
    /// Capture a value by its `Display` output.
    pub fn plain(value: impl Display) -> Self {
        Self::Plain(value.to_string())
    }

    /// Capture a value by serializing it to nested JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::Structured(serde_json::to_value(value).map_err(EncodeError::from))
    }

    /// Capture a value by its custom text encoding.
    pub fn text<T: TextMarshaler + ?Sized>(value: &T) -> Self {
        Self::Text(
            value
                .marshal_text()
                .map_err(|e| EncodeError::Text(e.to_string())),
        )
    }

    /// Canonical string form used when comparing field values.
    ///
    /// Strings yield their content; other structured values yield compact
    /// JSON.
    pub fn string_form(&self) -> Result<String, EncodeError> {
        match self {
            Self::Plain(s) | Self::Text(Ok(s)) => Ok(s.clone()),
            Self::Structured(Ok(serde_json::Value::String(s))) => Ok(s.clone()),
            Self::Structured(Ok(v)) => Ok(v.to_string()),
            Self::Text(Err(e)) | Self::Structured(Err(e)) => Err(e.clone()),
        }
    }

    fn key_string(&self) -> String {
        self.string_form().unwrap_or_else(|e| e.to_string())
    }

    fn write_json(&self, out: &mut String) -> Result<(), EncodeError> {
        match self {
            Self::Plain(s) | Self::Text(Ok(s)) => out.push_str(&serde_json::to_string(s)?),
            Self::Structured(Ok(v)) => out.push_str(&serde_json::to_string(v)?),
            Self::Text(Err(e)) | Self::Structured(Err(e)) => return Err(e.clone()),
        }
        Ok(())
    }
}

/// Conversion of call-site arguments into [`LogValue`]s.
pub trait ToLogValue {
    /// Capture `self` as a log value.
    fn to_log_value(&self) -> LogValue;
}

impl ToLogValue for LogValue {
    fn to_log_value(&self) -> LogValue {
        self.clone()
    }
}

impl ToLogValue for str {
    fn to_log_value(&self) -> LogValue {
        LogValue::Plain(self.to_owned())
    }
}

impl ToLogValue for String {
    fn to_log_value(&self) -> LogValue {
        LogValue::Plain(self.clone())
    }
}

macro_rules! display_log_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToLogValue for $ty {
                fn to_log_value(&self) -> LogValue {
                    LogValue::plain(self)
                }
            }
        )*
    };
}

display_log_value!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl<T: ToLogValue + ?Sized> ToLogValue for &T {
    fn to_log_value(&self) -> LogValue {
        (**self).to_log_value()
    }
}

impl<T: ToLogValue> ToLogValue for Option<T> {
    fn to_log_value(&self) -> LogValue {
        match self {
            Some(v) => v.to_log_value(),
            None => LogValue::Plain(NIL_VALUE.to_string()),
        }
    }
}

/// Sequences render as `[a b c]`.
impl<T: Display> ToLogValue for [T] {
    fn to_log_value(&self) -> LogValue {
        let parts: Vec<String> = self.iter().map(ToString::to_string).collect();
        LogValue::Plain(format!("[{}]", parts.join(" ")))
    }
}

impl<T: Display> ToLogValue for Vec<T> {
    fn to_log_value(&self) -> LogValue {
        self.as_slice().to_log_value()
    }
}

/// Wrapper that logs a `Serialize` value as nested JSON.
#[derive(Clone, Debug)]
pub struct Json<T>(pub T);

impl<T: Serialize> ToLogValue for Json<T> {
    fn to_log_value(&self) -> LogValue {
        LogValue::json(&self.0)
    }
}

/// Wrapper that logs a [`TextMarshaler`] value as a JSON string.
#[derive(Clone, Debug)]
pub struct Text<T>(pub T);

impl<T: TextMarshaler> ToLogValue for Text<T> {
    fn to_log_value(&self) -> LogValue {
        LogValue::text(&self.0)
    }
}

/// Wrapper that logs a value by its `Debug` output.
#[derive(Clone)]
pub struct Dbg<T>(pub T);

impl<T: fmt::Debug> ToLogValue for Dbg<T> {
    fn to_log_value(&self) -> LogValue {
        LogValue::Plain(format!("{:?}", self.0))
    }
}

/// Build a `[LogValue; N]` from interleaved keys and values.
///
/// ```ignore
/// logger.info(&kv!("msg", "Connected.", "attempts", 3));
/// ```
#[macro_export]
macro_rules! kv {
    ($($value:expr),* $(,)?) => {
        [$($crate::logmap::ToLogValue::to_log_value(&$value)),*]
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// MapSlice
// ─────────────────────────────────────────────────────────────────────────────

/// One key-value entry of a log message.
#[derive(Clone, Debug, PartialEq)]
pub struct MapItem {
    /// Field name.
    pub key: String,
    /// Field value.
    pub value: LogValue,
}

impl MapItem {
    /// Create an entry.
    pub fn new(key: impl Into<String>, value: LogValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Ordered key-value entries. Keys may repeat.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapSlice(Vec<MapItem>);

impl MapSlice {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up interleaved keys and values.
    ///
    /// A trailing key without a value gets [`MISSING_VALUE`].
    pub fn from_keyvals(keyvals: &[LogValue]) -> Self {
        let items = keyvals
            .chunks(2)
            .map(|pair| {
                let value = pair
                    .get(1)
                    .cloned()
                    .unwrap_or_else(|| LogValue::Plain(MISSING_VALUE.to_string()));
                MapItem::new(pair[0].key_string(), value)
            })
            .collect();
        Self(items)
    }

    /// Parse a JSON object, restoring its field order.
    pub fn from_json(json: &str) -> Result<Self, EncodeError> {
        let mut out = Self::new();
        out.extend_from_json(json)?;
        Ok(out)
    }

    /// Append the entries of a JSON object, in their original order.
    pub fn extend_from_json(&mut self, json: &str) -> Result<(), EncodeError> {
        let parsed: HashMap<String, IndexedValue> =
            serde_json::from_str(json).map_err(|e| EncodeError::Parse(e.to_string()))?;

        let mut sorted: Vec<(String, IndexedValue)> = parsed.into_iter().collect();
        sorted.sort_by_key(|(_, v)| v.index);

        self.0.extend(
            sorted
                .into_iter()
                .map(|(key, v)| MapItem::new(key, LogValue::Structured(Ok(v.value)))),
        );
        Ok(())
    }

    /// Append an entry.
    pub fn push(&mut self, item: MapItem) {
        self.0.push(item);
    }

    /// Consume the map and return its entries.
    pub fn into_inner(self) -> Vec<MapItem> {
        self.0
    }

    /// Render as a JSON object terminated by a single newline.
    ///
    /// HTML characters are not escaped. Fails without partial output if any
    /// value failed to serialize.
    pub fn to_json_string(&self) -> Result<String, EncodeError> {
        let mut out = String::from("{");
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&serde_json::to_string(&item.key)?);
            out.push(':');
            item.value.write_json(&mut out)?;
        }
        out.push_str("}\n");
        Ok(out)
    }

    /// Field names mapped to their canonical string values.
    ///
    /// Values that failed to encode map to their error text.
    pub fn to_string_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|item| {
                let value = item
                    .value
                    .string_form()
                    .unwrap_or_else(|e| e.to_string());
                (item.key.clone(), value)
            })
            .collect()
    }
}

impl Deref for MapSlice {
    type Target = [MapItem];

    fn deref(&self) -> &[MapItem] {
        &self.0
    }
}

impl FromIterator<MapItem> for MapSlice {
    fn from_iter<I: IntoIterator<Item = MapItem>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MapSlice {
    type Item = MapItem;
    type IntoIter = std::vec::IntoIter<MapItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

static INDEX_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_index() -> u64 {
    INDEX_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// A parsed JSON value stamped with its parse sequence number.
struct IndexedValue {
    value: serde_json::Value,
    index: u64,
}

impl<'de> Deserialize<'de> for IndexedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self {
            value,
            index: next_index(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
