//! Error types for encoding and configuration.

use thiserror::Error;

/// Errors produced while rendering or parsing ordered key-value maps.
///
/// Values carry their own encoding result (a custom serializer may fail when
/// the value is captured), so this type is `Clone` and comparable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A structured value's serializer returned an error.
    #[error("failed to serialize value: {0}")]
    Serialize(String),
    /// A text-marshaled value returned an error.
    #[error("failed to marshal text: {0}")]
    Text(String),
    /// Input was not a JSON object.
    #[error("invalid JSON object: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

/// Errors that can occur when loading or parsing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was invalid.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
