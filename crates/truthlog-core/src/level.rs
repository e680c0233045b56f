//! Logging levels.
//!
//! [`Level`] is a bitmask: a single bit names one severity, and a
//! combination of bits is a filter. Severities are ordered
//! `trace < debug < info < error`.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use thiserror::Error;

/// A logging severity, or a set of severities used as a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Level(u8);

impl Level {
    /// No levels.
    pub const NONE: Self = Self(0);
    /// Detailed entry/exit points.
    pub const TRACE: Self = Self(1);
    /// Intermediate values, decisions.
    pub const DEBUG: Self = Self(1 << 1);
    /// Outcomes, summaries.
    pub const INFO: Self = Self(1 << 2);
    /// Errors. Conventionally always enabled.
    pub const ERROR: Self = Self(1 << 3);
    /// Default filter: info and error.
    pub const DEFAULT: Self = Self(Self::INFO.0 | Self::ERROR.0);
    /// Every level.
    pub const ALL: Self = Self(0b1111);

    const SINGLES: [(Self, &'static str); 4] = [
        (Self::TRACE, "trace"),
        (Self::DEBUG, "debug"),
        (Self::INFO, "info"),
        (Self::ERROR, "error"),
    ];

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits, discarding unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Whether any bit of `other` is set in `self`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 > 0
    }

    /// Name of a single level, `None` for combinations.
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        Self::SINGLES
            .iter()
            .find(|(lvl, _)| *lvl == self)
            .map(|(_, name)| *name)
    }
}

impl BitOr for Level {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Level {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.as_str() {
            return f.pad(name);
        }
        if *self == Self::NONE {
            return f.pad("none");
        }
        let names: Vec<&str> = Self::SINGLES
            .iter()
            .filter(|(lvl, _)| self.intersects(*lvl))
            .map(|(_, name)| *name)
            .collect();
        f.pad(&names.join("|"))
    }
}

/// Returned when a level name is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parse a level name, or a `|`/`,` separated combination of names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut level = Self::NONE;
        for part in s.split(['|', ',']) {
            level |= match part.trim().to_lowercase().as_str() {
                "trace" => Self::TRACE,
                "debug" => Self::DEBUG,
                "info" => Self::INFO,
                "error" => Self::ERROR,
                "all" => Self::ALL,
                "default" => Self::DEFAULT,
                "none" => Self::NONE,
                _ => return Err(ParseLevelError(s.to_string())),
            };
        }
        Ok(level)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_display() {
        assert_eq!(Level::TRACE.to_string(), "trace");
        assert_eq!(Level::DEBUG.to_string(), "debug");
        assert_eq!(Level::INFO.to_string(), "info");
        assert_eq!(Level::ERROR.to_string(), "error");
    }

    #[test]
    fn level_display_pads() {
        assert_eq!(format!("{:<5}|", Level::INFO), "info |");
        assert_eq!(format!("{:<5}|", Level::ERROR), "error|");
    }

    #[test]
    fn level_display_combination() {
        assert_eq!(Level::DEFAULT.to_string(), "info|error");
        assert_eq!(Level::NONE.to_string(), "none");
    }

    #[test]
    fn level_ordering() {
        assert!(Level::TRACE < Level::DEBUG);
        assert!(Level::DEBUG < Level::INFO);
        assert!(Level::INFO < Level::ERROR);
    }

    #[test]
    fn filter_intersects() {
        assert!(Level::DEFAULT.intersects(Level::INFO));
        assert!(Level::DEFAULT.intersects(Level::ERROR));
        assert!(!Level::DEFAULT.intersects(Level::DEBUG));
        assert!(!Level::NONE.intersects(Level::ERROR));
        assert!(Level::ALL.intersects(Level::TRACE));
    }

    #[test]
    fn from_str_single_and_combined() {
        assert_eq!("trace".parse::<Level>().unwrap(), Level::TRACE);
        assert_eq!("ERROR".parse::<Level>().unwrap(), Level::ERROR);
        assert_eq!(
            "debug|error".parse::<Level>().unwrap(),
            Level::DEBUG | Level::ERROR
        );
        assert_eq!("info, error".parse::<Level>().unwrap(), Level::DEFAULT);
        assert_eq!("all".parse::<Level>().unwrap(), Level::ALL);
    }

    #[test]
    fn from_str_rejects_unknown() {
        let err = "loud".parse::<Level>().unwrap_err();
        assert_eq!(err, ParseLevelError("loud".to_string()));
        assert!("".parse::<Level>().is_err());
    }

    #[test]
    fn from_bits_masks_unknown() {
        assert_eq!(Level::from_bits(0xff), Level::ALL);
        assert_eq!(Level::from_bits(4).bits(), 4);
    }

    #[test]
    fn as_str_only_for_singles() {
        assert_eq!(Level::INFO.as_str(), Some("info"));
        assert_eq!(Level::DEFAULT.as_str(), None);
    }
}
