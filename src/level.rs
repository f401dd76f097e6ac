//! Severity levels
//!
//! Levels carry a stable `i8` code; ordering follows the code so that
//! `Trace < Debug < Info < Warn < Error < Fatal < Panic`, with the `NoLevel`
//! and `Disabled` sentinels sorting above every real severity.

use crate::errors::{LogError, LogResult};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Level classifies the severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i8)]
pub enum Level {
    Trace = -1,
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Panic = 5,
    /// The record carries no severity.
    #[default]
    NoLevel = 6,
    /// Suppress everything.
    Disabled = 7,
}

impl Level {
    /// Every defined level, in ascending order.
    pub const ALL: [Level; 9] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
        Level::NoLevel,
        Level::Disabled,
    ];

    /// Parse a level name. Unknown text is an error; no level is guessed.
    pub fn parse(input: &str) -> LogResult<Level> {
        match input.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            "" => Ok(Level::NoLevel),
            "disabled" => Ok(Level::Disabled),
            other => other
                .parse::<i8>()
                .ok()
                .and_then(|code| Level::try_from(code).ok())
                .ok_or_else(|| LogError::parse(input)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
            Level::NoLevel => "",
            Level::Disabled => "disabled",
        }
    }

    /// Binary code of the level.
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

impl TryFrom<i8> for Level {
    type Error = LogError;

    fn try_from(code: i8) -> LogResult<Level> {
        Level::ALL
            .iter()
            .copied()
            .find(|level| level.as_i8() == code)
            .ok_or_else(|| LogError::parse(code.to_string()))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> LogResult<Level> {
        Level::parse(s)
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Accepts level names and numeric codes, so `LOGWEAVE_LEVEL=3` works as
/// well as `LOGWEAVE_LEVEL=error`.
impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        deserializer.deserialize_any(LevelVisitor)
    }
}

struct LevelVisitor;

impl<'de> Visitor<'de> for LevelVisitor {
    type Value = Level;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a level name or a level code between -1 and 7")
    }

    fn visit_str<E: de::Error>(self, text: &str) -> Result<Level, E> {
        Level::parse(text).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, code: i64) -> Result<Level, E> {
        i8::try_from(code)
            .ok()
            .and_then(|code| Level::try_from(code).ok())
            .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(code), &self))
    }

    fn visit_u64<E: de::Error>(self, code: u64) -> Result<Level, E> {
        i8::try_from(code)
            .ok()
            .and_then(|code| Level::try_from(code).ok())
            .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(code), &self))
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Level {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Level {
        match *level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            tracing::Level::DEBUG => Level::Debug,
            _ => Level::Trace,
        }
    }
}
