//! Logger handle
//!
//! A [`Logger`] owns an ordered, fixed set of sinks and an atomically
//! replaceable minimum level. Dispatch hands a rendered record to every sink's
//! level-aware write; a failing sink never keeps the others from receiving the
//! record, and all failures come back together.

use crate::context::LogContext;
use crate::errors::{LogError, LogResult};
use crate::level::Level;
use crate::sink::{DiscardSink, LogSink};
use std::fmt;
use std::fmt::Write as _;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicI8, Ordering};
use std::sync::Arc;

/// Scope token for the logger stored in a [`LogContext`].
struct LoggerKey;

pub struct Logger {
    sinks: Vec<Arc<dyn LogSink>>,
    level: AtomicI8,
    include_caller: bool,
    closed: AtomicBool,
}

impl Logger {
    /// Creates a logger over `sinks`. An empty sink list gets a single [`DiscardSink`].
    ///
    /// Caller locations are rendered when `include_caller` is set or when the
    /// level is [`Level::Debug`] or lower.
    pub fn new(level: Level, include_caller: bool, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        let sinks = if sinks.is_empty() {
            vec![Arc::new(DiscardSink) as Arc<dyn LogSink>]
        } else {
            sinks
        };
        Self {
            sinks,
            level: AtomicI8::new(level.as_i8()),
            include_caller,
            closed: AtomicBool::new(false),
        }
    }

    /// Logger that drops everything.
    pub fn discard() -> Self {
        Self::new(Level::Disabled, false, Vec::new())
    }

    pub fn level(&self) -> Level {
        decode_level(self.level.load(Ordering::Acquire))
    }

    /// Swaps in a new minimum level and returns the previous one.
    pub fn replace_level(&self, level: Level) -> Level {
        decode_level(self.level.swap(level.as_i8(), Ordering::AcqRel))
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.level() <= Level::Debug
    }

    pub fn includes_caller(&self) -> bool {
        self.include_caller || self.level() <= Level::Debug
    }

    /// Whether a record at `level` would reach the sinks.
    pub fn enabled(&self, level: Level) -> bool {
        !self.closed.load(Ordering::Acquire) && level != Level::Disabled && level >= self.level()
    }

    pub fn sinks(&self) -> &[Arc<dyn LogSink>] {
        &self.sinks
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Hands an already rendered record to every sink.
    ///
    /// Records below the current level, and any record once the logger is
    /// closed, are dropped without error.
    pub fn dispatch(&self, level: Level, record: &[u8]) -> LogResult<()> {
        if !self.enabled(level) {
            return Ok(());
        }

        let failures: Vec<LogError> = self
            .sinks
            .iter()
            .filter_map(|sink| sink.write_level(level, record).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LogError::Dispatch { failures })
        }
    }

    /// Renders `message` as a single line and dispatches it.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) -> LogResult<()> {
        let caller = Location::caller();
        self.log_from(level, Some((caller.file(), caller.line())), message)
    }

    /// Like [`Logger::log`], with the caller location supplied by the adapter
    /// that produced the record.
    pub fn log_from(
        &self,
        level: Level,
        caller: Option<(&str, u32)>,
        message: impl fmt::Display,
    ) -> LogResult<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        let record = self.render(level, &message, caller);
        self.dispatch(level, record.as_bytes())
    }

    #[track_caller]
    pub fn trace(&self, message: impl fmt::Display) -> LogResult<()> {
        self.log(Level::Trace, message)
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) -> LogResult<()> {
        self.log(Level::Debug, message)
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) -> LogResult<()> {
        self.log(Level::Info, message)
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) -> LogResult<()> {
        self.log(Level::Warn, message)
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) -> LogResult<()> {
        self.log(Level::Error, message)
    }

    fn render(
        &self,
        level: Level,
        message: &dyn fmt::Display,
        caller: Option<(&str, u32)>,
    ) -> String {
        let mut line = String::new();
        if level != Level::NoLevel {
            let _ = write!(line, "{level}: ");
        }
        if let Some((file, line_no)) = caller.filter(|_| self.includes_caller()) {
            let _ = write!(line, "{file}:{line_no}: ");
        }
        let _ = write!(line, "{message}");
        if !line.ends_with('\n') {
            line.push('\n');
        }
        line
    }

    /// Closes every sink, best effort.
    ///
    /// All sinks are attempted even when some fail; failures are returned
    /// together. Later dispatches are discarded and a second call does nothing.
    pub fn close(&self) -> LogResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let failures: Vec<LogError> = self
            .sinks
            .iter()
            .filter_map(|sink| sink.close().err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LogError::Close { failures })
        }
    }

    /// Derives a context carrying this logger. The parent context is unchanged.
    pub fn attach(self: &Arc<Self>, ctx: &LogContext) -> LogContext {
        ctx.with_value::<LoggerKey, Logger>(Arc::clone(self))
    }

    /// Logger attached to `ctx`, or a fresh discard logger when there is none.
    pub fn from_context(ctx: &LogContext) -> Arc<Logger> {
        ctx.value::<LoggerKey, Logger>()
            .unwrap_or_else(|| Arc::new(Logger::discard()))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("include_caller", &self.include_caller)
            .field("sinks", &self.sinks.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn decode_level(code: i8) -> Level {
    Level::try_from(code).unwrap_or(Level::Disabled)
}
