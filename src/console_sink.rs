//! Console sink split by severity
//!
//! Records below the boundary go to the standard stream and records at or
//! above it go to the error stream. The two branches use complementary
//! conditions, so every level lands on exactly one of them.

use crate::condition::Condition;
use crate::filtered_sink::LevelFilteredSink;
use crate::level::Level;
use crate::sink::{LogSink, StreamSink};
use std::sync::Arc;

pub const DEFAULT_BOUNDARY: Level = Level::Warn;

pub struct SplitConsoleSink {
    boundary: Level,
    low: Arc<LevelFilteredSink>,
    high: Arc<LevelFilteredSink>,
}

impl SplitConsoleSink {
    /// Stdout below [`Level::Warn`], stderr from it upwards.
    pub fn new() -> Self {
        Self::with_boundary(DEFAULT_BOUNDARY)
    }

    pub fn with_boundary(boundary: Level) -> Self {
        Self::with_streams(
            boundary,
            Arc::new(StreamSink::stdout()),
            Arc::new(StreamSink::stderr()),
        )
    }

    /// Splits between arbitrary destinations instead of the process streams.
    pub fn with_streams(boundary: Level, low: Arc<dyn LogSink>, high: Arc<dyn LogSink>) -> Self {
        Self {
            boundary,
            low: Arc::new(LevelFilteredSink::new(low, vec![Condition::below(boundary)])),
            high: Arc::new(LevelFilteredSink::new(high, vec![Condition::at_least(boundary)])),
        }
    }

    pub fn boundary(&self) -> Level {
        self.boundary
    }

    /// Both branches, low first, ready to register with a logger.
    pub fn sinks(&self) -> Vec<Arc<dyn LogSink>> {
        vec![self.low.clone() as Arc<dyn LogSink>, self.high.clone()]
    }
}

impl Default for SplitConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn default_boundary_is_warn() {
        assert_eq!(SplitConsoleSink::new().boundary(), Level::Warn);
        assert_eq!(SplitConsoleSink::default().sinks().len(), 2);
    }

    #[test]
    fn every_level_reaches_exactly_one_branch() {
        for boundary in Level::ALL {
            let split = SplitConsoleSink::with_streams(
                boundary,
                Arc::new(MemorySink::new()),
                Arc::new(MemorySink::new()),
            );
            for level in Level::ALL {
                let hits = [split.low.accepts(level), split.high.accepts(level)];
                assert_eq!(
                    hits.iter().filter(|h| **h).count(),
                    1,
                    "boundary {boundary:?} level {level:?}"
                );
                assert_eq!(hits[1], level >= boundary);
            }
        }
    }

    #[test]
    fn records_route_by_boundary() {
        let out = MemorySink::new();
        let err = MemorySink::new();
        let (low, high): (Arc<dyn LogSink>, Arc<dyn LogSink>) =
            (Arc::new(out.clone()), Arc::new(err.clone()));
        let split = SplitConsoleSink::with_streams(Level::Warn, low, high);

        for sink in split.sinks() {
            sink.write_level(Level::Info, b"info\n").unwrap();
            sink.write_level(Level::Warn, b"warn\n").unwrap();
            sink.write_level(Level::Fatal, b"fatal\n").unwrap();
        }

        assert_eq!(out.contents_string(), "info\n");
        assert_eq!(err.contents_string(), "warn\nfatal\n");
    }
}
