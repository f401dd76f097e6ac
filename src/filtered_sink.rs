//! Level-filtered sink
//!
//! Wraps a destination with a list of [`Condition`]s. A level-aware write only
//! reaches the destination when every condition accepts the record's level;
//! rejected records are dropped silently and reported as fully written.

use crate::condition::Condition;
use crate::errors::LogResult;
use crate::level::Level;
use crate::sink::LogSink;
use std::sync::Arc;

pub struct LevelFilteredSink {
    dest: Arc<dyn LogSink>,
    conditions: Vec<Condition>,
}

impl LevelFilteredSink {
    /// # Panics
    ///
    /// Panics when `conditions` is empty. A filter without conditions is a
    /// caller defect, not a runtime condition.
    pub fn new(dest: Arc<dyn LogSink>, conditions: Vec<Condition>) -> Self {
        assert!(
            !conditions.is_empty(),
            "level-filtered sink requires at least one condition"
        );
        Self { dest, conditions }
    }

    pub fn accepts(&self, level: Level) -> bool {
        self.conditions.iter().all(|cond| cond.evaluate(level))
    }
}

impl LogSink for LevelFilteredSink {
    /// Writes without consulting the conditions.
    fn write(&self, buf: &[u8]) -> LogResult<usize> {
        self.dest.write(buf)
    }

    fn write_level(&self, level: Level, buf: &[u8]) -> LogResult<usize> {
        if !self.accepts(level) {
            return Ok(buf.len());
        }
        self.dest.write(buf)
    }

    fn close(&self) -> LogResult<()> {
        self.dest.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LogError;
    use crate::sink::MemorySink;

    fn filtered(conditions: Vec<Condition>) -> (MemorySink, LevelFilteredSink) {
        let mem = MemorySink::new();
        let sink = LevelFilteredSink::new(Arc::new(mem.clone()), conditions);
        (mem, sink)
    }

    #[test]
    fn delivers_only_when_every_condition_accepts() {
        let conditions = vec![
            Condition::at_least(Level::Info),
            Condition::below(Level::Error),
        ];
        for level in Level::ALL {
            let (mem, sink) = filtered(conditions.clone());
            let written = sink.write_level(level, b"record").unwrap();
            assert_eq!(written, 6);
            let expected = conditions.iter().all(|c| c.evaluate(level));
            assert_eq!(!mem.is_empty(), expected, "level {level:?}");
        }
    }

    #[test]
    fn absent_condition_rejects_everything() {
        let (mem, sink) = filtered(vec![Condition::always(), Condition::absent()]);
        assert_eq!(sink.write_level(Level::Panic, b"dropped").unwrap(), 7);
        assert!(mem.is_empty());
    }

    #[test]
    fn plain_write_bypasses_conditions() {
        let (mem, sink) = filtered(vec![Condition::exactly(Level::Fatal)]);
        sink.write(b"raw").unwrap();
        sink.write_level(Level::Info, b"filtered").unwrap();
        assert_eq!(mem.contents_string(), "raw");
    }

    #[test]
    #[should_panic(expected = "at least one condition")]
    fn empty_condition_list_panics() {
        let _ = LevelFilteredSink::new(Arc::new(MemorySink::new()), Vec::new());
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn write(&self, _buf: &[u8]) -> LogResult<usize> {
            Err(LogError::closed("failing"))
        }

        fn close(&self) -> LogResult<()> {
            Err(LogError::closed("failing"))
        }
    }

    #[test]
    fn destination_errors_propagate_only_for_accepted_records() {
        let sink =
            LevelFilteredSink::new(Arc::new(FailingSink), vec![Condition::at_least(Level::Warn)]);
        assert!(sink.write_level(Level::Info, b"x").is_ok());
        assert!(sink.write_level(Level::Warn, b"x").is_err());
        assert!(sink.close().is_err());
    }
}
