//! Sink capability contract and the basic sinks
//!
//! A sink receives raw, already rendered record bytes. Loggers hold sinks as
//! `Arc<dyn LogSink>` and call them from any thread, so every method takes
//! `&self` and implementations guard their own state.

use crate::errors::{LogResult, SafeLock};
use crate::level::Level;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Appends `buf` unconditionally.
    fn write(&self, buf: &[u8]) -> LogResult<usize>;

    /// Level-aware write. Sinks without filtering write everything.
    fn write_level(&self, level: Level, buf: &[u8]) -> LogResult<usize> {
        let _ = level;
        self.write(buf)
    }

    /// Flushes and releases the sink. Sinks with nothing to release succeed.
    fn close(&self) -> LogResult<()> {
        Ok(())
    }
}

/// Sink that drops every record and reports full success.
#[derive(Debug, Clone, Default)]
pub struct DiscardSink;

impl LogSink for DiscardSink {
    #[inline]
    fn write(&self, buf: &[u8]) -> LogResult<usize> {
        Ok(buf.len())
    }
}

/// Sink over any `std::io::Write`, serialized by a mutex.
pub struct StreamSink<W: Write + Send> {
    name: &'static str,
    out: Mutex<W>,
}

impl<W: Write + Send> StreamSink<W> {
    pub fn new(name: &'static str, out: W) -> Self {
        Self {
            name,
            out: Mutex::new(out),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl StreamSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new("stdout", std::io::stdout())
    }
}

impl StreamSink<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new("stderr", std::io::stderr())
    }
}

impl<W: Write + Send> LogSink for StreamSink<W> {
    fn write(&self, buf: &[u8]) -> LogResult<usize> {
        let mut out = self.out.safe_lock()?;
        out.write_all(buf)?;
        Ok(buf.len())
    }

    fn close(&self) -> LogResult<()> {
        self.out.safe_lock()?.flush()?;
        Ok(())
    }
}

/// In-memory sink sharing its buffer between clones.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().map(|b| b.is_empty()).unwrap_or(true)
    }
}

impl LogSink for MemorySink {
    fn write(&self, buf: &[u8]) -> LogResult<usize> {
        self.buf.safe_lock()?.extend_from_slice(buf);
        Ok(buf.len())
    }
}
