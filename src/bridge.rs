//! Adapters that funnel other logging APIs into a [`Logger`]
//!
//! * [`LogBridge`] receives records from the `log` crate facade.
//! * [`LoggerLayer`] receives `tracing` events.
//! * [`LegacyWriter`] accepts raw lines from line-oriented writers, strips a
//!   leading `YYYY/MM/DD HH:MM:SS ` stamp and logs the rest at debug level.

use crate::errors::{LogError, LogResult};
use crate::level::Level;
use crate::logger::Logger;
use std::fmt::{self, Write as _};
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// `log` facade backend forwarding to a [`Logger`].
pub struct LogBridge {
    logger: Arc<Logger>,
}

impl LogBridge {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.logger.enabled(Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = Level::from(record.level());
        if !self.logger.enabled(level) {
            return;
        }
        let caller = record.file().zip(record.line());
        if let Err(e) = self.logger.log_from(
            level,
            caller,
            format_args!("[{}] {}", record.target(), record.args()),
        ) {
            tracing::warn!(error = %e, "log bridge dispatch failed");
        }
    }

    fn flush(&self) {}
}

/// Installs a [`LogBridge`] as the global `log` backend.
///
/// The `log` max level is left wide open so that later calls to
/// [`Logger::replace_level`] take effect without reinstalling.
pub fn install_log_bridge(logger: Arc<Logger>) -> LogResult<()> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger)))
        .map_err(|e| LogError::config(format!("log bridge: {e}")))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// `tracing` layer forwarding events to a [`Logger`].
pub struct LoggerLayer {
    logger: Arc<Logger>,
}

impl LoggerLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for LoggerLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from(metadata.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let caller = metadata.file().zip(metadata.line());
        // Failures are dropped here: reporting them through tracing would loop.
        let _ = self.logger.log_from(level, caller, visitor.finish());
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: String,
}

impl EventVisitor {
    fn finish(self) -> String {
        let mut line = self.message;
        line.push_str(&self.fields);
        line
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

// digits are matched by the '0' placeholders
const LEGACY_STAMP: &[u8; 20] = b"0000/00/00 00:00:00 ";

/// Line writer bridge for legacy output that prefixes every line with a
/// local timestamp.
pub struct LegacyWriter {
    logger: Arc<Logger>,
}

impl LegacyWriter {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl io::Write for LegacyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(strip_legacy_stamp(buf));
        self.logger
            .log_from(Level::Debug, None, text)
            .map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn strip_legacy_stamp(buf: &[u8]) -> &[u8] {
    let stamped = buf.len() >= LEGACY_STAMP.len()
        && buf
            .iter()
            .zip(LEGACY_STAMP.iter())
            .all(|(b, p)| if *p == b'0' { b.is_ascii_digit() } else { b == p });
    if stamped {
        &buf[LEGACY_STAMP.len()..]
    } else {
        buf
    }
}
