//! Error handling for the logging façade
//!
//! Construction failures, sink write failures and shutdown failures all
//! surface as [`LogError`]. Dropping a record at the filter stage is never an
//! error and has no variant here.

use thiserror::Error;

/// Main error type for sinks and loggers
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Log path error: {path} - {message}")]
    Path {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Log permissions error: {path}")]
    Permissions {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sink is closed: {sink}")]
    Closed { sink: String },

    #[error("Write of {len} bytes exceeds maximum file size of {max} bytes")]
    WriteTooLarge { len: usize, max: u64 },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown level: {input:?}")]
    Parse { input: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Mutex lock failed: {resource}")]
    MutexPoisoned { resource: String },

    #[error("Dispatch failed on {} sink(s)", .failures.len())]
    Dispatch { failures: Vec<LogError> },

    #[error("Close failed on {} sink(s)", .failures.len())]
    Close { failures: Vec<LogError> },
}

/// Result alias used throughout the crate
pub type LogResult<T> = Result<T, LogError>;

impl LogError {
    /// Create a path error
    pub fn path(
        path: impl Into<String>,
        message: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        Self::Path {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a permissions error
    pub fn permissions(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Permissions {
            path: path.into(),
            source,
        }
    }

    /// Create a closed-sink error
    pub fn closed(sink: impl Into<String>) -> Self {
        Self::Closed { sink: sink.into() }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a level parse error
    pub fn parse(input: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Individual failures carried by an aggregate error, empty otherwise.
    pub fn failures(&self) -> &[LogError] {
        match self {
            Self::Dispatch { failures } | Self::Close { failures } => failures,
            _ => &[],
        }
    }
}

/// Helper trait for safe mutex operations
///
/// Returns a [`LogError`] on a poisoned lock instead of panicking.
pub trait SafeLock<T: ?Sized> {
    fn safe_lock(&self) -> LogResult<std::sync::MutexGuard<'_, T>>;
}

impl<T: ?Sized> SafeLock<T> for std::sync::Mutex<T> {
    fn safe_lock(&self) -> LogResult<std::sync::MutexGuard<'_, T>> {
        self.lock().map_err(|_| LogError::MutexPoisoned {
            resource: "sink_mutex".to_string(),
        })
    }
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        LogError::io("io_operation", err)
    }
}

impl From<figment::Error> for LogError {
    fn from(err: figment::Error) -> Self {
        LogError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LogError::closed("file:/tmp/app.log");
        assert!(err.to_string().contains("Sink is closed"));

        let err = LogError::parse("loud");
        assert_eq!(err.to_string(), "Unknown level: \"loud\"");
    }

    #[test]
    fn test_error_chaining() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = LogError::permissions("/var/log/app.log", io_err);

        assert!(err.source().is_some());
        assert!(err.to_string().contains("/var/log/app.log"));
    }

    #[test]
    fn test_aggregate_failures() {
        let err = LogError::Dispatch {
            failures: vec![LogError::closed("a"), LogError::closed("b")],
        };
        assert_eq!(err.failures().len(), 2);
        assert_eq!(err.to_string(), "Dispatch failed on 2 sink(s)");
        assert!(LogError::closed("c").failures().is_empty());
    }
}
