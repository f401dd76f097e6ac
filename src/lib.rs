//! Library root for the `logweave` crate
//! Level-filtered multi-sink logging with rotating files and explicit propagation

// Core error handling
pub mod errors;

// Severity and filtering
pub mod condition;
pub mod level;

// Sinks
pub mod console_sink;
pub mod file_sink;
pub mod filtered_sink;
pub mod sink;

// Logger & propagation
pub mod context;
pub mod logger;

// Adapters from other logging APIs
pub mod bridge;

// Configuration & CLI
pub mod cli;
pub mod config;


pub use condition::Condition;
pub use console_sink::SplitConsoleSink;
pub use context::LogContext;
pub use errors::{LogError, LogResult};
pub use file_sink::{FileSinkOptions, RotatingFileSink};
pub use filtered_sink::LevelFilteredSink;
pub use level::Level;
pub use logger::Logger;
pub use sink::{DiscardSink, LogSink, MemorySink, StreamSink};
