use crate::bridge::LegacyWriter;
use crate::config::LoggingConfig;
use crate::file_sink::RotatingFileSink;
use crate::level::Level;
use crate::sink::LogSink;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level CLI interface for logweave
#[derive(Parser)]
#[command(
    name = "logweave",
    version,
    about = "Route log records to console and rotating files by severity"
)]
pub struct Cli {
    /// TOML configuration file, layered under LOGWEAVE_* environment variables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit a single record through the configured sinks
    Emit {
        #[arg(short, long, default_value = "info")]
        level: Level,
        message: String,
    },

    /// Forward stdin lines as debug records, stripping legacy timestamps
    Pipe,

    /// Force rotation of the configured log file
    Rotate,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = LoggingConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Emit { level, message } => {
            let logger = config.build_logger()?;
            let sent = logger.log(level, &message);
            logger.close()?;
            sent?;
        }
        Commands::Pipe => {
            let logger = Arc::new(config.build_logger()?);
            let mut writer = LegacyWriter::new(logger.clone());
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("reading stdin")?;
                writer.write_all(format!("{line}\n").as_bytes())?;
            }
            logger.close()?;
        }
        Commands::Rotate => {
            let file = config
                .file
                .as_ref()
                .context("no [file] section configured")?;
            let sink = RotatingFileSink::new(file.to_options()?)?;
            sink.rotate()?;
            sink.close()?;
            tracing::info!(path = %file.path.display(), "rotated log file");
        }
    }

    Ok(())
}
