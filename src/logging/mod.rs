// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logger setup
//!
//! Every record is formatted as `2025-03-24 08:00:00 [INFO] message` and sent
//! to stderr and, once the configuration is known, to a
//! [`NumberedRotatingFile`].
//!
//! The logger is installed before the configuration is read so that loading
//! errors are reported. [`LogHandle::apply`] then attaches the log file and
//! the configured level.

mod rotation;

use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use env_logger::{Builder, Target, WriteStyle, DEFAULT_FILTER_ENV};
use log::{debug, LevelFilter};

use crate::config::LoggingConfig;

pub use rotation::NumberedRotatingFile;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type SharedFile = Arc<Mutex<Option<NumberedRotatingFile>>>;

/// Writer duplicating log output to stderr and the optional log file
struct LogSink {
    file: SharedFile,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = io::stderr().write_all(buf);
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                file.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        match self.file.lock() {
            Ok(mut file) => match file.as_mut() {
                Some(file) => file.flush(),
                None => Ok(()),
            },
            Err(_) => Ok(()),
        }
    }
}

/// Control over the installed logger
pub struct LogHandle {
    file: SharedFile,
    /// Level set on the command line or through `RUST_LOG`
    level_fixed: bool,
}

impl LogHandle {
    /// Attach the configured log file and, unless the level was fixed at
    /// startup, switch to the configured level.
    pub fn apply(&self, config: &LoggingConfig) -> Result<()> {
        if !self.level_fixed {
            log::set_max_level(parse_level(&config.level)?);
        }
        if let Some(path) = &config.file {
            let rotating = NumberedRotatingFile::open(path, config.max_bytes)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let target = rotating.path().display().to_string();
            let counter = rotating.counter();
            let mut file = self
                .file
                .lock()
                .map_err(|_| anyhow!("Log file lock poisoned"))?;
            *file = Some(rotating);
            drop(file);
            debug!("Logging to {}, next rotation number {}", target, counter);
        }
        Ok(())
    }
}

/// Parse a level name such as `info` or `DEBUG`
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level.trim()).map_err(|_| anyhow!("Unknown log level '{}'", level))
}

/// Install the global logger, writing to stderr only.
///
/// The level comes from `level_override` (command line) when given, then
/// from `RUST_LOG`, then `info` until [`LogHandle::apply`] sets the
/// configured one.
pub fn init_logging(level_override: Option<LevelFilter>) -> Result<LogHandle> {
    let file: SharedFile = Arc::new(Mutex::new(None));

    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Trace)
        .filter_module("hyper", LevelFilter::Info)
        .filter_module("hyper_util", LevelFilter::Info)
        .filter_module("reqwest", LevelFilter::Info);
    let from_env = std::env::var(DEFAULT_FILTER_ENV).ok();
    if let Some(filters) = &from_env {
        builder.parse_filters(filters);
    }
    if let Some(level) = level_override {
        builder.filter_level(level);
    }

    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format(TIMESTAMP_FORMAT),
                record.level(),
                record.args()
            )
        })
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(LogSink {
            file: Arc::clone(&file),
        })))
        .try_init()
        .context("A logger is already installed")?;

    let level_fixed = level_override.is_some() || from_env.is_some();
    if !level_fixed {
        log::set_max_level(LevelFilter::Info);
    }

    Ok(LogHandle { file, level_fixed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN ").unwrap(), LevelFilter::Warn);
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn sink_copies_output_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.log");
        let mut sink = LogSink {
            file: Arc::new(Mutex::new(Some(
                NumberedRotatingFile::open(&path, 1024).unwrap(),
            ))),
        };

        sink.write_all(b"2025-03-24 08:00:00 [INFO] hello\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "2025-03-24 08:00:00 [INFO] hello\n"
        );
    }

    #[test]
    fn log_file_is_attached_after_startup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("main.log");
        let file: SharedFile = Arc::new(Mutex::new(None));
        let mut sink = LogSink {
            file: Arc::clone(&file),
        };
        let handle = LogHandle {
            file,
            level_fixed: true,
        };

        sink.write_all(b"before\n").unwrap();
        handle
            .apply(&LoggingConfig {
                file: Some(path.clone()),
                ..LoggingConfig::default()
            })
            .unwrap();
        sink.write_all(b"after\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
    }
}
