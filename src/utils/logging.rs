//! Logging Module
//!
//! Two separate sinks live here:
//! - structured diagnostics through the `tracing` crate, initialised once by the binary
//! - [`RunLogger`], the per-run text log that is echoed to the console and written to
//!   disk in one piece when the run finishes

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::utils::error::Result;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Create a verbose logging config for debugging
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            ansi_colors: true,
        }
    }

    /// Create a quiet logging config (errors only)
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            include_target: false,
            ansi_colors: true,
        }
    }
}

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Initialize logging with the given configuration
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> std::result::Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level.to_tracing_level())
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Append-only run log with a console echo and a buffered file sink
///
/// Nothing reaches the file until [`RunLogger::save`], which consumes the logger.
/// A run that aborts before saving loses its log.
#[derive(Debug)]
pub struct RunLogger {
    path: PathBuf,
    buffer: Vec<String>,
    console: bool,
}

impl RunLogger {
    /// Create a logger that echoes every verbose line to stdout
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            buffer: Vec::new(),
            console: true,
        }
    }

    /// Create a logger that only buffers
    pub fn silent<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            console: false,
            ..Self::new(path)
        }
    }

    /// Add a line terminated by a newline, echoed to the console
    pub fn add(&mut self, text: impl AsRef<str>) {
        self.add_with(text, "\n", true);
    }

    /// Add `text` followed by `end`; echo only when `verbose`
    pub fn add_with(&mut self, text: impl AsRef<str>, end: &str, verbose: bool) {
        let text = text.as_ref();
        if verbose && self.console {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{}{}", text, end);
            let _ = stdout.flush();
        }
        tracing::debug!(target: "run_log", "{}", text);
        self.buffer.push(format!("{}{}", text, end));
    }

    /// Buffered entries, each including its terminator
    pub fn entries(&self) -> &[String] {
        &self.buffer
    }

    /// Full buffered text as it will be written by `save`
    pub fn contents(&self) -> String {
        self.buffer.concat()
    }

    /// Destination of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole buffer to the log path, replacing any previous content
    pub fn save(self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, self.contents())?;
        tracing::info!("Run log saved to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(LogConfig::quiet().level, LogLevel::Error);
    }

    #[test]
    fn test_run_logger_buffers_terminators() {
        let mut logger = RunLogger::silent("unused.txt");
        logger.add_with("Correct: true", " ", true);
        logger.add("Predict: 3");
        logger.add_with("hidden", "\n", false);

        assert_eq!(logger.entries().len(), 3);
        assert_eq!(logger.contents(), "Correct: true Predict: 3\nhidden\n");
    }

    #[test]
    fn test_run_logger_save_overwrites() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("logs/run.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale content that is much longer than the new log\n").unwrap();

        let mut logger = RunLogger::silent(&path);
        logger.add("Total frames: 2");
        logger.save().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Total frames: 2\n");
    }

    #[test]
    fn test_run_logger_nothing_written_before_save() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("run.txt");

        let mut logger = RunLogger::silent(&path);
        logger.add("line");
        assert!(!path.exists());
        drop(logger);
        assert!(!path.exists());
    }
}
