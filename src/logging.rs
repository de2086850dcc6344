//! Logging context.
//!
//! Logging is set up per run rather than process-wide: the caller builds a
//! [`LogContext`], hands it to the orchestrator, and shuts it down afterwards.
//! Code running under [`LogContext::in_scope`] (or in a worker that entered
//! the context's [`Dispatch`]) logs through it; nothing is installed as the
//! global default subscriber.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Severity threshold of the log file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debug and above.
    #[default]
    Debug,
    /// Informational and above.
    Info,
    /// Warnings and errors.
    Warning,
    /// Errors only.
    Error,
    /// Fatal errors only (same as `error`).
    Fatal,
}

impl LogLevel {
    /// Filter admitting this level and above.
    pub fn as_filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warning => LevelFilter::WARN,
            Self::Error | Self::Fatal => LevelFilter::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

/// Log file destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// File to write (truncated).
    pub path: PathBuf,
    /// Minimum level written.
    pub level: LogLevel,
}

/// How logging should be set up for a run.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Console verbosity (`-v` count).
    pub verbose: u8,
    /// Only warnings on the console, or nothing when a log file is set.
    pub quiet: bool,
    /// Optional log file.
    pub file: Option<LogFile>,
}

/// An explicitly owned logging setup.
pub struct LogContext {
    dispatch: Dispatch,
    file: Option<(PathBuf, Arc<File>)>,
}

impl LogContext {
    /// Build console and file layers from `options`.
    pub fn init(options: &LogOptions) -> Result<Self> {
        // ONNX Runtime is chatty at info; keep it one step quieter than ours.
        let filter_str = if options.quiet {
            if options.file.is_some() {
                "off"
            } else {
                "warn,ort=off"
            }
        } else {
            match options.verbose {
                0 => "info,ort=off",
                1 => "debug,ort=warn",
                _ => "trace,ort=info",
            }
        };
        let console_filter = if options.quiet && options.file.is_some() {
            EnvFilter::new(filter_str)
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str))
        };

        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter);

        let file = match &options.file {
            Some(log_file) => Some((log_file.path.clone(), open_log_file(&log_file.path)?)),
            None => None,
        };
        let file_layer = file.as_ref().zip(options.file.as_ref()).map(|((_, handle), cfg)| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::clone(handle))
                .with_filter(cfg.level.as_filter())
        });

        let subscriber = tracing_subscriber::registry().with(console).with(file_layer);
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            file,
        })
    }

    /// A context that discards everything.
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
            file: None,
        }
    }

    /// The dispatcher to enter on every thread that should log.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this context as the thread's default subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Flush and close the log file.
    pub fn shutdown(self) -> Result<()> {
        if let Some((path, file)) = self.file {
            file.sync_all().map_err(|e| Error::Write {
                path,
                source: Box::new(e),
            })?;
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> Result<Arc<File>> {
    File::create(path).map(Arc::new).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}
