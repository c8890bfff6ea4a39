// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging setup for the VM recorder
//!
//! Every binary initialises `tracing` through this crate so that filters,
//! formats and log locations stay consistent. The recorder draws a
//! full-screen terminal UI, so its logs never go to the console: they are
//! written to a file, by default a timestamped one next to the results.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use clap;
pub use tracing::Level;

/// Output format for log messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable plaintext format
    #[default]
    Plaintext,
    /// Structured JSON format
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Plaintext => write!(f, "plaintext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log level accepted on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CliLogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CliLogLevel::Error => "error",
            CliLogLevel::Warn => "warn",
            CliLogLevel::Info => "info",
            CliLogLevel::Debug => "debug",
            CliLogLevel::Trace => "trace",
        };
        f.write_str(s)
    }
}

/// Logging flags, meant to be `#[command(flatten)]`-ed into a clap parser.
#[derive(Clone, Debug, Default, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliLoggingArgs {
    /// Log verbosity level
    #[arg(long, value_enum, help = "Log verbosity level (default: info)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<CliLogLevel>,

    /// Log output format
    #[arg(long, value_enum, help = "Log output format (default: plaintext)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,

    /// Directory for log files
    #[arg(long, help = "Directory for log files (default: <result-dir>/logs)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log filename
    #[arg(long, help = "Log filename (default: <component>-<timestamp>.log)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl CliLoggingArgs {
    /// Initialise logging for a component.
    ///
    /// TUI components always log to a file. `default_dir` is used when no
    /// `--log-dir` was given; when it is `None` the platform data directory
    /// is used instead. Returns the path that was opened, if any.
    pub fn init(
        &self,
        component: &str,
        is_tui: bool,
        default_dir: Option<&Path>,
    ) -> anyhow::Result<Option<PathBuf>> {
        let level: Level = self.log_level.unwrap_or_default().into();
        let format = self.log_format.unwrap_or_default();

        if is_tui || self.log_file.is_some() || self.log_dir.is_some() {
            let path = self.resolve_log_path(component, default_dir);
            init_to_file(component, level, format, &path)?;
            Ok(Some(path))
        } else {
            init(component, level, format)?;
            Ok(None)
        }
    }

    /// Resolve the log file location.
    ///
    /// An absolute `--log-file` wins. A relative one is placed under the
    /// log directory. Without `--log-file` a timestamped name is generated.
    pub fn resolve_log_path(&self, component: &str, default_dir: Option<&Path>) -> PathBuf {
        let dir = match (&self.log_dir, default_dir) {
            (Some(dir), _) => PathBuf::from(dir),
            (None, Some(dir)) => dir.to_path_buf(),
            (None, None) => standard_log_dir(),
        };

        match &self.log_file {
            Some(file) if Path::new(file).is_absolute() => PathBuf::from(file),
            Some(file) => dir.join(file),
            None => dir.join(timestamped_log_name(component)),
        }
    }
}

/// `<component>-YYYYmmdd@HHMMSS.log`
pub fn timestamped_log_name(component: &str) -> String {
    format!(
        "{}-{}.log",
        component,
        chrono::Local::now().format("%Y%m%d@%H%M%S")
    )
}

/// Platform data directory for recorder logs, e.g.
/// `~/.local/share/vm-recorder/logs` on Linux.
pub fn standard_log_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    path.push("vm-recorder");
    path.push("logs");
    path
}

/// Initialise console logging.
pub fn init(component: &str, default_level: Level, format: LogFormat) -> anyhow::Result<()> {
    init_with_writer(component, default_level, format, std::io::stderr)
}

/// Initialise logging into `log_path`, creating parent directories.
pub fn init_to_file(
    component: &str,
    default_level: Level,
    format: LogFormat,
    log_path: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    init_with_writer(
        component,
        default_level,
        format,
        std::sync::Mutex::new(log_file),
    )
}

/// Initialise logging with a custom writer. `RUST_LOG` overrides the level.
pub fn init_with_writer<W>(
    component: &str,
    default_level: Level,
    format: LogFormat,
    writer: W,
) -> anyhow::Result<()>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},{}={}",
            default_level,
            component.replace('-', "_"),
            default_level
        ))
    });

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).json();
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Plaintext => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }

    Ok(())
}
