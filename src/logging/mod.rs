//! Structured logging configuration for GridSnap

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Overrides the computed filter with a full directive string
pub const FILTER_ENV: &str = "GRIDSNAP_LOG_FILTER";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("File path required for file output")]
    MissingFilePath,
    #[error("Invalid filter directive: {0}")]
    InvalidFilter(String),
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Logging configuration for GridSnap
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// File path for file output
    pub file_path: Option<String>,
    /// Include source file and line numbers
    pub include_source: bool,
    pub include_thread_names: bool,
    /// Trace-level output for the geometry and history services
    pub verbose_services: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// One line per event
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            _ => Err(format!("Invalid log output: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            include_source: false,
            include_thread_names: false,
            verbose_services: false,
        }
    }
}

impl LogConfig {
    /// Verbose, human-readable output for local runs
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            include_source: true,
            verbose_services: true,
            ..Self::default()
        }
    }

    /// JSON to `~/Library/Logs/GridSnap/gridsnap.log`
    pub fn production() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Json,
            output: LogOutput::File,
            file_path: Some(default_log_file().to_string_lossy().into_owned()),
            ..Self::default()
        }
    }

    /// Load configuration from `GRIDSNAP_LOG_*` environment variables.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let flag = |value: String| value.eq_ignore_ascii_case("true");

        if let Some(level) = lookup("GRIDSNAP_LOG_LEVEL").and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = lookup("GRIDSNAP_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        if let Some(output) = lookup("GRIDSNAP_LOG_OUTPUT").and_then(|v| v.parse().ok()) {
            config.output = output;
        }
        if let Some(file_path) = lookup("GRIDSNAP_LOG_FILE") {
            config.file_path = Some(file_path);
        }
        if let Some(source) = lookup("GRIDSNAP_LOG_SOURCE") {
            config.include_source = flag(source);
        }
        if let Some(verbose) = lookup("GRIDSNAP_LOG_VERBOSE_SERVICES") {
            config.verbose_services = flag(verbose);
        }

        config
    }

    /// Filter directives for this configuration
    pub fn filter_directives(&self) -> String {
        let level = self.level.as_directive();
        let mut directives = format!("warn,gridsnap={level}");
        if self.verbose_services {
            for module in ["action_history", "window_manager", "keyboard_handler"] {
                directives.push_str(&format!(",gridsnap::services::{module}=trace"));
            }
        }
        directives
    }
}

pub fn default_log_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Library")
        .join("Logs")
        .join("GridSnap")
        .join("gridsnap.log")
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = create_filter(config)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if matches!(config.output, LogOutput::Stdout | LogOutput::Both) {
        layers.push(create_layer(config, std::io::stdout));
    }
    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        let path = config
            .file_path
            .as_deref()
            .ok_or(LoggingError::MissingFilePath)?;
        let file = open_log_file(path)?;
        layers.push(create_layer(config, std::sync::Mutex::new(file)));
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .map_err(|err| LoggingError::AlreadyInitialized(err.to_string()))?;

    info!(
        level = ?config.level,
        format = ?config.format,
        output = ?config.output,
        "Logging initialized"
    );
    Ok(())
}

fn create_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    match std::env::var(FILTER_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .map_err(|err| LoggingError::InvalidFilter(format!("{directives}: {err}"))),
        Err(_) => EnvFilter::try_new(config.filter_directives())
            .map_err(|err| LoggingError::InvalidFilter(err.to_string())),
    }
}

fn open_log_file(path: &str) -> Result<std::fs::File, LoggingError> {
    let open = || -> std::io::Result<std::fs::File> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::OpenOptions::new().create(true).append(true).open(path)
    };

    open().map_err(|source| LoggingError::FileOpen {
        path: path.to_string(),
        source,
    })
}

fn create_layer<W>(config: &LogConfig, writer: W) -> BoxedLayer
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(config.include_thread_names)
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    }
}
