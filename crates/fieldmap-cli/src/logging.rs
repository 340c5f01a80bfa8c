//! Logging setup on `tracing` and `tracing-subscriber`.
//!
//! # Log Levels
//!
//! - `error`: command failures
//! - `warn`: degraded runs (store or AI unavailable, evicted credentials)
//! - `info`: run summaries, coverage, timings
//! - `debug`: per-strategy and per-mapping detail
//! - `trace`: candidate-level detail
//!
//! Source values are personal data. They only appear in logs when
//! `--log-data` is given; otherwise [`redact_value`] replaces them.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

static LOG_DATA_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder used when value logging is disabled.
pub const REDACTED_VALUE: &str = "[REDACTED]";

const OWN_CRATES: &[&str] = &[
    "fieldmap",
    "fieldmap_cli",
    "fieldmap_map",
    "fieldmap_model",
    "fieldmap_ai",
];

pub fn log_data_enabled() -> bool {
    LOG_DATA_ENABLED.load(Ordering::Relaxed)
}

/// Returns the value when `--log-data` is on, otherwise a redacted token.
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() {
        value
    } else {
        REDACTED_VALUE
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` override `level_filter`.
    pub use_env_filter: bool,
    pub with_timestamps: bool,
    pub with_target: bool,
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Logs go to this file instead of stderr when set.
    pub log_file: Option<PathBuf>,
    pub log_data: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_timestamps: false,
            with_target: false,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
            log_data: false,
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    if let Some(path) = &config.log_file {
        init_logging_with_writer(config, LogFile::open(path)?);
    } else {
        init_logging_with_writer(config, io::stderr);
    }
    Ok(())
}

pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    LOG_DATA_ENABLED.store(config.log_data, Ordering::Release);
    let filter = build_env_filter(config.level_filter, config.use_env_filter);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(config.with_target)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Compact if config.with_timestamps => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .without_time()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Pretty if config.with_timestamps => fmt::layer()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .without_time()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
    };
    tracing_subscriber::registry().with(layer).with(filter).init();
}

/// Appends to one log file from every thread.
#[derive(Clone)]
struct LogFile(Arc<Mutex<File>>);

impl LogFile {
    fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self(Arc::new(Mutex::new(file))))
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Our crates log at `level`, everything else stays at warn.
fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_CRATES.iter().map(|name| format!("{name}={level}")));
    directives.join(",")
}

fn build_env_filter(level: LevelFilter, use_env: bool) -> EnvFilter {
    let fallback = || EnvFilter::new(default_directives(level));
    if use_env {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
    } else {
        fallback()
    }
}
