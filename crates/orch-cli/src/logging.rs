//! Logging setup built on `tracing`/`tracing-subscriber`, ported from the
//! pattern the production pipeline uses for its own CLI: a `LogConfig`
//! derived from `-v`/`-q` or an explicit `--log-level`, a pretty/compact/json
//! format choice, optional `--log-file`, and a PHI/PII redaction gate that
//! defaults closed.

use std::fs::OpenOptions;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{LogFormatArg, LogLevelArg};

static LOG_DATA_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder used in place of subject-level values when `--log-data` is off.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Whether `--log-data` was passed for this process.
pub fn log_data_enabled() -> bool {
    LOG_DATA_ENABLED.load(Ordering::Relaxed)
}

/// Returns `value` unchanged when `--log-data` is set, otherwise a redacted token.
#[must_use]
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() {
        value
    } else {
        REDACTED_VALUE
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl From<LogLevelArg> for LevelFilter {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    pub format: LogFormat,
    pub log_file: Option<std::path::PathBuf>,
    pub log_data: bool,
}

impl LogConfig {
    /// Builds a config from `-v`/`-q` verbosity, falling back to `explicit`
    /// when the operator passed `--log-level`.
    #[must_use]
    pub fn from_verbosity(verbosity_filter: LevelFilter, explicit: Option<LogLevelArg>) -> Self {
        let level_filter = explicit.map_or(verbosity_filter, LevelFilter::from);
        Self {
            level_filter,
            format: LogFormat::default(),
            log_file: None,
            log_data: false,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_log_file(mut self, path: Option<std::path::PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    #[must_use]
    pub fn with_log_data(mut self, enable: bool) -> Self {
        self.log_data = enable;
        self
    }
}

/// Initializes the global `tracing` subscriber. Call once at process startup.
///
/// # Errors
///
/// Returns an error if `config.log_file` is set and cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        init_logging_with_writer(config, SharedFileWriter::new(file));
    } else {
        init_logging_with_writer(config, io::stderr);
    }
    Ok(())
}

fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    LOG_DATA_ENABLED.store(config.log_data, Ordering::Release);
    let filter = build_env_filter(config.level_filter);

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(writer).with_target(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer().compact().with_writer(writer).with_target(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer().with_writer(writer).with_target(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

/// Builds an `EnvFilter` scoped to this workspace's crates at `level`,
/// honoring `RUST_LOG` if set.
fn build_env_filter(level: LevelFilter) -> EnvFilter {
    let level_str = level.to_string();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},orch_cli={level},orch_core={level},orch_agents={level},orch_spec={level},\
             orch_registry={level},orch_ig={level},orch_ct={level},orch_conventions={level},\
             orch_memory={level},orch_llm={level},orch_ingest={level},orch_compare={level},\
             orch_state={level},orch_config={level}"
        ))
    })
}

struct SharedFileWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl SharedFileWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<std::fs::File>>,
}

impl io::Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.file.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}
