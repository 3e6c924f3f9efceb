//! Logging Setup
//!
//! Structured `tracing` output: pretty on stdout, JSON in a daily rolling
//! file under the data directory. `log` macros from leaf modules are bridged in.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_NAME: &str = "spirit-enrich.log";
const DEFAULT_FILTER: &str = "info,spirit_enrich=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Directory the rolling log file is written to
pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

fn bridge_log_crate() {
    // Already installed when tracing-subscriber's own `tracing-log` feature is on
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::trace!("log bridge not installed: {}", e);
    }
}

/// Initialize the logging system.
///
/// This sets up:
/// 1. A stdout logger (pretty formatted).
/// 2. A file logger (JSON formatted) in `<data_dir>/logs`.
/// 3. Redirects standard `log` crate events to `tracing`.
///
/// Returns a `WorkerGuard` which must be kept alive for the duration of the
/// process so buffered file output is flushed on shutdown.
pub fn init(data_dir: &Path) -> WorkerGuard {
    let log_dir = log_dir(data_dir);
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File Layer: JSON format for easy parsing/ingestion
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(env_filter());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .pretty()
        .with_filter(env_filter());

    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
    {
        eprintln!("Failed to initialize tracing subscriber: {}", e);
    }

    bridge_log_crate();

    tracing::info!(path = %log_dir.join(LOG_FILE_NAME).display(), "Logging initialized (daily rolling)");

    guard
}

/// Compact stdout-only output, for tests and quiet CLI runs. Safe to call repeatedly.
pub fn init_stdout_only() {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .compact()
        .with_target(false)
        .with_filter(env_filter());

    if tracing_subscriber::registry().with(layer).try_init().is_ok() {
        bridge_log_crate();
    }
}
