//! Logging setup for the stagecraft CLI
//!
//! Console output goes to stdout so it interleaves with streamed command
//! output. An optional log file receives everything at debug level.

use crate::Result;
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown on the console
const TARGETS: [&str; 5] = [
    "stagecraft",
    "stagecraft_core",
    "stagecraft_config",
    "stagecraft_engine",
    "stagecraft_vault",
];

fn default_filter(level: &str) -> EnvFilter {
    let directives = TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    // RUST_LOG wins when set and valid
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directives))
        .unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the logging system
///
/// # Arguments
/// * `verbose` - Enable debug level logging with timestamps
/// * `log_file` - Optional path to append logs to
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = default_filter(level);

    // Each arm builds its own layers; the stdout timer type differs per mode
    match (verbose, log_file) {
        (true, Some(log_path)) => {
            let stdout_layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_filter(env_filter);

            let file_layer = fmt::layer()
                .with_writer(open_log(log_path)?)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .with_filter(EnvFilter::new("debug"));

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .try_init()
                .ok();
        }
        (true, None) => {
            let stdout_layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_filter(env_filter);

            tracing_subscriber::registry()
                .with(stdout_layer)
                .try_init()
                .ok();
        }
        (false, Some(log_path)) => {
            let stdout_layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .without_time() // No timestamps in normal mode
                .compact()
                .with_ansi(true)
                .with_filter(env_filter);

            let file_layer = fmt::layer()
                .with_writer(open_log(log_path)?)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .with_filter(EnvFilter::new("debug"));

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .try_init()
                .ok();
        }
        (false, None) => {
            let stdout_layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .without_time() // No timestamps in normal mode
                .compact()
                .with_ansi(true)
                .with_filter(env_filter);

            tracing_subscriber::registry()
                .with(stdout_layer)
                .try_init()
                .ok();
        }
    }

    Ok(())
}

/// Open `log_path` for appending, creating it if needed
fn open_log(log_path: &Path) -> Result<std::fs::File> {
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?)
}
