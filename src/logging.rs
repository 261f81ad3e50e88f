//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Console output always goes to stderr. When a log directory is configured,
//! a JSON file layer with daily rotation is added.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the non-blocking writer guard for file logging.
///
/// The [`WorkerGuard`] must be kept alive for the duration of the process.
/// Dropping it flushes pending log entries and closes the file.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
}

/// Default filter directive for a verbosity level.
///
/// `0` and below is `info`, `1` is `debug`, anything higher is `trace`.
pub fn level_for(verbosity: i32) -> &'static str {
    match verbosity {
        i32::MIN..=0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbosity: i32) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)))
}

/// Initialise logging.
///
/// `RUST_LOG` wins over `verbosity` when set. With `logs_dir`, JSON logs are
/// also written to `{logs_dir}/ppsgui.log.YYYY-MM-DD`.
///
/// Returns a [`LoggingGuard`] that must be kept alive for log flushing.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init(verbosity: i32, logs_dir: Option<&Path>) -> anyhow::Result<LoggingGuard> {
    let Some(logs_dir) = logs_dir else {
        let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(env_filter(verbosity))
            .with(console_layer)
            .try_init()?;
        return Ok(LoggingGuard { _guard: None });
    };

    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "ppsgui.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(json_layer)
        .with(console_layer)
        .try_init()?;

    Ok(LoggingGuard {
        _guard: Some(guard),
    })
}
