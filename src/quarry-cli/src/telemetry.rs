//! Logging setup for the `quarry` binary
//!
//! Human-readable logs always go to stderr so stdout stays clean JSON.
//! With a log directory, structured JSON logs are also written to
//! `quarry.log`, rotated daily or at 10MB, whichever comes first.

use anyhow::{Context, Result};
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MAX_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Default filter directive when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("quarry={level},quarry_core={level},quarry_rs={level}")
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when `log_dir` is set; keep it alive
/// until exit so buffered lines get flushed.
pub fn init_telemetry(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            // 9 rolled files kept per day
            let appender = RollingFileAppender::new(
                dir.join("quarry.log"),
                RollingConditionBasic::new()
                    .daily()
                    .max_size(MAX_LOG_FILE_BYTES),
                9,
            )
            .context("Failed to open log file")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    if let Some(dir) = log_dir {
        tracing::debug!("Writing JSON logs to {:?}", dir);
    }

    Ok(guard)
}
