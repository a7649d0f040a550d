//! Log output: console plus an append-only file

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::LOG_FILE_NAME;
use crate::core::error::{OptimiserError, Result};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keeps the file writer alive. Buffered lines are flushed when this drops,
/// so hold it until the process is about to exit.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// Level defaults to `info` and can be overridden with `RUST_LOG`. With a
/// `log_dir`, every line also goes to `<log_dir>/memory_optimiser.log`; the
/// directory is created if needed.
pub fn init(log_dir: Option<&Path>) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_target(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| OptimiserError::Io {
                context: "creating log directory",
                source,
            })?;

            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| OptimiserError::Io {
            context: "installing log subscriber",
            source: std::io::Error::other(e.to_string()),
        })?;

    Ok(LogGuard { _file: guard })
}
