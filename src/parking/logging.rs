use std::io;
use tracing::dispatcher::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, registry, EnvFilter, Layer};

use crate::parking::config::{Config, Logging};

pub const LOG_FILE_NAME: &str = "log.json";

// This is a helper struct to store the logger guards. When they are dropped, logging is reset and the
// file writer is flushed.
pub struct LogGuards {
    _log_guard: Option<WorkerGuard>,
    _default: DefaultGuard,
}

pub fn init_std_out_logging_thread_local() -> DefaultGuard {
    let collector = registry().with(
        fmt::Layer::new()
            .with_writer(io::stdout)
            .with_filter(env_filter_or(LevelFilter::INFO)),
    );
    tracing::subscriber::set_default(collector)
}

/// Installs a console layer and, if `output.logging` is `Info`, a json layer writing into
/// `<output_dir>/log.json`. The subscriber is only active on the calling thread while the guards live.
pub fn init_logging(config: &Config) -> LogGuards {
    let dir = config.output_dir();

    let (log_layer, log_guard) = if Logging::Info == config.output().logging {
        let log_file_appender = rolling::never(&dir, LOG_FILE_NAME);
        let (log_file, log_guard) = non_blocking(log_file_appender);
        let layer = fmt::Layer::new()
            .with_writer(log_file)
            .json()
            .with_ansi(false)
            .with_filter(LevelFilter::DEBUG);
        (Some(layer), Some(log_guard))
    } else {
        (None, None)
    };

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(env_filter_or(LevelFilter::INFO));

    // Add `Optional`s. If None, then the corresponding layer is not added.
    let collector = registry().with(log_layer).with(console_layer);

    let default = tracing::subscriber::set_default(collector);

    LogGuards {
        _log_guard: log_guard,
        _default: default,
    }
}

/// `RUST_LOG` wins if set, otherwise `fallback`.
fn env_filter_or(fallback: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(fallback.into())
        .from_env_lossy()
}
