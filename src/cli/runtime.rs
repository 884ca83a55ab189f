use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_harness::config::{LogFormat, LogSink, LoggingConfig};

const LOG_FILE_PREFIX: &str = "storefront-harness.log";

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init_logging(
    logging: &LoggingConfig,
    level_override: Option<&str>,
    debug: bool,
) -> Result<WorkerGuard> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level_override
            .unwrap_or(logging.level.as_str())
            .parse()
            .context("Invalid log level")?
    };

    let (writer, guard) = match logging.sink {
        LogSink::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogSink::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogSink::File => {
            std::fs::create_dir_all(&logging.directory).with_context(|| {
                format!("Failed to create log directory {}", logging.directory.display())
            })?;
            let appender = tracing_appender::rolling::daily(&logging.directory, LOG_FILE_PREFIX);
            tracing_appender::non_blocking(appender)
        }
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(matches!(logging.sink, LogSink::Stdout | LogSink::Stderr));
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
    );

    match logging.format {
        LogFormat::Pretty => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    }
    .map_err(|err| anyhow!("Failed to install tracing subscriber: {err}"))?;

    Ok(guard)
}
