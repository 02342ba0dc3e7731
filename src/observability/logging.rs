//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Emit one JSON object per record for the external log shipper
//! - Optionally mirror records into a daily-rotated file
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and `RUST_LOG`
//! - The request span (service, trace_id) is flattened into every JSON
//!   record so records are correlatable without span reconstruction

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::{LogFormat, LoggingConfig};

/// Error type for logging setup.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the file writer flushing until dropped.
#[must_use = "dropping the guard stops the file writer"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn json_layer<W>(writer: W) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .with_writer(writer)
        .boxed()
}

/// Install the global subscriber.
///
/// `service_name` names the rotated log file (`<service>.log.<date>`).
pub fn init_logging(
    config: &LoggingConfig,
    service_name: &str,
) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|source| LoggingError::Filter {
            directive: config.level.clone(),
            source,
        })?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(match config.format {
        LogFormat::Json => json_layer(std::io::stdout),
        LogFormat::Pretty => fmt::layer().pretty().with_target(true).boxed(),
    });

    let mut file_guard = None;
    if let Some(directory) = &config.directory {
        let appender = tracing_appender::rolling::daily(directory, format!("{service_name}.log"));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(json_layer(writer));
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    tracing::info!(
        service = %service_name,
        level = %config.level,
        format = ?config.format,
        directory = ?config.directory,
        "Logging initialized"
    );

    Ok(LoggingGuard { _file: file_guard })
}
