//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! pretty or JSON `fmt` layer. Log lines carry consistent fields:
//! - `service`: service name from [`TelemetryConfig`]
//! - `channel`: logical channel, via [`log_channel_event!`](crate::log_channel_event)
//! - additional context fields

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Handle returned once logging is installed.
#[derive(Debug)]
pub struct LoggingHandle {
    service_name: String,
}

impl LoggingHandle {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Builds the filter from the configured directive.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::Filter(e.to_string()))
}

/// Initialize structured logging.
///
/// Fails with [`TelemetryError::SubscriberInit`] if a global subscriber is
/// already installed, so calling twice is harmless for callers that ignore
/// the error.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingHandle, TelemetryError> {
    let env_filter = build_filter(config)?;

    let fmt_layer = if !config.console_output {
        None
    } else if config.json_logs {
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        )
    } else {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(true)
                .boxed(),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(LoggingHandle {
        service_name: config.service_name.clone(),
    })
}

/// Log a channel-scoped event with a uniform `channel` field.
#[macro_export]
macro_rules! log_channel_event {
    ($level:ident, $channel:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            channel = %$channel,
            $($($field)*,)?
            $msg
        )
    };
}
