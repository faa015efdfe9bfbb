//! # Courier Telemetry
//!
//! Structured logging for hosts of the reliability layer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _handle = init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `COURIER_SERVICE_NAME` | `courier` | Service name on every log line |
//! | `COURIER_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `COURIER_CONSOLE_OUTPUT` | `true` | Emit to stdout |
//! | `COURIER_JSON_LOGS` | `false` | JSON instead of pretty output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging, LoggingHandle};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Invalid log filter directive: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}
