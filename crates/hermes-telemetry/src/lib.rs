//! # Hermes Telemetry
//!
//! Structured logging for Hermes services.
//!
//! Applications call [`init_logging`] once at startup with a [`LogConfig`];
//! every Hermes crate emits through `tracing`, so one subscriber covers the
//! server, the routes, and the client pipeline.
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{create_env_filter, fields, init_logging, LogConfig};
