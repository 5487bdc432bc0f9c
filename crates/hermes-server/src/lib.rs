//! # Hermes Server
//!
//! HTTP listener for the Hermes dispatcher.
//!
//! A [`Server`] binds a TCP listener, serves each connection on its own
//! task over hyper http1, and routes every request through a
//! [`Dispatcher`](hermes_router::Dispatcher). Upgrade tokens survive body
//! collection, so WebSocket routes can take over the stream after the 101
//! response. Shutdown is graceful: stop accepting, stop the routes, then
//! drain live connections within a bounded timeout.

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder, DEFAULT_BIND_ADDR};
pub use error::{ServerError, ServerResult};
pub use server::Server;
pub use shutdown::{ConnectionTracker, ConnectionToken, ShutdownSignal};
