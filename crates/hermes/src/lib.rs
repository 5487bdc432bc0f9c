//! # Hermes
//!
//! An async HTTP and WebSocket toolkit built around routes and filter
//! chains:
//!
//! - **Routing** – requests dispatch to the first route whose path pattern
//!   matches, with a configurable fallback
//! - **Filters** – ordered request/response filter chains with a typed
//!   extension context
//! - **WebSockets** – upgrade handling, a per-route connection registry,
//!   and broadcast with per-connection send timeouts
//! - **Client** – a session-based HTTP client with manual redirect
//!   handling and byte-level progress events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! fn hello(_request: &Request) -> BoxFuture<'_, Response> {
//!     Box::pin(async { /* build a response */ })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder()
//!         .route(BaseRoute::new(
//!             "hello",
//!             RouteSettings::with_path_pattern("/hello")?,
//!             hello,
//!         ))
//!         .default_handler(NotFoundRoute::new())
//!         .build()?;
//!
//!     Server::new(ServerConfig::default(), dispatcher).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hermes_core as core;

// Re-export filter types
pub use hermes_filter as filter;

// Re-export router types
pub use hermes_router as router;

// Re-export WebSocket types
pub use hermes_ws as ws;

// Re-export client types
pub use hermes_client as client;

// Re-export server types
pub use hermes_server as server;

// Re-export telemetry types
pub use hermes_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{EventListeners, ListenerId, Request, Response, ResponseExt};

    pub use hermes_filter::{
        FilterChain, FilterContext, FilterError, FilterResult, FnRequestFilter, FnResponseFilter,
        RequestFilter, ResponseFilter,
    };

    pub use hermes_router::{
        BaseRoute, BoxFuture, DispatchError, Dispatcher, DispatcherBuilder, NotFoundRoute, Route,
        RouteSettings,
    };

    pub use hermes_ws::{
        CloseCode, CloseFrame, ConnectionId, Message, WebSocketEvents, WebSocketRoute,
        WebSocketRouteSettings, WsError, WsResult,
    };

    pub use hermes_client::{
        ClientError, ClientRequest, ClientResponse, ClientResult, ClientSession,
        ClientSessionSettings, Progress, RequestTask, TaskEvent,
    };

    pub use hermes_server::{Server, ServerConfig, ShutdownSignal};

    pub use hermes_telemetry::{init_logging, LogConfig};
}
