//! # Hermes Router
//!
//! Ordered route dispatch.
//!
//! A [`Dispatcher`] holds routes in registration order and hands each
//! request to the first route whose [`Route::can_handle`] accepts it. There
//! is no fallthrough: every dispatcher carries a default handler for
//! unmatched requests, and building one without a default handler is a
//! configuration error.
//!
//! [`BaseRoute`] is the standard route implementation: a regex path
//! pattern, an optional secure-port requirement, a
//! [`FilterChain`](hermes_filter::FilterChain), and an async handler.

#![doc(html_root_url = "https://docs.rs/hermes-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatcher;
mod error;
mod route;
mod settings;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, DispatchResult};
pub use route::{BaseRoute, BoxFuture, NotFoundRoute, Route};
pub use settings::{RouteSettings, DEFAULT_PATH_PATTERN};
