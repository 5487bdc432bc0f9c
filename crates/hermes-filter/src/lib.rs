//! # Hermes Filter
//!
//! Ordered request/response filter chains.
//!
//! A [`FilterChain`] holds two independent lists: request filters that run
//! before a handler and response filters that run after it. Both lists run
//! in registration order; the first filter error aborts the remainder of
//! its list and propagates to the caller.
//!
//! Filters mutate the message in place and share per-exchange state through
//! a [`FilterContext`].

#![doc(html_root_url = "https://docs.rs/hermes-filter/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chain;
mod context;
mod error;
mod filter;

pub use chain::FilterChain;
pub use context::FilterContext;
pub use error::{FilterError, FilterResult};
pub use filter::{FnRequestFilter, FnResponseFilter, RequestFilter, ResponseFilter};
