//! # Hermes Core
//!
//! Core types shared by the Hermes server, router, and client crates:
//!
//! - [`Request`] / [`Response`] - the HTTP message types used at every seam
//! - [`ResponseExt`] - helpers for building error and JSON responses
//! - [`EventListeners`] - a typed subscribe/unsubscribe listener registry

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod events;
mod types;

pub use events::{EventListeners, ListenerId};
pub use types::{BoxBody, Request, Response, ResponseExt};
