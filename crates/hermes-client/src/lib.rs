//! # Hermes Client
//!
//! HTTP client sessions with a filter pipeline and progress streaming.
//!
//! A [`ClientSession`] runs each request through its request filters, sends
//! it over a transport that follows no redirects on its own, and runs the
//! response filters over the result. When the redirect filter asks for
//! resubmission the session loops, spending a bounded redirect budget;
//! exhausting it is [`ClientError::RedirectLimitExceeded`].
//!
//! Transfer progress surfaces through [`Progress`] events, rate limited by
//! byte and time thresholds that reset together.

#![doc(html_root_url = "https://docs.rs/hermes-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod filters;
mod progress;
mod request;
mod session;
mod settings;
mod task;

pub use error::{ClientError, ClientResult};
pub use filters::{
    DefaultClientHeaders, OAuth2RequestFilter, ProxyAuthenticationRequired, ProxyRequestFilter,
    ProxyResponseFilter, RedirectDirective, RedirectResponseFilter,
};
pub use progress::{Progress, ProgressStream, ProgressTicker};
pub use request::{ClientRequest, ClientResponse};
pub use session::{ClientEvents, ClientSession};
pub use settings::{
    ClientSessionSettings, ProxySettings, DEFAULT_BYTES_PER_UPDATE, DEFAULT_MAX_REDIRECTS,
    DEFAULT_USER_AGENT,
};
pub use task::{RequestTask, TaskEvent};
