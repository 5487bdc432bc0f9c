//! # Hermes WebSocket
//!
//! WebSocket routes for the Hermes dispatcher.
//!
//! A [`WebSocketRoute`] accepts RFC 6455 upgrade requests matching its path
//! pattern, serves each connection on its own task, and keeps every live
//! connection in a per-route registry guarded by a single exclusive lock.
//! Broadcasts hold that lock for the whole send loop, so membership cannot
//! change mid-broadcast; a failed peer produces one error event and never
//! stops delivery to the rest.
//!
//! Lifecycle events (open, close, frame received, frame sent, error) are
//! announced through [`WebSocketEvents`].

#![doc(html_root_url = "https://docs.rs/hermes-ws/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod connection;
mod error;
mod message;
mod route;
mod settings;
mod upgrade;

pub use connection::{ConnectionHandle, ConnectionId, ConnectionState, WsConnection};
pub use error::{CloseCode, WsError, WsResult};
pub use message::{CloseFrame, Message};
pub use route::{
    BroadcastSummary, CloseEvent, ErrorEvent, FrameEvent, WebSocketEvents, WebSocketRoute,
};
pub use settings::WebSocketRouteSettings;
pub use upgrade::{is_websocket_request, prepare_upgrade, validate_upgrade_request, WebSocketUpgrade};
