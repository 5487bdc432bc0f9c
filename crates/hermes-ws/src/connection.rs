//! WebSocket connection state and I/O.
//!
//! A [`WsConnection`] owns the receive half of a connection and lives on the
//! serving task. The send half sits behind a shared lock so that
//! [`ConnectionHandle`]s held by the route registry can send frames from
//! other tasks. Connection state is shared between the connection and its
//! handles.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{WsError, WsResult};
use crate::message::{CloseFrame, Message};

/// A unique identifier for a WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a connection ID from a UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle of one connection.
///
/// Transitions only move forward: `Connecting` to `Open` when the route
/// registers the connection, `Open` to `Closing` when either side starts
/// the close handshake, and anything to `Closed` when the stream ends or an
/// I/O error kills the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Upgrade finished; not yet registered.
    Connecting = 0,
    /// Registered and exchanging frames.
    Open = 1,
    /// Close handshake started.
    Closing = 2,
    /// The connection is gone.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Shared state cell; forward-only transitions.
#[derive(Debug, Clone)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConnectionState::Connecting as u8)))
    }

    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn advance(&self, to: ConnectionState) {
        // fetch_max keeps transitions monotonic even when the serving task
        // and a handle race.
        self.0.fetch_max(to as u8, Ordering::AcqRel);
    }
}

type SharedSink<S> = Arc<Mutex<SplitSink<WebSocketStream<S>, tungstenite::Message>>>;

/// The serving-task half of a WebSocket connection.
pub struct WsConnection<S> {
    connection_id: ConnectionId,
    sender: SharedSink<S>,
    receiver: SplitStream<WebSocketStream<S>>,
    state: StateCell,
    auto_ping_pong: bool,
    connected_at: Instant,
    last_activity: Instant,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an upgraded stream.
    pub fn new(stream: WebSocketStream<S>, auto_ping_pong: bool) -> Self {
        let (sender, receiver) = stream.split();
        let now = Instant::now();
        Self {
            connection_id: ConnectionId::new(),
            sender: Arc::new(Mutex::new(sender)),
            receiver,
            state: StateCell::new(),
            auto_ping_pong,
            connected_at: now,
            last_activity: now,
        }
    }

    /// Get the connection ID.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Get the current state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Mark the connection open. Called by the route when registering.
    pub fn mark_open(&self) {
        self.state.advance(ConnectionState::Open);
    }

    /// Get when the connection was established.
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Get how long since the last received frame.
    pub fn idle_duration(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the stream is finished. Pings are answered with
    /// pongs automatically when the route enables `auto_ping_pong`. A close
    /// frame moves the state to `Closing`; stream end or an I/O error moves
    /// it to `Closed`.
    pub async fn recv(&mut self) -> Option<WsResult<Message>> {
        if self.state.get() == ConnectionState::Closed {
            return None;
        }

        match self.receiver.next().await {
            Some(Ok(msg)) => {
                self.last_activity = Instant::now();
                let msg = Message::from(msg);

                if let Message::Ping(data) = &msg {
                    if self.auto_ping_pong {
                        debug!(connection_id = %self.connection_id, "answering ping");
                        if let Err(e) = self.send(Message::pong(data.clone())).await {
                            warn!(connection_id = %self.connection_id, error = %e, "failed to send pong");
                        }
                    }
                }

                if msg.is_close() {
                    debug!(connection_id = %self.connection_id, "peer started close handshake");
                    self.state.advance(ConnectionState::Closing);
                }

                Some(Ok(msg))
            }
            Some(Err(e)) => {
                self.state.advance(ConnectionState::Closed);
                Some(Err(WsError::from(e)))
            }
            None => {
                self.state.advance(ConnectionState::Closed);
                None
            }
        }
    }

    /// Send a message on the connection.
    pub async fn send(&self, msg: Message) -> WsResult<()> {
        send_on(&self.sender, &self.state, self.connection_id, msg).await
    }

    /// Start the close handshake.
    pub async fn close(&self, frame: Option<CloseFrame>) -> WsResult<()> {
        close_on(&self.sender, &self.state, self.connection_id, frame).await
    }

    /// Get a handle for sending from other tasks.
    pub fn handle(&self) -> ConnectionHandle<S> {
        ConnectionHandle {
            connection_id: self.connection_id,
            sender: Arc::clone(&self.sender),
            state: self.state.clone(),
        }
    }
}

/// A cloneable, non-owning sending handle to a connection.
///
/// The route registry stores handles, never the connection itself; the
/// serving task keeps ownership and is the only place that unregisters.
pub struct ConnectionHandle<S> {
    connection_id: ConnectionId,
    sender: SharedSink<S>,
    state: StateCell,
}

impl<S> Clone for ConnectionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            connection_id: self.connection_id,
            sender: Arc::clone(&self.sender),
            state: self.state.clone(),
        }
    }
}

impl<S> ConnectionHandle<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Get the connection ID.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Get the current state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Send a message.
    pub async fn send(&self, msg: Message) -> WsResult<()> {
        send_on(&self.sender, &self.state, self.connection_id, msg).await
    }

    /// Send a JSON message.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T) -> WsResult<()> {
        let msg = Message::from_json(value)?;
        self.send(msg).await
    }

    /// Start the close handshake.
    pub async fn close(&self, frame: Option<CloseFrame>) -> WsResult<()> {
        close_on(&self.sender, &self.state, self.connection_id, frame).await
    }
}

async fn send_on<S>(
    sender: &SharedSink<S>,
    state: &StateCell,
    connection_id: ConnectionId,
    msg: Message,
) -> WsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if state.get() == ConnectionState::Closed {
        return Err(WsError::connection_closed(None, "connection already closed"));
    }

    let tungstenite_msg = tungstenite::Message::from(msg);
    let mut sink = sender.lock().await;
    sink.send(tungstenite_msg).await.map_err(|e| {
        state.advance(ConnectionState::Closed);
        debug!(connection_id = %connection_id, error = %e, "send failed");
        WsError::send_failed(e.to_string())
    })
}

async fn close_on<S>(
    sender: &SharedSink<S>,
    state: &StateCell,
    connection_id: ConnectionId,
    frame: Option<CloseFrame>,
) -> WsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match state.get() {
        ConnectionState::Closing | ConnectionState::Closed => return Ok(()),
        _ => {}
    }

    debug!(connection_id = %connection_id, "starting close handshake");
    send_on(sender, state, connection_id, Message::Close(frame)).await?;
    state.advance(ConnectionState::Closing);
    Ok(())
}
