//! The WebSocket route and its connection registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hermes_core::{EventListeners, Request, Response, ResponseExt};
use hermes_router::{BoxFuture, Route, RouteSettings};
use http::StatusCode;
use hyper::upgrade::{OnUpgrade, Upgraded};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use tungstenite::protocol::Role;

use crate::connection::{ConnectionHandle, ConnectionId, WsConnection};
use crate::error::{WsError, WsResult};
use crate::message::{CloseFrame, Message};
use crate::settings::WebSocketRouteSettings;
use crate::upgrade::prepare_upgrade;

/// A frame arriving on or leaving a connection.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    /// The connection the frame belongs to.
    pub connection_id: ConnectionId,
    /// The frame itself.
    pub message: Message,
}

/// A connection leaving the registry.
#[derive(Debug, Clone)]
pub struct CloseEvent {
    /// The connection that closed.
    pub connection_id: ConnectionId,
    /// The close frame the peer sent, if any.
    pub frame: Option<CloseFrame>,
}

/// A connection-scoped or route-scoped error.
///
/// Errors are announced here and never swallowed; a per-connection error is
/// terminal for that connection only.
#[derive(Debug)]
pub struct ErrorEvent {
    /// The affected connection, if the error is connection-scoped.
    pub connection_id: Option<ConnectionId>,
    /// What went wrong.
    pub error: WsError,
}

/// Listener registries for route lifecycle events.
///
/// Listeners run synchronously on the task that detected the event.
#[derive(Debug, Default)]
pub struct WebSocketEvents {
    /// A connection was registered and is open.
    pub opened: EventListeners<ConnectionId>,
    /// A connection was unregistered.
    pub closed: EventListeners<CloseEvent>,
    /// A complete frame arrived.
    pub frame_received: EventListeners<FrameEvent>,
    /// A frame was delivered to a peer.
    pub frame_sent: EventListeners<FrameEvent>,
    /// A connection or handshake error occurred.
    pub errors: EventListeners<ErrorEvent>,
}

/// Outcome of a broadcast.
///
/// A broadcast never aborts early: failed peers are counted here and each
/// failure produced one error event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    /// Connections the frame reached.
    pub delivered: usize,
    /// Connections that failed or timed out.
    pub failed: usize,
}

impl BroadcastSummary {
    /// Whether any peer failed to receive the frame.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

struct Inner<S> {
    settings: WebSocketRouteSettings,
    /// All live connections. One exclusive lock: broadcasts hold it for the
    /// whole send loop, and register/unregister happen entirely under it.
    registry: Mutex<HashMap<ConnectionId, ConnectionHandle<S>>>,
    events: WebSocketEvents,
    drained: Notify,
    stopping: AtomicBool,
}

/// A route serving WebSocket connections.
///
/// Each accepted connection runs on its own task, which owns the receive
/// half and holds the only right to unregister itself. The registry keeps
/// non-owning sending handles.
///
/// Cloning is cheap and clones share the registry and events.
pub struct WebSocketRoute<S = TokioIo<Upgraded>> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for WebSocketRoute<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> WebSocketRoute<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Create a route with the given settings.
    pub fn new(settings: WebSocketRouteSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                registry: Mutex::new(HashMap::new()),
                events: WebSocketEvents::default(),
                drained: Notify::new(),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    /// The route's event registries.
    pub fn events(&self) -> &WebSocketEvents {
        &self.inner.events
    }

    /// The route's settings.
    pub fn ws_settings(&self) -> &WebSocketRouteSettings {
        &self.inner.settings
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.registry.lock().await.len()
    }

    /// Send a frame to one connection.
    pub async fn send_frame(&self, connection_id: ConnectionId, message: Message) -> WsResult<()> {
        let registry = self.inner.registry.lock().await;
        let handle = registry
            .get(&connection_id)
            .ok_or_else(|| WsError::connection_not_found(connection_id))?;

        self.inner
            .send_with_timeout(handle, message.clone())
            .await?;
        self.inner.events.frame_sent.notify(&FrameEvent {
            connection_id,
            message,
        });
        Ok(())
    }

    /// Send a frame to every registered connection.
    ///
    /// The registry lock is held across the whole loop, so the membership
    /// is a stable snapshot: no connection registers or unregisters while a
    /// broadcast is in flight. A failed or stalled peer yields one error
    /// event and delivery continues with the rest.
    pub async fn broadcast(&self, message: Message) -> BroadcastSummary {
        let registry = self.inner.registry.lock().await;
        let mut summary = BroadcastSummary::default();

        for (connection_id, handle) in registry.iter() {
            match self.inner.send_with_timeout(handle, message.clone()).await {
                Ok(()) => {
                    summary.delivered += 1;
                    self.inner.events.frame_sent.notify(&FrameEvent {
                        connection_id: *connection_id,
                        message: message.clone(),
                    });
                }
                Err(error) => {
                    summary.failed += 1;
                    warn!(connection_id = %connection_id, error = %error, "broadcast delivery failed");
                    self.inner.events.errors.notify(&ErrorEvent {
                        connection_id: Some(*connection_id),
                        error,
                    });
                }
            }
        }

        summary
    }

    /// Start a graceful close of one connection.
    ///
    /// The close-frame send is bounded by the send timeout, like any other
    /// send. The serving task unregisters the connection once the close
    /// handshake finishes or the stream dies.
    pub async fn close(
        &self,
        connection_id: ConnectionId,
        frame: Option<CloseFrame>,
    ) -> WsResult<()> {
        let registry = self.inner.registry.lock().await;
        let handle = registry
            .get(&connection_id)
            .ok_or_else(|| WsError::connection_not_found(connection_id))?;
        self.inner.close_with_timeout(handle, frame).await
    }

    /// Start a graceful close of every registered connection.
    ///
    /// Each close send is bounded by the send timeout; a failed or stalled
    /// peer yields one error event and the loop moves on, so a
    /// backpressured connection cannot wedge the registry lock.
    pub async fn close_all(&self, frame: Option<CloseFrame>) {
        let registry = self.inner.registry.lock().await;
        for (connection_id, handle) in registry.iter() {
            if let Err(error) = self.inner.close_with_timeout(handle, frame.clone()).await {
                self.inner.events.errors.notify(&ErrorEvent {
                    connection_id: Some(*connection_id),
                    error,
                });
            }
        }
    }

    /// Hand an upgraded protocol stream to the route.
    ///
    /// Spawns the serving task that registers the connection, pumps frames,
    /// and unregisters as its last act.
    pub fn adopt_stream(&self, stream: WebSocketStream<S>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            Inner::serve(inner, stream).await;
        });
    }

    /// Refuse new connections, close the existing ones, and wait for the
    /// serving tasks to drain. The wait is bounded by `poll_timeout`.
    pub async fn stop(&self) {
        self.inner.stopping.store(true, Ordering::SeqCst);
        info!("stopping websocket route");
        self.close_all(Some(CloseFrame::going_away("server stopping")))
            .await;

        let deadline = tokio::time::Instant::now() + self.inner.settings.poll_timeout;
        loop {
            if self.connection_count().await == 0 {
                break;
            }
            let notified = self.inner.drained.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let remaining = self.connection_count().await;
                warn!(remaining, "stopped with connections still registered");
                break;
            }
        }
    }
}

impl<S> Inner<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_with_timeout(
        &self,
        handle: &ConnectionHandle<S>,
        message: Message,
    ) -> WsResult<()> {
        match timeout(self.settings.send_timeout, handle.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(WsError::send_timed_out(handle.connection_id())),
        }
    }

    async fn close_with_timeout(
        &self,
        handle: &ConnectionHandle<S>,
        frame: Option<CloseFrame>,
    ) -> WsResult<()> {
        match timeout(self.settings.send_timeout, handle.close(frame)).await {
            Ok(result) => result,
            Err(_) => Err(WsError::send_timed_out(handle.connection_id())),
        }
    }

    async fn serve(inner: Arc<Self>, stream: WebSocketStream<S>) {
        let mut conn = WsConnection::new(stream, inner.settings.auto_ping_pong);
        let connection_id = conn.connection_id();

        if inner.stopping.load(Ordering::SeqCst) {
            let _ = conn
                .close(Some(CloseFrame::going_away("route stopping")))
                .await;
            return;
        }

        {
            let mut registry = inner.registry.lock().await;
            conn.mark_open();
            registry.insert(connection_id, conn.handle());
        }
        debug!(connection_id = %connection_id, "connection open");
        inner.events.opened.notify(&connection_id);

        let mut keep_alive = tokio::time::interval_at(
            tokio::time::Instant::now() + inner.settings.ping_interval,
            inner.settings.ping_interval,
        );

        let mut close_frame = None;
        loop {
            tokio::select! {
                _ = keep_alive.tick(), if inner.settings.keep_alive => {
                    if let Err(error) = conn.send(Message::ping(Vec::new())).await {
                        inner.events.errors.notify(&ErrorEvent {
                            connection_id: Some(connection_id),
                            error,
                        });
                        break;
                    }
                }
                received = timeout(inner.settings.receive_timeout, conn.recv()) => match received {
                    Err(_) => {
                        inner.events.errors.notify(&ErrorEvent {
                            connection_id: Some(connection_id),
                            error: WsError::receive_timed_out(connection_id),
                        });
                        let _ = conn
                            .close(Some(CloseFrame::going_away("receive timeout")))
                            .await;
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Ok(message))) => {
                        let is_close = message.is_close();
                        if is_close {
                            close_frame = message.close_frame().cloned();
                        }
                        inner.events.frame_received.notify(&FrameEvent {
                            connection_id,
                            message,
                        });
                        if is_close {
                            break;
                        }
                    }
                    Ok(Some(Err(error))) => {
                        inner.events.errors.notify(&ErrorEvent {
                            connection_id: Some(connection_id),
                            error,
                        });
                        break;
                    }
                }
            }
        }

        // Unregistration is the serving task's last act, under the same
        // lock that guards broadcasts.
        {
            let mut registry = inner.registry.lock().await;
            registry.remove(&connection_id);
        }
        debug!(connection_id = %connection_id, "connection closed");
        inner.events.closed.notify(&CloseEvent {
            connection_id,
            frame: close_frame,
        });
        inner.drained.notify_waiters();
    }
}

impl Route for WebSocketRoute<TokioIo<Upgraded>> {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn settings(&self) -> &RouteSettings {
        &self.inner.settings.route
    }

    fn can_handle(&self, request: &Request, is_secure_port: bool) -> bool {
        if self.inner.settings.route.requires_secure_port() && !is_secure_port {
            return false;
        }
        self.inner.settings.route.matches_path(request.uri().path())
            && crate::upgrade::validate_upgrade_request(request, &self.inner.settings).is_ok()
    }

    fn handle(&self, mut request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let upgrade = match prepare_upgrade(&request, &self.inner.settings) {
                Ok(upgrade) => upgrade,
                Err(error) => {
                    let reason = error.to_string();
                    self.inner.events.errors.notify(&ErrorEvent {
                        connection_id: None,
                        error,
                    });
                    return Response::json_error(
                        StatusCode::BAD_REQUEST,
                        "HANDSHAKE_REJECTED",
                        &reason,
                    );
                }
            };

            let Some(on_upgrade) = request.extensions_mut().remove::<OnUpgrade>() else {
                // The listener did not preserve the upgrade token.
                let error = WsError::upgrade_failed("request carries no upgrade token");
                let reason = error.to_string();
                self.inner.events.errors.notify(&ErrorEvent {
                    connection_id: None,
                    error,
                });
                return Response::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPGRADE_UNAVAILABLE",
                    &reason,
                );
            };

            let inner = Arc::clone(&self.inner);
            let buffer_size = self.inner.settings.buffer_size;
            tokio::spawn(async move {
                match on_upgrade.await {
                    Ok(upgraded) => {
                        let config = tungstenite::protocol::WebSocketConfig::default()
                            .max_frame_size(Some(buffer_size));
                        let stream = WebSocketStream::from_raw_socket(
                            TokioIo::new(upgraded),
                            Role::Server,
                            Some(config),
                        )
                        .await;
                        Inner::serve(inner, stream).await;
                    }
                    Err(e) => {
                        inner.events.errors.notify(&ErrorEvent {
                            connection_id: None,
                            error: WsError::upgrade_failed(e.to_string()),
                        });
                    }
                }
            });

            upgrade.response
        })
    }

    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(WebSocketRoute::stop(self))
    }
}
