//! The HTTP listener.
//!
//! Binds a TCP listener, serves each connection on its own task, and hands
//! every request to the [`Dispatcher`]. The hyper upgrade token is pulled
//! out of the request before the body is collected and reinserted
//! afterwards, so WebSocket routes can complete their upgrade once the 101
//! response has gone out.

use std::convert::Infallible;
use std::sync::Arc;

use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use hermes_core::{Request, Response, ResponseExt};
use hermes_router::Dispatcher;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// An HTTP server serving a [`Dispatcher`].
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Create a server for the given dispatcher.
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The dispatcher this server feeds.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run until SIGTERM or SIGINT.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Run until the given signal fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::bind(self.config.bind_addr(), e))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(self.config.bind_addr(), e))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already-bound listener until the signal fires.
    ///
    /// Useful when binding to port 0 and reading the port back.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        info!(%addr, secure = self.config.is_secure(), "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, shutdown).await {
                                    debug!(%remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        // Routes first, so WebSocket registries close their connections
        // before the listener stops draining.
        server.dispatcher.stop().await;

        let timeout = server.config.shutdown_timeout();
        info!(
            active = tracker.active_connections(),
            "waiting for connections to drain"
        );
        tokio::select! {
            _ = tracker.drained() => info!("all connections closed"),
            _ = tokio::time::sleep(timeout) => warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still active"
            ),
        }

        info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req).await }
        });

        // with_upgrades keeps the connection alive past a 101 response so
        // the upgraded protocol can take over the stream.
        let conn = http1::Builder::new()
            .serve_connection(io, service)
            .with_upgrades();

        tokio::select! {
            result = conn => result,
            _ = shutdown.recv() => Ok(()),
        }
    }

    async fn handle_request(
        self: &Arc<Self>,
        request: http::Request<Incoming>,
    ) -> Result<Response, Infallible> {
        debug!(method = %request.method(), path = request.uri().path(), "request");

        let (mut parts, body) = request.into_parts();
        // The upgrade token does not survive body collection unless it is
        // carried over by hand.
        let on_upgrade = parts.extensions.remove::<hyper::upgrade::OnUpgrade>();

        // One deadline covers body collection and dispatch, so a slow body
        // cannot grant the handler a fresh budget.
        let deadline = tokio::time::Instant::now() + self.config.request_timeout();

        let collected =
            match tokio::time::timeout_at(deadline, body.collect()).await {
                Ok(Ok(collected)) => collected.to_bytes(),
                Ok(Err(e)) => {
                    warn!(error = %e, "failed to collect request body");
                    return Ok(Response::json_error(
                        StatusCode::BAD_REQUEST,
                        "BODY_READ_ERROR",
                        &format!("failed to read request body: {e}"),
                    ));
                }
                Err(_) => {
                    warn!("request body collection timed out");
                    return Ok(Response::json_error(
                        StatusCode::REQUEST_TIMEOUT,
                        "REQUEST_TIMEOUT",
                        "request body collection timed out",
                    ));
                }
            };

        let mut request: Request = http::Request::from_parts(parts, Full::new(collected));
        if let Some(on_upgrade) = on_upgrade {
            request.extensions_mut().insert(on_upgrade);
        }

        let dispatched = self.dispatcher.dispatch(request, self.config.is_secure());
        match tokio::time::timeout_at(deadline, dispatched).await {
            Ok(response) => Ok(response),
            Err(_) => Ok(Response::json_error(
                StatusCode::GATEWAY_TIMEOUT,
                "HANDLER_TIMEOUT",
                "route handling timed out",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};
    use hermes_router::{BaseRoute, BoxFuture, RouteSettings};
    use hermes_ws::{WebSocketRoute, WebSocketRouteSettings};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn hello_handler(_request: &Request) -> BoxFuture<'_, Response> {
        Box::pin(async {
            http::Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from_static(b"hello")))
                .unwrap()
        })
    }

    fn echo_body_handler(request: &Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let body = request.body().clone();
            http::Response::builder()
                .status(StatusCode::OK)
                .body(body)
                .unwrap()
        })
    }

    async fn start_server(dispatcher: Dispatcher) -> (std::net::SocketAddr, ShutdownSignal) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let server = Server::new(
            ServerConfig::builder()
                .shutdown_timeout(Duration::from_secs(1))
                .build(),
            dispatcher,
        );
        let signal = shutdown.clone();
        tokio::spawn(async move {
            server.serve_on(listener, signal).await.unwrap();
        });
        (addr, shutdown)
    }

    fn plain_dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .route(BaseRoute::new(
                "hello",
                RouteSettings::with_path_pattern("/hello").unwrap(),
                hello_handler,
            ))
            .route(BaseRoute::new(
                "echo",
                RouteSettings::with_path_pattern("/echo").unwrap(),
                echo_body_handler,
            ))
            .default_handler(hermes_router::NotFoundRoute::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_dispatcher_routes() {
        let (addr, shutdown) = start_server(plain_dispatcher()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("http://{addr}/hello"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "hello");

        let missing = client
            .get(format!("http://{addr}/nope"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_request_body_reaches_route() {
        let (addr, shutdown) = start_server(plain_dispatcher()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{addr}/echo"))
            .body("round trip")
            .send()
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "round trip");

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_websocket_upgrade_end_to_end() {
        let ws_route: WebSocketRoute = WebSocketRoute::new(
            WebSocketRouteSettings::new()
                .keep_alive(false)
                .path_pattern("/ws")
                .unwrap(),
        );

        // Echo frames back from outside the listener callback.
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
        ws_route.events().frame_received.subscribe(move |event| {
            let _ = frame_tx.send((event.connection_id, event.message.clone()));
        });
        let echo_route = ws_route.clone();
        tokio::spawn(async move {
            while let Some((id, message)) = frame_rx.recv().await {
                if message.is_data() {
                    let _ = echo_route.send_frame(id, message).await;
                }
            }
        });

        let dispatcher = Dispatcher::builder()
            .route(ws_route)
            .default_handler(hermes_router::NotFoundRoute::new())
            .build()
            .unwrap();
        let (addr, shutdown) = start_server(dispatcher).await;

        let (mut socket, response) =
            tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
                .await
                .unwrap();
        assert_eq!(response.status(), http::StatusCode::SWITCHING_PROTOCOLS);

        socket
            .send(tokio_tungstenite::tungstenite::Message::Text(
                "over the wire".into(),
            ))
            .await
            .unwrap();
        let echoed = socket.next().await.unwrap().unwrap();
        assert_eq!(echoed.into_text().unwrap().as_str(), "over the wire");

        socket.close(None).await.unwrap();
        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_request_timeout_spans_body_and_handler() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        fn slow_handler(_request: &Request) -> BoxFuture<'_, Response> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                http::Response::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from_static(b"slow")))
                    .unwrap()
            })
        }

        let dispatcher = Dispatcher::builder()
            .route(BaseRoute::new(
                "slow",
                RouteSettings::with_path_pattern("/slow").unwrap(),
                slow_handler,
            ))
            .default_handler(hermes_router::NotFoundRoute::new())
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let server = Server::new(
            ServerConfig::builder()
                .request_timeout(Duration::from_millis(600))
                .shutdown_timeout(Duration::from_millis(100))
                .build(),
            dispatcher,
        );
        let signal = shutdown.clone();
        tokio::spawn(async move {
            server.serve_on(listener, signal).await.unwrap();
        });

        // Body arrives in two pieces and the handler sleeps: each phase
        // fits the budget on its own, the two together do not.
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST /slow HTTP/1.1\r\nHost: test\r\nContent-Length: 10\r\n\r\nhello")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        stream.write_all(b"world").await.unwrap();

        let mut response = String::new();
        let mut buf = vec![0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            response.push_str(&String::from_utf8_lossy(&buf[..n]));
            if response.contains("HANDLER_TIMEOUT") {
                break;
            }
        }
        assert!(response.starts_with("HTTP/1.1 504"), "got: {response}");
        assert!(response.contains("HANDLER_TIMEOUT"));

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_run_with_shutdown_rejects_bad_address() {
        let server = Server::new(
            ServerConfig::builder().bind_addr("not-an-address").build(),
            plain_dispatcher(),
        );
        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_stops_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = ShutdownSignal::new();
        let server = Server::new(
            ServerConfig::builder()
                .shutdown_timeout(Duration::from_millis(100))
                .build(),
            plain_dispatcher(),
        );

        shutdown.trigger();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            server.serve_on(listener, shutdown),
        )
        .await;
        assert!(result.unwrap().is_ok());
    }
}
