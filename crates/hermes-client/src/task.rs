//! Background request execution.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ClientError;
use crate::request::{ClientRequest, ClientResponse};
use crate::session::ClientSession;

/// Outcome of a background request.
#[derive(Debug)]
pub enum TaskEvent {
    /// The request completed with a response.
    Response(ClientResponse),
    /// The pipeline failed.
    Error(ClientError),
}

/// A request running on its own tokio task.
///
/// The outcome arrives on an internal channel; [`RequestTask::recv`] waits
/// for it. [`RequestTask::cancel`] aborts a transfer in flight, dropping
/// the connection with it.
#[derive(Debug)]
pub struct RequestTask {
    handle: JoinHandle<()>,
    receiver: mpsc::Receiver<TaskEvent>,
}

impl RequestTask {
    /// Submit a request on a background task.
    pub fn spawn(session: Arc<ClientSession>, request: ClientRequest) -> Self {
        let (tx, receiver) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let event = match session.submit(request).await {
                Ok(response) => TaskEvent::Response(response),
                Err(error) => TaskEvent::Error(error),
            };
            if tx.send(event).await.is_err() {
                debug!("request task outcome dropped; receiver gone");
            }
        });
        Self { handle, receiver }
    }

    /// Wait for the outcome.
    ///
    /// Returns `None` if the task was cancelled before producing one.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        self.receiver.recv().await
    }

    /// Abort the task, cancelling any transfer in flight.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RequestTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ClientSessionSettings;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn one_shot_server(response: String) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        addr
    }

    fn session() -> Arc<ClientSession> {
        Arc::new(ClientSession::new(ClientSessionSettings::new().keep_alive(false)).unwrap())
    }

    #[tokio::test]
    async fn test_task_delivers_response() {
        let addr = one_shot_server(
            "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\ndone".to_string(),
        )
        .await;

        let request = ClientRequest::get(format!("http://{addr}/")).unwrap();
        let mut task = RequestTask::spawn(session(), request);

        match task.recv().await.unwrap() {
            TaskEvent::Response(response) => {
                assert_eq!(response.body_string().unwrap(), "done");
            }
            TaskEvent::Error(error) => panic!("unexpected error: {error}"),
        }
        assert!(task.is_finished());
    }

    #[tokio::test]
    async fn test_task_delivers_error() {
        // Nothing is listening here.
        let request = ClientRequest::get("http://127.0.0.1:1/unreachable").unwrap();
        let mut task = RequestTask::spawn(session(), request);

        match task.recv().await.unwrap() {
            TaskEvent::Error(ClientError::Request(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_blocked_transfer() {
        // A server that accepts and then never responds.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            // Hold the socket open without answering.
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            drop(socket);
        });

        let request = ClientRequest::get(format!("http://{addr}/")).unwrap();
        let mut task = RequestTask::spawn(session(), request);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        task.cancel();

        assert!(task.recv().await.is_none());
    }
}
