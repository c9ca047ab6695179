//! Socket abstraction the connection supervisor runs on.
//!
//! A [`Connector`] opens a [`Link`]: an outbound [`FrameSink`] and an inbound
//! [`FrameStream`] that can be driven independently inside one `select!`.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("socket error: {0}")]
    Socket(String),
}

#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait FrameStream: Send {
    /// Next text frame; `None` once the peer has closed the connection.
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>>;
}

pub struct Link {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> Result<Link, TransportError>;
}

// ── WebSocket ────────────────────────────────────────────────────────────────

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Link, TransportError> {
        let (socket, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|err| TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            })?;
        let (sink, stream) = socket.split();
        Ok(Link {
            sink: Box::new(WsSink(sink)),
            stream: Box::new(WsStream(stream)),
        })
    }
}

struct WsSink(SplitSink<Socket, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.0
            .send(Message::Text(text))
            .await
            .map_err(|err| TransportError::Socket(err.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.0
            .close()
            .await
            .map_err(|err| TransportError::Socket(err.to_string()))
    }
}

struct WsStream(SplitStream<Socket>);

#[async_trait]
impl FrameStream for WsStream {
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    debug!(len = bytes.len(), "skipping binary frame");
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "peer sent close frame");
                    return None;
                }
                Ok(_) => continue,
                Err(err) => return Some(Err(TransportError::Socket(err.to_string()))),
            }
        }
    }
}

// ── In-memory transport for tests ────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;
    use crate::{ClientEvent, ClientOptions, spawn_client};

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("ws://{}", listener.local_addr().unwrap());
        (listener, endpoint)
    }

    #[tokio::test]
    async fn ws_stream_yields_text_only_and_ends_on_close() {
        let (listener, endpoint) = listen().await;
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Binary(
                br#"{"action":"agent_start","agent":"bin"}"#.to_vec(),
            ))
            .await
            .unwrap();
            ws.send(Message::Ping(vec![1, 2, 3])).await.unwrap();
            ws.send(Message::Text(r#"{"action":"agent_start","agent":"text"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
            // Ends on the close reply or once the client drops the socket.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let Link { sink, mut stream } = WsConnector.connect(&endpoint).await.unwrap();
        let mut frames = Vec::new();
        while let Some(frame) = stream.next_frame().await {
            frames.push(frame.unwrap());
        }
        assert_eq!(frames, [r#"{"action":"agent_start","agent":"text"}"#]);

        drop(sink);
        drop(stream);
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn client_shutdown_sends_close_frame() {
        let (listener, endpoint) = listen().await;
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Close(_)) => return true,
                    Ok(_) => continue,
                    Err(_) => return false,
                }
            }
            false
        });

        let (handle, mut events) = spawn_client(
            WsConnector,
            ClientOptions {
                endpoint,
                reconnect_delay: Duration::from_secs(1),
                max_attempts: None,
            },
        );
        assert_eq!(events.recv().await, Some(ClientEvent::Connected));
        handle.shutdown().await.unwrap();

        let saw_close = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(saw_close, "server never received a close frame");
    }
}
