//! Message transports.
//!
//! A transport frames outgoing commands and feeds every decoded incoming
//! message into the connection's channel. Two framings exist: whole text
//! messages over a WebSocket, and NUL-delimited JSON over a raw byte pipe.
//!
//! Design: the read loop only decodes and forwards. It never executes
//! handler logic, so one slow consumer cannot stall the socket.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{CDPError, Result};
use crate::protocol::{Command, ServerMessage};

/// Upper bound on the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest wire payload echoed into trace logs.
const TRACE_LIMIT: usize = 1024;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Byte-level duplex channel delivering whole protocol messages.
///
/// Implementations serialize writes behind a lock so concurrent senders
/// cannot interleave partial frames.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Serialize the command and write one complete frame.
    async fn send(&self, command: &Command) -> Result<()>;

    /// Close the underlying channel. Idempotent; sends fail fast afterwards.
    async fn close(&self);
}

fn ellipses(text: &str) -> Cow<'_, str> {
    if text.len() <= TRACE_LIMIT {
        return Cow::Borrowed(text);
    }
    let mut end = TRACE_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", &text[..end]))
}

/// Decode one raw frame and forward it. Malformed frames are logged and
/// dropped; they must not terminate the connection.
fn decode_and_forward(raw: &str, incoming: &mpsc::UnboundedSender<ServerMessage>) {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!("<- {}", ellipses(raw));
    }
    match serde_json::from_str::<ServerMessage>(raw) {
        Ok(message) => {
            let _ = incoming.send(message);
        }
        Err(e) => tracing::error!("Failed to parse message: {}", e),
    }
}

/// WebSocket transport. One frame is one text message; tungstenite
/// reassembles fragmented frames before they reach the read loop.
pub struct SocketTransport {
    sink: Mutex<WsSink>,
    closed: AtomicBool,
}

impl SocketTransport {
    /// Connect to a devtools WebSocket endpoint. Fails if the handshake
    /// does not complete within [`CONNECT_TIMEOUT`].
    ///
    /// Every decoded incoming message is sent to `incoming`; dropping the
    /// sender's receive side is observed by the connection as a close.
    pub async fn connect(
        url: &Url,
        incoming: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<Arc<Self>> {
        let handshake = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                CDPError::Connect(format!("handshake timed out after {:?}", CONNECT_TIMEOUT))
            })?
            .map_err(|e| CDPError::Connect(e.to_string()))?;

        let (sink, mut stream) = handshake.0.split();
        let transport = Arc::new(Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        });

        tokio::spawn(async move {
            while let Some(next) = stream.next().await {
                match next {
                    Ok(Message::Text(text)) => decode_and_forward(&text, &incoming),
                    Ok(Message::Close(_)) => {
                        tracing::info!("WebSocket closed by remote");
                        break;
                    }
                    Ok(_) => {} // ping/pong/binary
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            // Dropping `incoming` here lets the connection start teardown.
        });

        Ok(transport)
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send(&self, command: &Command) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CDPError::Closed);
        }
        let json = serde_json::to_string(command)?;
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("-> {}", ellipses(&json));
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            tracing::debug!("Error closing WebSocket: {}", e);
        }
    }
}

/// Pipe transport over externally supplied byte streams. One frame is the
/// UTF-8 JSON of a message followed by a single NUL byte.
pub struct PipeTransport {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    closed: AtomicBool,
}

impl PipeTransport {
    /// Wire up a pre-existing input/output stream pair (typically the
    /// browser's `--remote-debugging-pipe` file descriptors).
    pub fn new<R, W>(
        reader: R,
        writer: W,
        incoming: mpsc::UnboundedSender<ServerMessage>,
    ) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let transport = Arc::new(Self {
            writer: Mutex::new(Box::new(writer)),
            closed: AtomicBool::new(false),
        });

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut frame = Vec::with_capacity(8 * 1024);
            loop {
                frame.clear();
                match reader.read_until(0, &mut frame).await {
                    Ok(0) => {
                        tracing::info!("Pipe reached end of stream");
                        break;
                    }
                    Ok(_) => {
                        if frame.last() != Some(&0) {
                            // Stream ended in the middle of a frame.
                            tracing::debug!("Dropping partial frame at end of stream");
                            break;
                        }
                        frame.pop();
                        match std::str::from_utf8(&frame) {
                            Ok(text) => decode_and_forward(text, &incoming),
                            Err(e) => tracing::error!("Failed to parse message: {}", e),
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading pipe: {}", e);
                        break;
                    }
                }
            }
        });

        transport
    }
}

#[async_trait]
impl Transport for PipeTransport {
    async fn send(&self, command: &Command) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CDPError::Closed);
        }
        let json = serde_json::to_string(command)?;
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("-> {}", ellipses(&json));
        }
        let mut buffer = json.into_bytes();
        buffer.push(0);
        let mut writer = self.writer.lock().await;
        writer.write_all(&buffer).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!("Error closing pipe: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipe_pair() -> (
        Arc<PipeTransport>,
        mpsc::UnboundedReceiver<ServerMessage>,
        tokio::io::ReadHalf<tokio::io::DuplexStream>,
        tokio::io::WriteHalf<tokio::io::DuplexStream>,
    ) {
        let (local, remote) = tokio::io::duplex(64 * 1024);
        let (read, write) = tokio::io::split(local);
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = PipeTransport::new(read, write, tx);
        let (remote_read, remote_write) = tokio::io::split(remote);
        (transport, rx, remote_read, remote_write)
    }

    #[tokio::test]
    async fn test_pipe_reassembles_frames_across_chunks() {
        let (_transport, mut rx, _remote_read, mut remote_write) = pipe_pair();

        // One frame split over two writes, then two frames in one write.
        remote_write
            .write_all(br#"{"method":"Page.loadEv"#)
            .await
            .unwrap();
        remote_write
            .write_all(b"entFired\",\"params\":{\"timestamp\":1.0}}\0")
            .await
            .unwrap();
        remote_write
            .write_all(b"{\"id\":1,\"result\":{}}\0{\"id\":2,\"result\":{}}\0")
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            ServerMessage::Event(event) => assert_eq!(event.method, "Page.loadEventFired"),
            other => panic!("unexpected message: {:?}", other),
        }
        for expected in [1, 2] {
            match rx.recv().await.unwrap() {
                ServerMessage::Response(response) => assert_eq!(response.id, expected),
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_pipe_drops_malformed_frame_and_continues() {
        let (_transport, mut rx, _remote_read, mut remote_write) = pipe_pair();

        remote_write.write_all(b"this is not json\0").await.unwrap();
        remote_write
            .write_all(b"{\"id\":3,\"result\":{}}\0")
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            ServerMessage::Response(response) => assert_eq!(response.id, 3),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pipe_send_writes_nul_terminated_frame() {
        let (transport, _rx, mut remote_read, _remote_write) = pipe_pair();

        let command = Command {
            id: 5,
            method: "Network.enable".to_string(),
            params: None,
            session_id: None,
        };
        transport.send(&command).await.unwrap();

        let mut reader = BufReader::new(&mut remote_read);
        let mut frame = Vec::new();
        reader.read_until(0, &mut frame).await.unwrap();
        assert_eq!(frame.pop(), Some(0));
        let wire: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(wire, json!({"id": 5, "method": "Network.enable"}));
    }

    #[tokio::test]
    async fn test_send_after_close_fails_fast() {
        let (transport, _rx, _remote_read, _remote_write) = pipe_pair();

        transport.close().await;
        transport.close().await; // idempotent

        let command = Command {
            id: 1,
            method: "Network.enable".to_string(),
            params: None,
            session_id: None,
        };
        match transport.send(&command).await {
            Err(CDPError::Closed) => {}
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pipe_end_of_stream_closes_incoming() {
        let (_transport, mut rx, remote_read, remote_write) = pipe_pair();
        // Both halves must go away for the local side to observe EOF.
        drop(remote_read.unsplit(remote_write));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_ellipses_truncates_long_payloads() {
        let short = "x".repeat(10);
        assert_eq!(ellipses(&short), short);
        let long = "y".repeat(TRACE_LIMIT + 10);
        let truncated = ellipses(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.len(), TRACE_LIMIT + 3);
    }
}
