//! CDP Client - the connection context.
//!
//! One physical connection (WebSocket or pipe) carries traffic for the
//! browser itself plus every attached target. A router task forwards each
//! decoded message to the owning context's queue: unscoped messages to the
//! connection context, session-tagged messages to that session's context.
//! Command IDs come from one allocator shared across all of them, so IDs
//! are unique connection-wide.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use url::Url;

use crate::context::{CDPContext, CommandFuture, ResponseFuture};
use crate::domains::{target, DomainCommand, DomainEvent};
use crate::error::{CDPError, Result};
use crate::protocol::{ServerMessage, SessionId};
use crate::session::CDPSession;
use crate::transport::{PipeTransport, SocketTransport, Transport};

/// CDP Client - manages one connection to the browser
pub struct CDPClient {
    transport: Arc<dyn Transport>,
    ids: Arc<AtomicU64>,
    root: Arc<CDPContext>,
    sessions: DashMap<SessionId, Arc<CDPSession>>,
    closed: AtomicBool,
}

impl CDPClient {
    /// Connect to a devtools WebSocket endpoint.
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        let url = Url::parse(ws_url)
            .map_err(|e| CDPError::Connect(format!("invalid endpoint {}: {}", ws_url, e)))?;
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let transport = SocketTransport::connect(&url, incoming_tx).await?;
        Ok(Self::start(transport, incoming_rx))
    }

    /// Wire up a browser launched with a remote-debugging pipe: `reader`
    /// carries the browser's output, `writer` our commands.
    pub fn connect_pipe<R, W>(reader: R, writer: W) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let transport = PipeTransport::new(reader, writer, incoming_tx);
        Self::start(transport, incoming_rx)
    }

    fn start(
        transport: Arc<dyn Transport>,
        mut incoming: mpsc::UnboundedReceiver<ServerMessage>,
    ) -> Arc<Self> {
        let ids = Arc::new(AtomicU64::new(1));
        let root = CDPContext::spawn(transport.clone(), ids.clone(), None);
        let client = Arc::new(Self {
            transport,
            ids,
            root,
            sessions: DashMap::new(),
            closed: AtomicBool::new(false),
        });

        // Router: only enqueues, never runs handler logic.
        let router = client.clone();
        tokio::spawn(async move {
            while let Some(message) = incoming.recv().await {
                router.route(message);
            }
            tracing::info!("Transport closed");
            router.teardown();
        });

        client
    }

    fn route(&self, message: ServerMessage) {
        let session_id = message.session_id().cloned();
        match session_id {
            None => self.root.enqueue(message),
            Some(session_id) => {
                let session = self
                    .sessions
                    .get(&session_id)
                    .map(|entry| Arc::clone(entry.value()));
                match session {
                    Some(session) => session.context().enqueue(message),
                    None => {
                        tracing::debug!("Ignoring message for unknown session: {}", session_id)
                    }
                }
            }
        }
    }

    /// Send a command and wait for its response (120 second ceiling).
    pub async fn send_command(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.root.call(method, params).await
    }

    /// Send a command and return a handle to the eventual response. The
    /// handle carries no deadline; the caller decides how long to wait.
    pub async fn send_command_async(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<ResponseFuture> {
        self.root.send_raw(method, params).await
    }

    /// Typed form of [`send_command`](Self::send_command).
    pub async fn send<C: DomainCommand>(&self, command: C) -> Result<C::Output> {
        self.root.send(command).await
    }

    /// Typed form of [`send_command_async`](Self::send_command_async).
    pub async fn send_async<C: DomainCommand>(&self, command: C) -> Result<CommandFuture<C>> {
        self.root.send_async(command).await
    }

    /// Register a handler for an unscoped event. One handler per event
    /// name; registering again replaces the previous one.
    pub fn subscribe<F>(&self, method: impl Into<String>, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.root.subscribe(method, callback);
    }

    /// Like [`subscribe`](Self::subscribe) but the handler returns a
    /// future, awaited before the next message is dispatched.
    pub fn subscribe_async<F, Fut>(&self, method: impl Into<String>, callback: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.root.subscribe_async(method, callback);
    }

    /// Typed event registration for unscoped events.
    pub fn on_event<E, F>(&self, callback: F)
    where
        E: DomainEvent + 'static,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.root.on(callback);
    }

    pub fn on_event_async<E, F, Fut>(&self, callback: F)
    where
        E: DomainEvent + 'static,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.root.on_async(callback);
    }

    /// Attach to a target and create a session for it. The session ID is
    /// assigned by the browser.
    pub async fn attach(self: &Arc<Self>, target_id: &str) -> Result<Arc<CDPSession>> {
        let session_id = self
            .send(target::AttachToTarget {
                target_id: target_id.to_string(),
                flatten: true,
            })
            .await?;
        let session = CDPSession::new(
            Arc::downgrade(self),
            session_id.clone(),
            target_id.to_string(),
            self.transport.clone(),
            self.ids.clone(),
        );
        self.sessions.insert(session_id, session.clone());
        Ok(session)
    }

    pub(crate) fn remove_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Close the connection. Every outstanding call across the connection
    /// and its sessions fails with [`CDPError::Closed`].
    pub async fn close(&self) {
        self.transport.close().await;
        self.teardown();
    }

    fn teardown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.root.close();
        let sessions: Vec<Arc<CDPSession>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.sessions.clear();
        for session in sessions {
            session.context().close();
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.root.pending_len()
    }

    #[cfg(test)]
    pub(crate) fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
