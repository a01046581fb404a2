//! CDP Session - one attached browser target.
//!
//! Sessions share the connection's transport and command-ID allocator but
//! own their correlation table and event-handler registry: a session only
//! sees messages tagged with its own identifier.

use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};

use serde_json::Value;

use crate::client::CDPClient;
use crate::context::{CDPContext, CommandFuture, ResponseFuture};
use crate::domains::{target, DomainCommand, DomainEvent};
use crate::error::Result;
use crate::protocol::{SessionId, TargetId};
use crate::transport::Transport;

pub struct CDPSession {
    session_id: SessionId,
    target_id: TargetId,
    client: Weak<CDPClient>,
    context: Arc<CDPContext>,
}

impl CDPSession {
    pub(crate) fn new(
        client: Weak<CDPClient>,
        session_id: SessionId,
        target_id: TargetId,
        transport: Arc<dyn Transport>,
        ids: Arc<AtomicU64>,
    ) -> Arc<Self> {
        let context = CDPContext::spawn(transport, ids, Some(session_id.clone()));
        Arc::new(Self {
            session_id,
            target_id,
            client,
            context,
        })
    }

    pub(crate) fn context(&self) -> &Arc<CDPContext> {
        &self.context
    }

    /// Session ID assigned by the browser.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Target this session is attached to.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a command within this session's context and wait for its
    /// response (120 second ceiling).
    pub async fn send_command(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.context.call(method, params).await
    }

    /// Send a command and return a handle to the eventual response.
    pub async fn send_command_async(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<ResponseFuture> {
        self.context.send_raw(method, params).await
    }

    /// Typed form of [`send_command`](Self::send_command).
    pub async fn send<C: DomainCommand>(&self, command: C) -> Result<C::Output> {
        self.context.send(command).await
    }

    /// Typed form of [`send_command_async`](Self::send_command_async).
    pub async fn send_async<C: DomainCommand>(&self, command: C) -> Result<CommandFuture<C>> {
        self.context.send_async(command).await
    }

    /// Register a handler for events tagged with this session's ID. One
    /// handler per event name; registering again replaces the previous one.
    pub fn subscribe<F>(&self, method: impl Into<String>, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.context.subscribe(method, callback);
    }

    pub fn subscribe_async<F, Fut>(&self, method: impl Into<String>, callback: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.context.subscribe_async(method, callback);
    }

    /// Typed event registration for this session's events.
    pub fn on_event<E, F>(&self, callback: F)
    where
        E: DomainEvent + 'static,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.context.on(callback);
    }

    pub fn on_event_async<E, F, Fut>(&self, callback: F)
    where
        E: DomainEvent + 'static,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.context.on_async(callback);
    }

    /// Close the session: best-effort close of the remote target, removal
    /// from the connection's session table, then teardown of this context
    /// (pending calls fail with `Closed`). Never fails.
    pub async fn close(&self) {
        match self.client.upgrade() {
            Some(client) => {
                let close = target::CloseTarget {
                    target_id: self.target_id.clone(),
                };
                if let Err(e) = client.send(close).await {
                    tracing::warn!("Error closing target {}: {}", self.target_id, e);
                }
                client.remove_session(&self.session_id);
            }
            None => tracing::debug!(
                "Connection already gone, skipping close of target {}",
                self.target_id
            ),
        }
        self.context.close();
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.context.pending_len()
    }
}
