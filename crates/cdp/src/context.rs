//! Per-context correlation and dispatch machinery.
//!
//! Every connection has one context for unscoped traffic and one more per
//! session. A context pairs sent commands with their responses and runs all
//! event/response processing on a single worker task, so handler code never
//! races with itself or with another message on the same context.
//!
//! Design decisions:
//! 1. The receive path only enqueues - processing happens on the worker
//! 2. One handler per event name, last registration wins
//! 3. Command IDs come from one allocator shared across the connection

use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::domains::{DomainCommand, DomainEvent};
use crate::error::{CDPError, Result};
use crate::protocol::{Command, CommandId, Event, Response, ServerMessage, SessionId};
use crate::transport::Transport;

/// Upper bound on a bounded-wait command call.
pub(crate) const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

tokio::task_local! {
    /// ID of the context whose dispatch worker is running on this task.
    static DISPATCHING: u64;
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

type CallOutcome = std::result::Result<Value, CDPError>;

/// Registered event handler. Sync callbacks are wrapped into a ready
/// future; async callbacks are awaited to completion before the next
/// message, which preserves the in-order, non-reentrant guarantee.
type EventHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

enum QueueItem {
    Message(ServerMessage),
    Shutdown,
}

/// Shared machinery behind the connection context and each session
/// context: the pending-command table, the event-handler registry and the
/// serialized dispatch worker.
pub(crate) struct CDPContext {
    id: u64,
    session_id: Option<SessionId>,
    transport: Arc<dyn Transport>,
    /// Connection-wide command ID allocator, shared with sibling contexts.
    ids: Arc<AtomicU64>,
    pending: DashMap<CommandId, oneshot::Sender<CallOutcome>>,
    listeners: DashMap<String, EventHandler>,
    queue: mpsc::UnboundedSender<QueueItem>,
    closed: AtomicBool,
}

impl CDPContext {
    pub(crate) fn spawn(
        transport: Arc<dyn Transport>,
        ids: Arc<AtomicU64>,
        session_id: Option<SessionId>,
    ) -> Arc<Self> {
        let (queue, mut receiver) = mpsc::unbounded_channel();
        let context = Arc::new(Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            session_id,
            transport,
            ids,
            pending: DashMap::new(),
            listeners: DashMap::new(),
            queue,
            closed: AtomicBool::new(false),
        });

        let worker = context.clone();
        tokio::spawn(async move {
            while let Some(item) = receiver.recv().await {
                match item {
                    QueueItem::Message(message) => {
                        DISPATCHING.scope(worker.id, worker.process(message)).await;
                    }
                    QueueItem::Shutdown => break,
                }
            }
        });

        context
    }

    /// Hand one incoming message to the worker. Never blocks; after close
    /// the message is dropped quietly (the context is tearing down).
    pub(crate) fn enqueue(&self, message: ServerMessage) {
        if self.closed.load(Ordering::Acquire)
            || self.queue.send(QueueItem::Message(message)).is_err()
        {
            tracing::debug!("Context closed, dropping message");
        }
    }

    async fn process(&self, message: ServerMessage) {
        match message {
            ServerMessage::Response(response) => self.resolve(response),
            ServerMessage::Event(event) => self.dispatch_event(event).await,
        }
    }

    fn resolve(&self, response: Response) {
        let Some((_, sender)) = self.pending.remove(&response.id) else {
            tracing::warn!("Received response for unknown command: {}", response.id);
            return;
        };
        let outcome = match response.error {
            Some(error) => Err(CDPError::Remote {
                code: error.code,
                message: error.message,
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
        // The caller may have timed out and stopped listening.
        let _ = sender.send(outcome);
    }

    async fn dispatch_event(&self, event: Event) {
        let handler = match self.listeners.get(&event.method) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                tracing::debug!("No handler for event: {}", event.method);
                return;
            }
        };
        let params = event.params.unwrap_or(Value::Null);
        let invocation = AssertUnwindSafe(async move { handler(params).await });
        if invocation.catch_unwind().await.is_err() {
            tracing::error!("{} handler panicked", event.method);
        }
    }

    /// Register the pending entry and put the command on the wire. The
    /// returned future resolves when the response arrives; it carries no
    /// deadline of its own.
    pub(crate) async fn send_raw(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<ResponseFuture> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CDPError::Closed);
        }
        let id = self.ids.fetch_add(1, Ordering::SeqCst);
        let command = Command {
            id,
            method: method.to_string(),
            params,
            session_id: self.session_id.clone(),
        };
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(id, sender);
        if let Err(e) = self.transport.send(&command).await {
            self.pending.remove(&id);
            return Err(e);
        }
        Ok(ResponseFuture { id, receiver })
    }

    /// Bounded-wait call: send, then wait up to [`COMMAND_TIMEOUT`] for the
    /// response. Fails immediately with [`CDPError::WouldDeadlock`] when
    /// invoked from this context's own dispatch worker, which must stay
    /// free to process the response.
    pub(crate) async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let on_own_worker = DISPATCHING
            .try_with(|dispatching| *dispatching == self.id)
            .unwrap_or(false);
        if on_own_worker {
            return Err(CDPError::WouldDeadlock);
        }

        let response = self.send_raw(method, params).await?;
        let id = response.id();
        match tokio::time::timeout(COMMAND_TIMEOUT, response).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // Evict so a late response is logged and dropped.
                self.pending.remove(&id);
                Err(CDPError::Timeout)
            }
        }
    }

    pub(crate) async fn send<C: DomainCommand>(&self, command: C) -> Result<C::Output> {
        let result = self.call(C::METHOD, command.params()?).await?;
        C::parse_result(result)
    }

    pub(crate) async fn send_async<C: DomainCommand>(
        &self,
        command: C,
    ) -> Result<CommandFuture<C>> {
        let inner = self.send_raw(C::METHOD, command.params()?).await?;
        Ok(CommandFuture {
            inner,
            _command: PhantomData,
        })
    }

    fn register(&self, method: String, handler: EventHandler) {
        self.listeners.insert(method, handler);
    }

    pub(crate) fn subscribe<F>(&self, method: impl Into<String>, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.register(
            method.into(),
            Arc::new(move |params| {
                callback(params);
                futures_util::future::ready(()).boxed()
            }),
        );
    }

    pub(crate) fn subscribe_async<F, Fut>(&self, method: impl Into<String>, callback: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(method.into(), Arc::new(move |params| callback(params).boxed()));
    }

    pub(crate) fn on<E, F>(&self, callback: F)
    where
        E: DomainEvent + 'static,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.subscribe(E::METHOD, move |params| {
            match serde_json::from_value::<E>(params) {
                Ok(event) => callback(event),
                Err(e) => tracing::error!("Failed to decode {} event: {}", E::METHOD, e),
            }
        });
    }

    pub(crate) fn on_async<E, F, Fut>(&self, callback: F)
    where
        E: DomainEvent + 'static,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe_async(E::METHOD, move |params| {
            match serde_json::from_value::<E>(params) {
                Ok(event) => callback(event).boxed(),
                Err(e) => {
                    tracing::error!("Failed to decode {} event: {}", E::METHOD, e);
                    futures_util::future::ready(()).boxed()
                }
            }
        });
    }

    /// Stop the worker and fail every still-pending call. Idempotent.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.queue.send(QueueItem::Shutdown);
        let ids: Vec<CommandId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, sender)) = self.pending.remove(&id) {
                let _ = sender.send(Err(CDPError::Closed));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Handle to an in-flight command. Resolves with the decoded result when
/// the response arrives; the pending entry stays registered until then (or
/// until the owning context is torn down).
pub struct ResponseFuture {
    id: CommandId,
    receiver: oneshot::Receiver<CallOutcome>,
}

impl ResponseFuture {
    /// ID of the command this future is waiting on.
    pub fn id(&self) -> CommandId {
        self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CDPError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Typed wrapper over [`ResponseFuture`] that decodes the result for one
/// operation, including single-field unwrapping.
pub struct CommandFuture<C: DomainCommand> {
    inner: ResponseFuture,
    _command: PhantomData<fn() -> C>,
}

impl<C: DomainCommand> CommandFuture<C> {
    /// ID of the command this future is waiting on.
    pub fn id(&self) -> CommandId {
        self.inner.id()
    }
}

impl<C: DomainCommand> Future for CommandFuture<C> {
    type Output = Result<C::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(C::parse_result(result)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}
