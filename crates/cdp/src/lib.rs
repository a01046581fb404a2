//! CDP protocol runtime - drives a browser over its remote-debugging wire
//! protocol for automated crawling.
//!
//! Design decisions:
//! 1. Single connection per browser (WebSocket or pipe), multiplexed into
//!    per-target sessions sharing one command-ID space
//! 2. Request/response matching via ID; events are dispatched strictly in
//!    arrival order on one worker per context, so handler code never races
//!    with itself
//! 3. Classified failures - callers see a [`CDPError`], never a raw
//!    transport error
//! 4. Typed domain calls are plain descriptor impls, no runtime magic

pub mod client;
mod context;
pub mod domains;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::CDPClient;
pub use context::{CommandFuture, ResponseFuture};
pub use domains::{DomainCommand, DomainEvent};
pub use error::{CDPError, Result};
pub use protocol::{
    Command, CommandId, Event, RemoteError, Response, ServerMessage, SessionId, TargetId,
};
pub use session::CDPSession;
