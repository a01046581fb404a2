//! Wire envelope types.
//!
//! Three message shapes travel over one connection: outgoing commands,
//! incoming responses and incoming events. Incoming messages carry no
//! discriminator field - they are classified structurally, by the presence
//! or absence of `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command ID - monotonically increasing, unique across a connection
pub type CommandId = u64;

/// Target ID assigned by the browser
pub type TargetId = String;

/// Session ID for attached targets
pub type SessionId = String;

/// Command sent to the browser
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    pub id: CommandId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Response to an earlier command, matched by `id`
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: CommandId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RemoteError>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Error body of a failed command
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Unsolicited event from the browser (no command ID)
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Incoming message. Responses carry an `id`; events carry a `method` and
/// no `id`. The untagged deserialization tries `Response` first, so the
/// classification depends only on message shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Response(Response),
    Event(Event),
}

impl ServerMessage {
    /// Session the message is scoped to, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            ServerMessage::Response(response) => response.session_id.as_ref(),
            ServerMessage::Event(event) => event.session_id.as_ref(),
        }
    }
}
