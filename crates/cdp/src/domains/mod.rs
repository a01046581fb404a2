//! Typed domain bindings.
//!
//! Each protocol operation is described by a [`DomainCommand`] impl: the
//! wire method string, the params shape (the struct itself) and how to
//! decode the result, including lifting a single named field out of the
//! result object. Event payloads implement [`DomainEvent`] with their wire
//! event name. The catalogue is open - anything not covered here goes
//! through the raw string-method call surface on the client or session.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub mod browser;
pub mod network;
pub mod page;
pub mod runtime;
pub mod target;

/// One protocol operation: `"Domain.operation"` plus the declared result
/// type. `UNWRAP` names the single result field whose value becomes the
/// output (used when the wire result is `{"field": <value>}` but the
/// caller wants `<value>`).
pub trait DomainCommand: Serialize {
    const METHOD: &'static str;
    const UNWRAP: Option<&'static str> = None;
    type Output: DeserializeOwned;

    /// Parameter object for the wire command. Optional fields that are
    /// `None` are omitted by the serde attributes on the command struct;
    /// an empty object collapses to no params at all.
    fn params(&self) -> Result<Option<Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) if map.is_empty() => Ok(None),
            value => Ok(Some(value)),
        }
    }

    fn parse_result(mut result: Value) -> Result<Self::Output> {
        let value = match Self::UNWRAP {
            Some(field) => result.get_mut(field).map(Value::take).unwrap_or(Value::Null),
            None => result,
        };
        Ok(serde_json::from_value(value)?)
    }
}

/// One protocol event payload, named `"Domain.eventName"` on the wire.
pub trait DomainEvent: DeserializeOwned {
    const METHOD: &'static str;
}

/// Result placeholder for operations whose response body is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ignored;

impl<'de> Deserialize<'de> for Ignored {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(Ignored)
    }
}
