//! Runtime domain - JavaScript evaluation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DomainCommand, Ignored};

#[derive(Debug, Clone, Serialize)]
pub struct Enable {}

impl DomainCommand for Enable {
    const METHOD: &'static str = "Runtime.enable";
    type Output = Ignored;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluate {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
}

impl Evaluate {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            return_by_value: Some(true),
            await_promise: None,
        }
    }
}

impl DomainCommand for Evaluate {
    const METHOD: &'static str = "Runtime.evaluate";
    type Output = EvaluateResult;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}
