//! Page domain - navigation and document lifecycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DomainCommand, DomainEvent, Ignored};

#[derive(Debug, Clone, Serialize)]
pub struct Enable {}

impl DomainCommand for Enable {
    const METHOD: &'static str = "Page.enable";
    type Output = Ignored;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigate {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl Navigate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
        }
    }
}

impl DomainCommand for Navigate {
    const METHOD: &'static str = "Page.navigate";
    type Output = NavigateResult;
}

/// Outcome of a navigation request. `error_text` is set when the
/// navigation was not started (the command itself still succeeds).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResult {
    pub frame_id: String,
    #[serde(default)]
    pub loader_id: Option<String>,
    #[serde(default)]
    pub error_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLifecycleEventsEnabled {
    pub enabled: bool,
}

impl DomainCommand for SetLifecycleEventsEnabled {
    const METHOD: &'static str = "Page.setLifecycleEventsEnabled";
    type Output = Ignored;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptToEvaluateOnNewDocument {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_name: Option<String>,
}

impl DomainCommand for AddScriptToEvaluateOnNewDocument {
    const METHOD: &'static str = "Page.addScriptToEvaluateOnNewDocument";
    const UNWRAP: Option<&'static str> = Some("identifier");
    type Output = String;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl DomainCommand for CaptureScreenshot {
    const METHOD: &'static str = "Page.captureScreenshot";
    const UNWRAP: Option<&'static str> = Some("data");
    /// Base64-encoded image data.
    type Output = String;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub frame_id: String,
    #[serde(default)]
    pub loader_id: Option<String>,
    pub name: String,
    pub timestamp: f64,
}

impl DomainEvent for LifecycleEvent {
    const METHOD: &'static str = "Page.lifecycleEvent";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadEventFired {
    pub timestamp: f64,
}

impl DomainEvent for LoadEventFired {
    const METHOD: &'static str = "Page.loadEventFired";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequestedNavigation {
    pub frame_id: String,
    pub reason: String,
    pub url: String,
    #[serde(default)]
    pub disposition: Option<String>,
}

impl DomainEvent for FrameRequestedNavigation {
    const METHOD: &'static str = "Page.frameRequestedNavigation";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameNavigated {
    pub frame: Value,
}

impl DomainEvent for FrameNavigated {
    const METHOD: &'static str = "Page.frameNavigated";
}
