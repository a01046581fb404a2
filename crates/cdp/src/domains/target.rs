//! Target domain - discovery, attachment and teardown of browser targets.

use serde::{Deserialize, Serialize};

use super::{DomainCommand, DomainEvent, Ignored};
use crate::protocol::{SessionId, TargetId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargets {
    pub discover: bool,
}

impl DomainCommand for SetDiscoverTargets {
    const METHOD: &'static str = "Target.setDiscoverTargets";
    type Output = Ignored;
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTargets {}

impl DomainCommand for GetTargets {
    const METHOD: &'static str = "Target.getTargets";
    const UNWRAP: Option<&'static str> = Some("targetInfos");
    type Output = Vec<TargetInfo>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTarget {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_window: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
}

impl CreateTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            new_window: None,
            width: None,
            height: None,
        }
    }
}

impl DomainCommand for CreateTarget {
    const METHOD: &'static str = "Target.createTarget";
    const UNWRAP: Option<&'static str> = Some("targetId");
    type Output = TargetId;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTarget {
    pub target_id: TargetId,
    pub flatten: bool,
}

impl DomainCommand for AttachToTarget {
    const METHOD: &'static str = "Target.attachToTarget";
    const UNWRAP: Option<&'static str> = Some("sessionId");
    type Output = SessionId;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTarget {
    pub target_id: TargetId,
}

impl DomainCommand for CloseTarget {
    const METHOD: &'static str = "Target.closeTarget";
    type Output = Ignored;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
    #[serde(default)]
    pub browser_context_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreated {
    pub target_info: TargetInfo,
}

impl DomainEvent for TargetCreated {
    const METHOD: &'static str = "Target.targetCreated";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDestroyed {
    pub target_id: TargetId,
}

impl DomainEvent for TargetDestroyed {
    const METHOD: &'static str = "Target.targetDestroyed";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCrashed {
    pub target_id: TargetId,
    pub status: String,
    pub error_code: i64,
}

impl DomainEvent for TargetCrashed {
    const METHOD: &'static str = "Target.targetCrashed";
}
