//! Network domain - request/response observation for the crawler's
//! recording path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DomainCommand, DomainEvent, Ignored};

pub type RequestId = String;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_buffer_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resource_buffer_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_post_data_size: Option<i64>,
}

impl DomainCommand for Enable {
    const METHOD: &'static str = "Network.enable";
    type Output = Ignored;
}

#[derive(Debug, Clone, Serialize)]
pub struct Disable {}

impl DomainCommand for Disable {
    const METHOD: &'static str = "Network.disable";
    type Output = Ignored;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub url: String,
    pub status: i64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSent {
    pub request_id: RequestId,
    #[serde(default)]
    pub loader_id: Option<String>,
    pub request: Request,
    pub timestamp: f64,
}

impl DomainEvent for RequestWillBeSent {
    const METHOD: &'static str = "Network.requestWillBeSent";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    pub request_id: RequestId,
    pub response: Response,
    pub timestamp: f64,
}

impl DomainEvent for ResponseReceived {
    const METHOD: &'static str = "Network.responseReceived";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFinished {
    pub request_id: RequestId,
    pub timestamp: f64,
    #[serde(default)]
    pub encoded_data_length: f64,
}

impl DomainEvent for LoadingFinished {
    const METHOD: &'static str = "Network.loadingFinished";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailed {
    pub request_id: RequestId,
    pub timestamp: f64,
    pub error_text: String,
    #[serde(default)]
    pub canceled: Option<bool>,
    #[serde(default)]
    pub blocked_reason: Option<String>,
}

impl DomainEvent for LoadingFailed {
    const METHOD: &'static str = "Network.loadingFailed";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestServedFromCache {
    pub request_id: RequestId,
}

impl DomainEvent for RequestServedFromCache {
    const METHOD: &'static str = "Network.requestServedFromCache";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReceived {
    pub request_id: RequestId,
    pub timestamp: f64,
    pub data_length: i64,
    pub encoded_data_length: i64,
}

impl DomainEvent for DataReceived {
    const METHOD: &'static str = "Network.dataReceived";
}
