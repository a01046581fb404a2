//! Browser domain - version information and process shutdown.

use serde::{Deserialize, Serialize};

use super::{DomainCommand, Ignored};

#[derive(Debug, Clone, Serialize)]
pub struct GetVersion {}

impl DomainCommand for GetVersion {
    const METHOD: &'static str = "Browser.getVersion";
    type Output = Version;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub protocol_version: String,
    pub product: String,
    pub revision: String,
    pub user_agent: String,
    pub js_version: String,
}

/// Ask the browser process to exit gracefully.
#[derive(Debug, Clone, Serialize)]
pub struct Close {}

impl DomainCommand for Close {
    const METHOD: &'static str = "Browser.close";
    type Output = Ignored;
}
