//! Cross-context wire messages
//!
//! Requests sent to a page context, its responses, and the reply of the live
//! probe bridge. All of them are plain JSON objects discriminated by a `type`
//! field; TypeScript bindings are exported for the extension scripts.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::boost::Boost;
use crate::types::LiveStatus;

/// Request handled by a page context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Request {
    /// Apply a boost to the audio graph now.
    UpdateVolume {
        #[ts(type = "number")]
        boost: Boost,
    },
    /// Report the boost in effect and the page's account, if any.
    GetCurrentVolume,
    /// The page navigated client-side; run a fresh resolution pass.
    UrlChanged,
    /// Configuration changed somewhere; reload and re-resolve.
    SettingsUpdated,
}

impl Request {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AckStatus {
    Ok,
    /// The page cannot host an audio graph.
    Unsupported,
}

/// Response of a page context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Response {
    Status {
        status: AckStatus,
    },
    CurrentVolume {
        #[ts(type = "number")]
        boost: Boost,
        #[serde(rename = "accountName", default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        account_name: Option<String>,
    },
}

impl Response {
    pub fn ok() -> Self {
        Self::Status {
            status: AckStatus::Ok,
        }
    }

    pub fn unsupported() -> Self {
        Self::Status {
            status: AckStatus::Unsupported,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Reply posted back by the probe context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ProbeMessage {
    #[serde(rename_all = "camelCase")]
    LiveStatusResult {
        is_live: bool,
        content_id: Option<String>,
    },
}

impl From<LiveStatus> for ProbeMessage {
    fn from(status: LiveStatus) -> Self {
        Self::LiveStatusResult {
            is_live: status.is_live,
            content_id: status.content_id,
        }
    }
}

impl From<ProbeMessage> for LiveStatus {
    fn from(message: ProbeMessage) -> Self {
        match message {
            ProbeMessage::LiveStatusResult { is_live, content_id } => Self { is_live, content_id },
        }
    }
}
