//! Live probe policy
//!
//! The probe context answers with whatever its player has loaded *right now*,
//! which lags behind client-side navigations. An answer only counts once its
//! content id equals the id derived from the page address; until then the
//! caller retries, up to a fixed number of attempts. The async driver lives in
//! `vb-engine`; this module holds the decisions so every runtime (native or
//! wasm) applies the same rules.

use serde::{Deserialize, Serialize};

use crate::types::LiveStatus;

pub const DEFAULT_PROBE_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 1000;

// =============================================================================
// Attempt Tracking
// =============================================================================

/// What to do with a probe reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// The reply is about the target content; use it.
    Accept(LiveStatus),
    /// Stale reply; ask again after the retry delay.
    Retry,
    /// Attempt budget spent without a matching reply; treat as not live.
    Exhausted,
}

/// Attempt counter for one probe run against one target content id.
#[derive(Debug, Clone)]
pub struct ProbeAttempts {
    target: String,
    max_attempts: u32,
    attempts: u32,
}

impl ProbeAttempts {
    /// A budget of zero is treated as one attempt.
    pub fn new(target: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            target: target.into(),
            max_attempts: max_attempts.max(1),
            attempts: 0,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record one reply and decide what happens next.
    pub fn record(&mut self, reply: LiveStatus) -> ProbeVerdict {
        self.attempts += 1;
        if reply.is_for(&self.target) {
            return ProbeVerdict::Accept(reply);
        }
        log::debug!(
            "probe reply for {:?} while expecting {:?} (attempt {}/{})",
            reply.content_id,
            self.target,
            self.attempts,
            self.max_attempts
        );
        if self.attempts >= self.max_attempts {
            ProbeVerdict::Exhausted
        } else {
            ProbeVerdict::Retry
        }
    }
}

// =============================================================================
// Player State Inspection
// =============================================================================

/// Details a player exposes about its loaded content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    pub video_id: Option<String>,
    pub is_live_content: bool,
}

/// Player state visible from inside the page.
///
/// `player_api` is the live player object, current after client-side
/// navigation; `initial_response` is the response embedded at first load and
/// only serves as a fallback while the player API is not ready.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSnapshot {
    pub player_api: Option<VideoDetails>,
    pub initial_response: Option<VideoDetails>,
}

/// Read the live status the probe context reports for a player snapshot.
pub fn read_live_status(snapshot: &PlayerSnapshot) -> LiveStatus {
    match snapshot.player_api.as_ref().or(snapshot.initial_response.as_ref()) {
        Some(details) => LiveStatus {
            is_live: details.is_live_content,
            content_id: details.video_id.clone(),
        },
        None => LiveStatus::not_live(),
    }
}
