//! Live probe
//!
//! The resolver cannot see player state; it asks the probe context over a
//! bridge and keeps asking until the answer is about the right content item.
//! Every failure mode (timeout, broken bridge, exhausted attempts) degrades to
//! "not live".

mod context;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};

use vb_core::{LiveStatus, ProbeAttempts, ProbeVerdict};

use crate::config::ProbeConfig;

pub use context::{spawn_probe_context, ChannelBridge, PlayerStateSource, ScriptedPlayer};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Probe context is gone")]
    Disconnected,
    #[error("Malformed probe reply: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One request/reply exchange with the probe context.
#[async_trait]
pub trait ProbeBridge: Send + Sync {
    async fn query(&self) -> Result<LiveStatus, BridgeError>;
}

pub struct LiveProbe {
    bridge: Arc<dyn ProbeBridge>,
    config: ProbeConfig,
}

impl LiveProbe {
    pub fn new(bridge: Arc<dyn ProbeBridge>, config: ProbeConfig) -> Self {
        Self { bridge, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Ask whether `target` is being broadcast live. Never fails.
    pub async fn probe(&self, target: &str) -> LiveStatus {
        let mut attempts = ProbeAttempts::new(target, self.config.attempts);
        loop {
            let reply = match timeout(self.config.reply_timeout(), self.bridge.query()).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    log::debug!("probe bridge failed for {}: {}", target, e);
                    return LiveStatus::not_live();
                }
                Err(_) => {
                    log::debug!(
                        "probe for {} timed out after {:?}",
                        target,
                        self.config.reply_timeout()
                    );
                    return LiveStatus::not_live();
                }
            };

            match attempts.record(reply) {
                ProbeVerdict::Accept(status) => return status,
                ProbeVerdict::Retry => sleep(self.config.retry_delay()).await,
                ProbeVerdict::Exhausted => {
                    log::debug!(
                        "probe for {} gave up after {} attempts",
                        target,
                        attempts.attempts()
                    );
                    return LiveStatus::not_live();
                }
            }
        }
    }
}
