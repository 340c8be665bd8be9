//! The probe context
//!
//! Runs with access to the player and answers each probe request with a
//! `LIVE_STATUS_RESULT` JSON message. It shares nothing with the resolver but
//! the channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use vb_core::probe::{read_live_status, PlayerSnapshot};
use vb_core::{LiveStatus, ProbeMessage};

use super::{BridgeError, ProbeBridge};

const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// Where the probe context reads player state from.
pub trait PlayerStateSource: Send + Sync {
    fn snapshot(&self) -> PlayerSnapshot;
}

/// A player whose state is set by hand.
///
/// Queued snapshots are answered first, one per request, which models a player
/// that still holds the previous video for a while after navigation. Once the
/// queue is empty the current snapshot is answered.
#[derive(Debug, Default)]
pub struct ScriptedPlayer {
    state: Mutex<ScriptState>,
}

#[derive(Debug, Default)]
struct ScriptState {
    queued: VecDeque<PlayerSnapshot>,
    current: PlayerSnapshot,
}

impl ScriptedPlayer {
    pub fn new(current: PlayerSnapshot) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                queued: VecDeque::new(),
                current,
            }),
        }
    }

    /// Replace what the player holds, dropping anything queued.
    pub fn load(&self, snapshot: PlayerSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.queued.clear();
        state.current = snapshot;
    }

    /// Queue a snapshot to answer before the current one.
    pub fn push(&self, snapshot: PlayerSnapshot) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queued
            .push_back(snapshot);
    }
}

impl PlayerStateSource for ScriptedPlayer {
    fn snapshot(&self) -> PlayerSnapshot {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.queued.pop_front() {
            Some(snapshot) => snapshot,
            None => state.current.clone(),
        }
    }
}

/// Resolver-side end of the probe channel. Replies travel as JSON text.
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    requests: mpsc::Sender<oneshot::Sender<String>>,
}

#[async_trait]
impl ProbeBridge for ChannelBridge {
    async fn query(&self) -> Result<LiveStatus, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(tx)
            .await
            .map_err(|_| BridgeError::Disconnected)?;
        let text = rx.await.map_err(|_| BridgeError::Disconnected)?;
        let message: ProbeMessage = serde_json::from_str(&text)?;
        Ok(message.into())
    }
}

/// Start a probe context answering from `source`. The task ends once every
/// bridge clone is dropped.
pub fn spawn_probe_context(source: Arc<dyn PlayerStateSource>) -> (ChannelBridge, JoinHandle<()>) {
    let (requests, mut rx) = mpsc::channel::<oneshot::Sender<String>>(REQUEST_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            let message = ProbeMessage::from(read_live_status(&source.snapshot()));
            match serde_json::to_string(&message) {
                Ok(json) => {
                    // The requester may have timed out already
                    let _ = reply.send(json);
                }
                Err(e) => log::warn!("failed to encode probe reply: {}", e),
            }
        }
    });
    (ChannelBridge { requests }, task)
}
