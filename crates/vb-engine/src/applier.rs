//! Audio gain application
//!
//! The resolver only decides a boost; applying it to the page's audio graph is
//! behind [`AudioApplier`].

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use vb_core::Boost;

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("Audio graph is not connected")]
    Disconnected,
}

#[async_trait]
pub trait AudioApplier: Send + Sync {
    async fn apply(&self, boost: Boost) -> Result<(), ApplyError>;
}

/// Number of recent applies a [`GainStage`] remembers.
pub const GAIN_HISTORY_LIMIT: usize = 16;

/// In-process gain node: holds the boost in effect and the most recent
/// applies, oldest first.
#[derive(Debug)]
pub struct GainStage {
    state: Mutex<GainState>,
}

#[derive(Debug)]
struct GainState {
    connected: bool,
    current: Option<Boost>,
    recent: VecDeque<Boost>,
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new()
    }
}

impl GainStage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GainState {
                connected: true,
                current: None,
                recent: VecDeque::with_capacity(GAIN_HISTORY_LIMIT),
            }),
        }
    }

    /// Detach (or reattach) the audio graph; applies fail while detached.
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Boost currently in effect.
    pub fn current(&self) -> Option<Boost> {
        self.lock().current
    }

    /// Gain multiplier currently in effect; unity before anything was applied.
    pub fn gain(&self) -> f32 {
        self.current().unwrap_or_default().gain()
    }

    /// The last [`GAIN_HISTORY_LIMIT`] boosts applied, oldest first.
    pub fn history(&self) -> Vec<Boost> {
        self.lock().recent.iter().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AudioApplier for GainStage {
    async fn apply(&self, boost: Boost) -> Result<(), ApplyError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(ApplyError::Disconnected);
        }
        if state.recent.len() == GAIN_HISTORY_LIMIT {
            state.recent.pop_front();
        }
        state.recent.push_back(boost);
        state.current = Some(boost);
        log::debug!("gain set to {:.2} ({})", boost.gain(), boost);
        Ok(())
    }
}
