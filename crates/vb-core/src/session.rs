//! Per-tab session state
//!
//! Scratch memory owned by the resolver of one page context. It survives
//! client-side navigations inside the page and is dropped with the page; it is
//! never persisted.

use crate::boost::Boost;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Rule key that produced the boost on the previous pass.
    pub last_matched_key: Option<String>,
    /// Boost applied by the previous pass or by a manual adjustment.
    /// `None` until the first resolution after navigation.
    pub last_applied_boost: Option<Boost>,
    /// Whether `last_applied_boost` came from the live override.
    pub live_override_active: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cached_boost(&self) -> Option<Boost> {
        self.last_applied_boost
    }

    /// Record a live-override pass. The matched key is left alone so rule
    /// continuity resumes once the broadcast ends.
    pub fn enter_live_override(&mut self, target: Boost) {
        self.live_override_active = true;
        self.last_applied_boost = Some(target);
    }

    /// Drop a boost that only existed because of the live override.
    /// Returns whether anything was discarded.
    pub fn stand_down_live_override(&mut self) -> bool {
        if !self.live_override_active {
            return false;
        }
        self.live_override_active = false;
        self.last_applied_boost = None;
        true
    }

    /// Cached boost to replay for `key`, if the previous pass matched it.
    pub fn continuity_for(&self, key: &str) -> Option<Boost> {
        match &self.last_matched_key {
            Some(last) if last == key => self.last_applied_boost,
            _ => None,
        }
    }

    /// Record the outcome of a rule-matching pass.
    pub fn record(&mut self, matched_key: Option<&str>, boost: Boost) {
        match matched_key {
            Some(key) if self.last_matched_key.as_deref() != Some(key) => {
                self.last_matched_key = Some(key.to_string());
            }
            Some(_) => {}
            None => self.last_matched_key = None,
        }
        self.last_applied_boost = Some(boost);
    }

    /// Record a boost set directly by the user (slider, account value, or a
    /// rule edit pushed to the tab). It replaces any live-derived value.
    pub fn record_manual(&mut self, boost: Boost) {
        self.live_override_active = false;
        self.last_applied_boost = Some(boost);
    }
}
