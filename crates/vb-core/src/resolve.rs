//! Boost resolution
//!
//! One call to [`resolve`] is one resolution pass: it takes the inputs the
//! runtime gathered (address, rules, probe verdict), consults and updates the
//! tab's [`SessionState`], and returns the single effective boost.
//!
//! Priority, highest first:
//!
//! 1. Live override: the page's own content is live and the override is on.
//! 2. Live stand-down: the previous pass was a live override and this one is
//!    not, so the live-derived cached boost is discarded.
//! 3. Matched rule: replay the cached boost when the same rule matched last
//!    time, otherwise apply the rule's stored value.
//! 4. No match: replay the cached boost if any, otherwise 100.

use crate::boost::Boost;
use crate::matcher::find_best_match;
use crate::session::SessionState;
use crate::settings::RuleMap;
use crate::types::{LiveOverrideSettings, LiveStatus};
use crate::url::NormalizedAddress;

/// Why a pass produced its boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionCause {
    /// Live broadcast detected with the override enabled.
    LiveOverride,
    /// Same rule as last pass; the in-page adjustment was kept.
    SessionContinuity,
    /// Stored value of the matched rule.
    MatchedRule,
    /// No rule matched; the boost cached in this tab was kept.
    SessionCarryover,
    /// No rule matched and nothing was cached.
    Default,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub boost: Boost,
    pub matched_key: Option<String>,
    pub cause: ResolutionCause,
}

/// Inputs gathered for one pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionInputs<'a> {
    pub address: &'a NormalizedAddress,
    pub rules: &'a RuleMap,
    /// Target boost when the live override qualifies for this page.
    pub live_override: Option<Boost>,
}

/// Decide whether the live override applies: it must be enabled and the probe
/// must report a live broadcast for the page's own content item.
pub fn live_override_target(
    settings: &LiveOverrideSettings,
    status: &LiveStatus,
    target_content_id: &str,
) -> Option<Boost> {
    if settings.enabled && status.is_live && status.is_for(target_content_id) {
        Some(settings.target_volume)
    } else {
        None
    }
}

/// Run one resolution pass against the tab's session.
pub fn resolve(session: &mut SessionState, inputs: ResolutionInputs<'_>) -> Resolution {
    if let Some(target) = inputs.live_override {
        session.enter_live_override(target);
        return Resolution {
            boost: target,
            matched_key: session.last_matched_key.clone(),
            cause: ResolutionCause::LiveOverride,
        };
    }

    if session.stand_down_live_override() {
        log::debug!("live override ended for {}, discarding cached boost", inputs.address);
    }

    let (boost, matched_key, cause) =
        match find_best_match(inputs.address.as_str(), inputs.rules) {
            Some(found) => match session.continuity_for(found.key) {
                Some(cached) => (cached, Some(found.key), ResolutionCause::SessionContinuity),
                None => (found.boost, Some(found.key), ResolutionCause::MatchedRule),
            },
            None => match session.cached_boost() {
                Some(cached) => (cached, None, ResolutionCause::SessionCarryover),
                None => (Boost::DEFAULT, None, ResolutionCause::Default),
            },
        };

    session.record(matched_key, boost);

    Resolution {
        boost,
        matched_key: matched_key.map(str::to_string),
        cause,
    }
}
