//! Durable settings snapshot
//!
//! The store holds one JSON document with two rule maps plus scalar
//! preferences. It is always read and written whole: callers load a
//! snapshot, mutate it and write the full snapshot back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::boost::Boost;
use crate::types::{Language, LiveOverrideSettings, Theme};

/// Rule key → boost. Ordered so listings and iteration are deterministic.
pub type RuleMap = BTreeMap<String, Boost>;

/// Which of the two rule maps an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    /// Normalized-address prefix rules (`ruleSettings`).
    Rules,
    /// `platform:accountName` rules (`accountSettings`).
    Accounts,
}

/// Full contents of the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSnapshot {
    pub rule_settings: RuleMap,
    pub account_settings: RuleMap,
    pub theme: Theme,
    pub language: Language,
    pub live_override_settings: LiveOverrideSettings,
}

impl StoreSnapshot {
    pub fn map(&self, kind: MapKind) -> &RuleMap {
        match kind {
            MapKind::Rules => &self.rule_settings,
            MapKind::Accounts => &self.account_settings,
        }
    }

    pub fn map_mut(&mut self, kind: MapKind) -> &mut RuleMap {
        match kind {
            MapKind::Rules => &mut self.rule_settings,
            MapKind::Accounts => &mut self.account_settings,
        }
    }

    pub fn boost_for(&self, kind: MapKind, key: &str) -> Option<Boost> {
        self.map(kind).get(key).copied()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
