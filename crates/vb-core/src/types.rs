//! Shared type definitions
//!
//! These types are stored in the settings snapshot or exchanged between
//! execution contexts, so all of them round-trip through JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::boost::Boost;
use crate::edit::EditError;

// =============================================================================
// Live Status
// =============================================================================

/// Answer of one live probe poll for the content loaded in the page's player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LiveStatus {
    pub is_live: bool,
    /// Content item the player actually has loaded right now.
    pub content_id: Option<String>,
}

impl LiveStatus {
    /// The answer used whenever the probe cannot give an authoritative one.
    pub fn not_live() -> Self {
        Self::default()
    }

    pub fn live(content_id: impl Into<String>) -> Self {
        Self {
            is_live: true,
            content_id: Some(content_id.into()),
        }
    }

    /// Whether this answer is about the `target` content item.
    #[inline]
    pub fn is_for(&self, target: &str) -> bool {
        self.content_id.as_deref() == Some(target)
    }
}

// =============================================================================
// Live Override Settings
// =============================================================================

pub const DEFAULT_LIVE_TARGET: u16 = 50;

/// User configuration for lowering the volume on live broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct LiveOverrideSettings {
    pub enabled: bool,
    #[ts(type = "number")]
    pub target_volume: Boost,
}

impl Default for LiveOverrideSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            target_volume: Boost::clamped(DEFAULT_LIVE_TARGET as i64),
        }
    }
}

// =============================================================================
// Preferences
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Language {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ja => Self::En,
            Self::En => Self::Ja,
        }
    }
}

// =============================================================================
// Account Keys
// =============================================================================

/// Account identity exposed by a page, e.g. a creator channel.
/// Stored as `"<platform>:<accountName>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountKey {
    platform: String,
    name: String,
}

impl AccountKey {
    pub fn new(platform: &str, name: &str) -> Result<Self, EditError> {
        let platform = platform.trim();
        let name = name.trim();
        if platform.is_empty() || name.is_empty() || platform.contains(':') {
            return Err(EditError::InvalidAccountKey(format!("{platform}:{name}")));
        }
        Ok(Self {
            platform: platform.to_string(),
            name: name.to_string(),
        })
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.name)
    }
}

impl FromStr for AccountKey {
    type Err = EditError;

    /// Split at the first `:`; account names may themselves contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((platform, name)) => Self::new(platform, name),
            None => Err(EditError::InvalidAccountKey(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_status_wire_shape() {
        let status = LiveStatus::live("abc");
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"isLive":true,"contentId":"abc"}"#);
        assert!(status.is_for("abc"));
        assert!(!status.is_for("xyz"));
        assert!(!LiveStatus::not_live().is_for("abc"));
    }

    #[test]
    fn live_override_defaults_fill_missing_fields() {
        let settings: LiveOverrideSettings = serde_json::from_str(r#"{"enabled":true}"#).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.target_volume.percent(), DEFAULT_LIVE_TARGET);

        let settings: LiveOverrideSettings =
            serde_json::from_str(r#"{"enabled":false,"targetVolume":900}"#).unwrap();
        assert_eq!(settings.target_volume, Boost::MAX);
    }

    #[test]
    fn preferences_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Language::Ja.toggled(), Language::En);
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), r#""dark""#);
        assert_eq!(serde_json::to_string(&Language::En).unwrap(), r#""en""#);
    }

    #[test]
    fn account_key_parsing() {
        let key: AccountKey = "youtube:@some:channel".parse().unwrap();
        assert_eq!(key.platform(), "youtube");
        assert_eq!(key.name(), "@some:channel");
        assert_eq!(key.to_string(), "youtube:@some:channel");

        assert!("youtube".parse::<AccountKey>().is_err());
        assert!(":name".parse::<AccountKey>().is_err());
        assert!("youtube: ".parse::<AccountKey>().is_err());
    }
}
