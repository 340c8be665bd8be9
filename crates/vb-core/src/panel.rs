//! Popup panel model
//!
//! What the popup shows for a tab: whether the page is supported, the
//! site-wide slider, the account slider when the page exposes an account, and
//! the boost currently applied in the tab.

use crate::boost::Boost;
use crate::settings::{MapKind, StoreSnapshot};
use crate::types::AccountKey;
use crate::url::{is_supported_address, site_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    /// The page cannot host an audio graph; all controls are disabled.
    Unsupported,
    /// No site-wide rule is saved for this host.
    NotSet,
    /// A site-wide rule is saved with this boost.
    Set(Boost),
}

/// One slider: the key it saves under and the value it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliderValue {
    pub key: String,
    pub boost: Boost,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub status: PanelStatus,
    pub site: Option<SliderValue>,
    pub account: Option<SliderValue>,
    /// Boost the tab reports as applied, if it answered.
    pub current: Option<Boost>,
}

impl PanelView {
    pub fn unsupported() -> Self {
        Self {
            status: PanelStatus::Unsupported,
            site: None,
            account: None,
            current: None,
        }
    }
}

/// Build the panel for a tab showing `address`.
pub fn build_panel(
    address: &str,
    account: Option<&AccountKey>,
    snapshot: &StoreSnapshot,
    current: Option<Boost>,
) -> PanelView {
    if !is_supported_address(address) {
        return PanelView::unsupported();
    }
    let Some(host) = site_key(address) else {
        return PanelView::unsupported();
    };

    let saved_site = snapshot.boost_for(MapKind::Rules, host);
    let site = SliderValue {
        key: host.to_string(),
        boost: saved_site.unwrap_or_default(),
        saved: saved_site.is_some(),
    };

    // The account slider starts from the site value until it has its own.
    let account = account.map(|key| {
        let key = key.to_string();
        let saved = snapshot.boost_for(MapKind::Accounts, &key);
        SliderValue {
            boost: saved.unwrap_or(site.boost),
            saved: saved.is_some(),
            key,
        }
    });

    PanelView {
        status: match saved_site {
            Some(boost) => PanelStatus::Set(boost),
            None => PanelStatus::NotSet,
        },
        site: Some(site),
        account,
        current,
    }
}
