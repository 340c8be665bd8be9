//! Settings service
//!
//! The edit surfaces. Options-page edits are written at once and pushed to the
//! tabs they affect; popup slider adjustments go to the tab immediately and
//! reach the store through the debounced writer.

use std::sync::Arc;

use vb_core::edit::{parse_boost_input, validate_rule_key, RuleEdit};
use vb_core::panel::{build_panel, PanelView};
use vb_core::url::{clean_rule_key, site_key};
use vb_core::{
    AccountKey, Boost, EditError, EditScope, Language, LiveOverrideSettings, MapKind, Request,
    Response, StoreSnapshot, Theme,
};

use crate::host::{Host, TabId};
use crate::store::{transact, RuleStore, StoreError};
use crate::writer::PersistenceWriter;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No open tab {0}")]
    UnknownTab(TabId),
    #[error("{0} does not expose an account")]
    NoAccount(TabId),
    #[error("{0} is not a supported page")]
    Unsupported(TabId),
}

pub struct SettingsService {
    host: Arc<Host>,
    writer: PersistenceWriter,
}

impl SettingsService {
    pub fn new(host: Arc<Host>, writer: PersistenceWriter) -> Self {
        Self { host, writer }
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn writer(&self) -> &PersistenceWriter {
        &self.writer
    }

    pub async fn list(&self) -> Result<StoreSnapshot, ServiceError> {
        Ok(self.host.store().load().await?)
    }

    async fn edit<F, T>(&self, mutate: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut StoreSnapshot) -> T + Send,
        T: Send,
    {
        Ok(transact(self.host.store().as_ref(), mutate).await?)
    }

    // =========================================================================
    // Site Rules
    // =========================================================================

    /// Save a rule and push its boost to the tabs it matches. Returns the
    /// cleaned key it was saved under.
    pub async fn set_rule(&self, raw_key: &str, boost: Boost) -> Result<String, ServiceError> {
        let edit = RuleEdit::new(raw_key, boost)?;
        self.edit(|snapshot| {
            snapshot.rule_settings.insert(edit.key.clone(), edit.boost);
        })
        .await?;

        self.host.notify_matching_tabs(&edit.key, edit.boost).await;
        self.host.broadcast_settings_updated().await;
        Ok(edit.key)
    }

    /// Delete a rule; matching tabs fall back to 100. Returns whether the rule
    /// existed.
    pub async fn remove_rule(&self, key: &str) -> Result<bool, ServiceError> {
        let key = clean_rule_key(key).to_string();
        let removed = self
            .edit(|snapshot| snapshot.rule_settings.remove(&key).is_some())
            .await?;

        if removed {
            self.host.notify_matching_tabs(&key, Boost::DEFAULT).await;
        }
        self.host.broadcast_settings_updated().await;
        Ok(removed)
    }

    /// Move a rule to a new key, overwriting whatever was saved there.
    /// An empty or unchanged new key, or a missing old key, changes nothing.
    pub async fn rename_rule(&self, old_key: &str, new_raw_key: &str) -> Result<bool, ServiceError> {
        let old_key = clean_rule_key(old_key).to_string();
        let new_key = clean_rule_key(new_raw_key).to_string();
        if new_key.is_empty() || new_key == old_key {
            return Ok(false);
        }

        let moved = self
            .edit(|snapshot| {
                let boost = snapshot.rule_settings.remove(&old_key)?;
                snapshot.rule_settings.insert(new_key.clone(), boost);
                Some(boost)
            })
            .await?;

        let Some(boost) = moved else {
            return Ok(false);
        };
        self.host.notify_matching_tabs(&old_key, Boost::DEFAULT).await;
        self.host.notify_matching_tabs(&new_key, boost).await;
        self.host.broadcast_settings_updated().await;
        Ok(true)
    }

    // =========================================================================
    // Account Rules
    // =========================================================================

    pub async fn set_account_rule(
        &self,
        account: &AccountKey,
        boost: Boost,
    ) -> Result<(), ServiceError> {
        let key = account.to_string();
        self.edit(|snapshot| {
            snapshot.account_settings.insert(key, boost);
        })
        .await?;
        self.host.broadcast_settings_updated().await;
        Ok(())
    }

    pub async fn remove_account_rule(&self, account: &AccountKey) -> Result<bool, ServiceError> {
        let key = account.to_string();
        let removed = self
            .edit(|snapshot| snapshot.account_settings.remove(&key).is_some())
            .await?;
        self.host.broadcast_settings_updated().await;
        Ok(removed)
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub async fn set_live_override(
        &self,
        enabled: bool,
        target: Option<Boost>,
    ) -> Result<LiveOverrideSettings, ServiceError> {
        let settings = self
            .edit(|snapshot| {
                let settings = &mut snapshot.live_override_settings;
                settings.enabled = enabled;
                if let Some(target) = target {
                    settings.target_volume = target;
                }
                *settings
            })
            .await?;
        self.host.broadcast_settings_updated().await;
        Ok(settings)
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<(), ServiceError> {
        self.edit(|snapshot| snapshot.theme = theme).await?;
        self.host.broadcast_settings_updated().await;
        Ok(())
    }

    pub async fn set_language(&self, language: Language) -> Result<(), ServiceError> {
        self.edit(|snapshot| snapshot.language = language).await?;
        self.host.broadcast_settings_updated().await;
        Ok(())
    }

    /// Switch between light and dark; returns the theme now saved.
    pub async fn toggle_theme(&self) -> Result<Theme, ServiceError> {
        let theme = self
            .edit(|snapshot| {
                snapshot.theme = snapshot.theme.toggled();
                snapshot.theme
            })
            .await?;
        self.host.broadcast_settings_updated().await;
        Ok(theme)
    }

    /// Switch the display language; returns the language now saved.
    pub async fn toggle_language(&self) -> Result<Language, ServiceError> {
        let language = self
            .edit(|snapshot| {
                snapshot.language = snapshot.language.toggled();
                snapshot.language
            })
            .await?;
        self.host.broadcast_settings_updated().await;
        Ok(language)
    }

    /// Forget everything, preferences included.
    pub async fn reset_all(&self) -> Result<(), ServiceError> {
        self.host.store().clear().await?;
        log::debug!("settings reset");
        self.host.broadcast_settings_updated().await;
        Ok(())
    }

    // =========================================================================
    // Popup
    // =========================================================================

    /// Apply a slider value to a tab now and, for the persisting scopes,
    /// schedule it to be saved.
    pub async fn adjust(
        &self,
        tab: TabId,
        scope: EditScope,
        raw_value: &str,
    ) -> Result<Boost, ServiceError> {
        let boost = parse_boost_input(raw_value)?;
        let page = self
            .host
            .page(tab)
            .await
            .ok_or(ServiceError::UnknownTab(tab))?;

        let target = match scope {
            EditScope::CurrentTab => None,
            EditScope::Site => {
                let key = site_key(&page.address)
                    .filter(|_| page.is_supported())
                    .ok_or(ServiceError::Unsupported(tab))?;
                Some((MapKind::Rules, validate_rule_key(key)?))
            }
            EditScope::Account => {
                let account = page.account.as_ref().ok_or(ServiceError::NoAccount(tab))?;
                Some((MapKind::Accounts, account.to_string()))
            }
        };

        if self
            .host
            .dispatch(tab, Request::UpdateVolume { boost })
            .await
            .is_none()
        {
            return Err(ServiceError::UnknownTab(tab));
        }

        if let Some((kind, key)) = target {
            self.writer.schedule_save(kind, key, boost);
        }
        Ok(boost)
    }

    /// The popup panel for a tab.
    pub async fn panel(&self, tab: TabId) -> Result<PanelView, ServiceError> {
        let page = self
            .host
            .page(tab)
            .await
            .ok_or(ServiceError::UnknownTab(tab))?;
        if !page.is_supported() {
            return Ok(PanelView::unsupported());
        }

        let current = match self.host.dispatch(tab, Request::GetCurrentVolume).await {
            Some(Response::CurrentVolume { boost, .. }) => Some(boost),
            _ => None,
        };
        let snapshot = self.list().await?;
        Ok(build_panel(&page.address, page.account.as_ref(), &snapshot, current))
    }
}
