use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use vb_core::StoreSnapshot;

use super::{RuleStore, StoreError};

/// In-process store. Can be switched to fail every call, to exercise the
/// store-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: RwLock<StoreSnapshot>,
    unavailable: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            ..Self::default()
        }
    }

    /// Make every subsequent load and save fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn load(&self) -> Result<StoreSnapshot, StoreError> {
        self.check()?;
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        self.check()?;
        *self.snapshot.write().await = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vb_core::{Boost, Theme};

    use super::*;

    #[tokio::test]
    async fn save_replaces_whole_snapshot() {
        let mut initial = StoreSnapshot::default();
        initial.rule_settings.insert("a.com".into(), Boost::clamped(120));
        let store = MemoryStore::with_snapshot(initial);

        let mut next = StoreSnapshot::default();
        next.theme = Theme::Dark;
        store.save(&next).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded.rule_settings.is_empty());
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn clear_resets_to_defaults() {
        let mut initial = StoreSnapshot::default();
        initial.rule_settings.insert("a.com".into(), Boost::clamped(120));
        let store = MemoryStore::with_snapshot(initial);
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), StoreSnapshot::default());
    }

    #[tokio::test]
    async fn unavailable_store_rejects_calls() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.load().await, Err(StoreError::Unavailable)));
        assert!(matches!(
            store.save(&StoreSnapshot::default()).await,
            Err(StoreError::Unavailable)
        ));
    }
}
