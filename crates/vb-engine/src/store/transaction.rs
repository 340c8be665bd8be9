use vb_core::StoreSnapshot;

use super::{RuleStore, StoreError};

/// Run one read-modify-write cycle: load the snapshot, let `mutate` edit it,
/// write the whole snapshot back and return what `mutate` returned.
///
/// Not atomic against other writers; the later save wins. Every snapshot
/// mutation in the engine goes through here, so a compare-and-swap store
/// only has to change this function.
pub async fn transact<S, F, T>(store: &S, mutate: F) -> Result<T, StoreError>
where
    S: RuleStore + ?Sized,
    F: FnOnce(&mut StoreSnapshot) -> T + Send,
    T: Send,
{
    let mut snapshot = store.load().await?;
    let output = mutate(&mut snapshot);
    store.save(&snapshot).await?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use vb_core::{Boost, MapKind};

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn mutation_is_written_back() {
        let store = MemoryStore::new();
        let previous = transact(&store, |snapshot| {
            snapshot
                .map_mut(MapKind::Rules)
                .insert("example.com".into(), Boost::clamped(150))
        })
        .await
        .unwrap();
        assert_eq!(previous, None);

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.boost_for(MapKind::Rules, "example.com"), Some(Boost::clamped(150)));
    }

    #[tokio::test]
    async fn failed_load_writes_nothing() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let result = transact(&store, |snapshot| {
            snapshot.rule_settings.insert("a.com".into(), Boost::MAX);
        })
        .await;
        assert!(matches!(result, Err(StoreError::Unavailable)));

        store.set_unavailable(false);
        assert!(store.load().await.unwrap().rule_settings.is_empty());
        assert_eq!(store.save_count(), 0);
    }
}
