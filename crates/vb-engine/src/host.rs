//! Host context
//!
//! Tracks the open tabs and routes messages to their resolvers. Each tab keeps
//! one resolver for its whole life: a full navigation resets its session, a
//! client-side navigation only updates the page.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;

use vb_core::url::is_prefix_match;
use vb_core::{Boost, Request, Response};

use crate::applier::GainStage;
use crate::probe::LiveProbe;
use crate::resolver::{BoostResolver, PageContext, PassOutcome};
use crate::store::RuleStore;

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

struct Tab {
    resolver: Arc<BoostResolver>,
    gain: Arc<GainStage>,
}

pub struct Host {
    store: Arc<dyn RuleStore>,
    probe: Option<Arc<LiveProbe>>,
    tabs: RwLock<BTreeMap<TabId, Tab>>,
    next_id: AtomicU32,
    events: broadcast::Sender<Request>,
}

impl Host {
    pub fn new(store: Arc<dyn RuleStore>, probe: Option<Arc<LiveProbe>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            probe,
            tabs: RwLock::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    async fn resolver(&self, tab: TabId) -> Option<Arc<BoostResolver>> {
        self.tabs.read().await.get(&tab).map(|t| t.resolver.clone())
    }

    /// Open a tab on `page` and run its first pass.
    pub async fn open_tab(&self, page: PageContext) -> (TabId, PassOutcome) {
        let id = TabId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let gain = Arc::new(GainStage::new());
        let resolver = Arc::new(BoostResolver::new(
            page,
            self.store.clone(),
            self.probe.clone(),
            gain.clone(),
        ));
        self.tabs.write().await.insert(
            id,
            Tab {
                resolver: resolver.clone(),
                gain,
            },
        );
        log::debug!("opened {}", id);
        (id, resolver.resolve().await)
    }

    /// Full navigation: the page reloads and its session starts over. Passes
    /// still running for the previous page are dropped.
    pub async fn navigate(&self, tab: TabId, page: PageContext) -> Option<PassOutcome> {
        let resolver = self.resolver(tab).await?;
        resolver.reset(page).await;
        Some(resolver.resolve().await)
    }

    /// Client-side navigation: update the page, keep the session, re-resolve.
    pub async fn url_changed(&self, tab: TabId, page: PageContext) -> Option<Response> {
        let resolver = self.resolver(tab).await?;
        resolver.set_page(page).await;
        Some(resolver.handle(Request::UrlChanged).await)
    }

    pub async fn close_tab(&self, tab: TabId) -> bool {
        let closed = self.tabs.write().await.remove(&tab).is_some();
        if closed {
            log::debug!("closed {}", tab);
        }
        closed
    }

    pub async fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.read().await.keys().copied().collect()
    }

    pub async fn page(&self, tab: TabId) -> Option<PageContext> {
        Some(self.resolver(tab).await?.page().await)
    }

    /// The tab's gain node.
    pub async fn gain(&self, tab: TabId) -> Option<Arc<GainStage>> {
        self.tabs.read().await.get(&tab).map(|t| t.gain.clone())
    }

    /// Deliver `request` to one tab. `None` when the tab is gone.
    pub async fn dispatch(&self, tab: TabId, request: Request) -> Option<Response> {
        let resolver = self.resolver(tab).await?;
        Some(resolver.handle(request).await)
    }

    /// Send `UPDATE_VOLUME` to every tab whose address `key` matches.
    /// Returns how many tabs were notified.
    pub async fn notify_matching_tabs(&self, key: &str, boost: Boost) -> usize {
        let resolvers: Vec<_> = self
            .tabs
            .read()
            .await
            .values()
            .map(|t| t.resolver.clone())
            .collect();

        let mut notified = 0;
        for resolver in resolvers {
            let address = resolver.page().await.normalized();
            if is_prefix_match(key, address.as_str()) {
                resolver.handle(Request::UpdateVolume { boost }).await;
                notified += 1;
            }
        }
        notified
    }

    /// Tell every context that configuration changed. Open tabs re-resolve
    /// concurrently; other listeners get the event on [`Host::subscribe`].
    pub async fn broadcast_settings_updated(&self) {
        // Nobody listening is fine
        let _ = self.events.send(Request::SettingsUpdated);

        let resolvers: Vec<_> = self
            .tabs
            .read()
            .await
            .values()
            .map(|t| t.resolver.clone())
            .collect();

        let mut passes = JoinSet::new();
        for resolver in resolvers {
            passes.spawn(async move { resolver.handle(Request::SettingsUpdated).await });
        }
        while let Some(result) = passes.join_next().await {
            if let Err(e) = result {
                log::warn!("settings refresh task failed: {}", e);
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Request> {
        self.events.subscribe()
    }
}
