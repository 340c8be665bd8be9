//! Tab resolver
//!
//! Owns one page context's [`SessionState`] and runs resolution passes:
//! gather inputs (store snapshot, live probe), step the session, hand the
//! result to the audio applier. Passes start on navigation and on settings
//! changes and may overlap; each pass takes a generation number and a pass
//! that is no longer the newest when its inputs arrive is dropped without
//! touching the session or the gain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use vb_core::resolve::live_override_target;
use vb_core::url::{is_live_capable, is_supported_address, target_content_id};
use vb_core::{
    normalize, resolve, AccountKey, Boost, NormalizedAddress, Request, Resolution,
    ResolutionInputs, Response, SessionState, StoreSnapshot,
};

use crate::applier::{ApplyError, AudioApplier};
use crate::probe::LiveProbe;
use crate::store::RuleStore;

/// What the page is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Full address as the page reports it.
    pub address: String,
    /// Account the page belongs to, when it exposes one.
    pub account: Option<AccountKey>,
}

impl PageContext {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            account: None,
        }
    }

    pub fn with_account(mut self, account: AccountKey) -> Self {
        self.account = Some(account);
        self
    }

    pub fn normalized(&self) -> NormalizedAddress {
        normalize(&self.address)
    }

    /// Only http(s) pages can host an audio graph.
    pub fn is_supported(&self) -> bool {
        is_supported_address(&self.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverPhase {
    Idle,
    Resolving,
    Applied,
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Applied(Resolution),
    /// The page cannot host audio; nothing was done.
    Unsupported,
    /// A newer pass, a manual adjustment or a reload started while this one
    /// waited.
    Superseded,
    /// Store or audio failure; previous state kept.
    Abandoned,
}

impl PassOutcome {
    pub fn boost(&self) -> Option<Boost> {
        match self {
            Self::Applied(resolution) => Some(resolution.boost),
            _ => None,
        }
    }
}

struct TabState {
    page: PageContext,
    session: SessionState,
    phase: ResolverPhase,
}

impl TabState {
    fn settle(&mut self) {
        self.phase = if self.session.cached_boost().is_some() {
            ResolverPhase::Applied
        } else {
            ResolverPhase::Idle
        };
    }
}

pub struct BoostResolver {
    store: Arc<dyn RuleStore>,
    probe: Option<Arc<LiveProbe>>,
    applier: Arc<dyn AudioApplier>,
    state: Mutex<TabState>,
    generation: AtomicU64,
}

impl BoostResolver {
    /// A resolver for a freshly loaded page, with an empty session.
    pub fn new(
        page: PageContext,
        store: Arc<dyn RuleStore>,
        probe: Option<Arc<LiveProbe>>,
        applier: Arc<dyn AudioApplier>,
    ) -> Self {
        if !page.is_supported() {
            log::debug!("resolver disabled for unsupported page {}", page.address);
        }
        Self {
            store,
            probe,
            applier,
            state: Mutex::new(TabState {
                page,
                session: SessionState::new(),
                phase: ResolverPhase::Idle,
            }),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn page(&self) -> PageContext {
        self.state.lock().await.page.clone()
    }

    pub async fn phase(&self) -> ResolverPhase {
        self.state.lock().await.phase
    }

    pub async fn session(&self) -> SessionState {
        self.state.lock().await.session.clone()
    }

    /// Boost this tab reports as applied.
    pub async fn current_boost(&self) -> Boost {
        self.state.lock().await.session.cached_boost().unwrap_or_default()
    }

    /// Client-side navigation: the page changed but the session survives.
    pub async fn set_page(&self, page: PageContext) {
        self.state.lock().await.page = page;
    }

    /// Full navigation: the page reloaded, so the session starts over. Passes
    /// still running for the previous page are superseded.
    pub async fn reset(&self, page: PageContext) {
        self.begin();
        let mut state = self.state.lock().await;
        if !page.is_supported() {
            log::debug!("resolver disabled for unsupported page {}", page.address);
        }
        state.page = page;
        state.session = SessionState::new();
        state.phase = ResolverPhase::Idle;
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Run one resolution pass.
    pub async fn resolve(&self) -> PassOutcome {
        let generation = self.begin();

        let page = {
            let mut state = self.state.lock().await;
            if !state.page.is_supported() {
                // May have overtaken a pass that left the phase at Resolving
                if self.is_current(generation) {
                    state.settle();
                }
                return PassOutcome::Unsupported;
            }
            state.phase = ResolverPhase::Resolving;
            state.page.clone()
        };
        let address = page.normalized();

        let snapshot = match self.store.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let mut state = self.state.lock().await;
                if !self.is_current(generation) {
                    log::debug!("resolution #{} for {} superseded: {}", generation, address, e);
                    return PassOutcome::Superseded;
                }
                log::warn!("resolution for {} abandoned: {}", address, e);
                state.settle();
                return PassOutcome::Abandoned;
            }
        };
        let live_override = self.live_override(&snapshot, &address).await;

        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            log::debug!("resolution #{} for {} superseded", generation, address);
            return PassOutcome::Superseded;
        }

        let mut session = state.session.clone();
        let resolution = resolve(
            &mut session,
            ResolutionInputs {
                address: &address,
                rules: &snapshot.rule_settings,
                live_override,
            },
        );

        match self.applier.apply(resolution.boost).await {
            Ok(()) => {
                log::debug!(
                    "applied {} to {} ({:?}, key {:?})",
                    resolution.boost,
                    address,
                    resolution.cause,
                    resolution.matched_key
                );
                state.session = session;
                state.phase = ResolverPhase::Applied;
                PassOutcome::Applied(resolution)
            }
            Err(e) => {
                log::warn!("failed to apply {} to {}: {}", resolution.boost, address, e);
                state.settle();
                PassOutcome::Abandoned
            }
        }
    }

    async fn live_override(
        &self,
        snapshot: &StoreSnapshot,
        address: &NormalizedAddress,
    ) -> Option<Boost> {
        let settings = &snapshot.live_override_settings;
        if !settings.enabled || !is_live_capable(address.as_str()) {
            return None;
        }
        let probe = self.probe.as_ref()?;
        let target = target_content_id(address.as_str())?;
        let status = probe.probe(target).await;
        live_override_target(settings, &status, target)
    }

    /// Apply a boost chosen by the user. Cancels any pass in flight.
    pub async fn apply_manual(&self, boost: Boost) -> Result<(), ApplyError> {
        self.begin();
        let mut state = self.state.lock().await;
        self.applier.apply(boost).await?;
        state.session.record_manual(boost);
        state.phase = ResolverPhase::Applied;
        Ok(())
    }

    /// Answer a message addressed to this page context.
    pub async fn handle(&self, request: Request) -> Response {
        if !self.state.lock().await.page.is_supported() {
            return Response::unsupported();
        }
        match request {
            Request::UpdateVolume { boost } => {
                if let Err(e) = self.apply_manual(boost).await {
                    log::warn!("failed to apply manual boost {}: {}", boost, e);
                }
                Response::ok()
            }
            Request::GetCurrentVolume => {
                let state = self.state.lock().await;
                Response::CurrentVolume {
                    boost: state.session.cached_boost().unwrap_or_default(),
                    account_name: state.page.account.as_ref().map(|a| a.name().to_string()),
                }
            }
            Request::UrlChanged | Request::SettingsUpdated => {
                self.resolve().await;
                Response::ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use vb_core::probe::{PlayerSnapshot, VideoDetails};
    use vb_core::{LiveOverrideSettings, ResolutionCause};

    use std::sync::atomic::AtomicBool;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::applier::GainStage;
    use crate::config::ProbeConfig;
    use crate::probe::{spawn_probe_context, ScriptedPlayer};
    use crate::store::{MemoryStore, StoreError};

    fn playing(id: &str, live: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            player_api: Some(VideoDetails {
                video_id: Some(id.to_string()),
                is_live_content: live,
            }),
            initial_response: None,
        }
    }

    fn store_with(rules: &[(&str, i64)], live_target: Option<i64>) -> Arc<MemoryStore> {
        let mut snapshot = StoreSnapshot::default();
        for &(key, boost) in rules {
            snapshot.rule_settings.insert(key.to_string(), Boost::clamped(boost));
        }
        if let Some(target) = live_target {
            snapshot.live_override_settings = LiveOverrideSettings {
                enabled: true,
                target_volume: Boost::clamped(target),
            };
        }
        Arc::new(MemoryStore::with_snapshot(snapshot))
    }

    struct Fixture {
        resolver: BoostResolver,
        store: Arc<MemoryStore>,
        gain: Arc<GainStage>,
        player: Arc<ScriptedPlayer>,
    }

    fn fixture(address: &str, store: Arc<MemoryStore>) -> Fixture {
        let player = Arc::new(ScriptedPlayer::default());
        let (bridge, _task) = spawn_probe_context(player.clone());
        let probe = Arc::new(LiveProbe::new(Arc::new(bridge), ProbeConfig::default()));
        let gain = Arc::new(GainStage::new());
        let resolver = BoostResolver::new(
            PageContext::new(address),
            store.clone(),
            Some(probe),
            gain.clone(),
        );
        Fixture {
            resolver,
            store,
            gain,
            player,
        }
    }

    #[tokio::test]
    async fn applies_longest_matching_rule() {
        let f = fixture(
            "https://www.example.com/watch?v=1",
            store_with(&[("example.com", 100), ("example.com/watch", 200)], None),
        );
        let outcome = f.resolver.resolve().await;
        assert_eq!(outcome.boost(), Some(Boost::clamped(200)));
        assert_eq!(f.gain.current(), Some(Boost::clamped(200)));
        assert_eq!(f.resolver.phase().await, ResolverPhase::Applied);
        assert_eq!(
            f.resolver.session().await.last_matched_key.as_deref(),
            Some("example.com/watch")
        );
    }

    #[tokio::test]
    async fn no_rule_applies_default() {
        let f = fixture("https://quiet.org/", store_with(&[("example.com", 300)], None));
        assert_eq!(f.resolver.resolve().await.boost(), Some(Boost::DEFAULT));
    }

    #[tokio::test]
    async fn unsupported_page_does_nothing() {
        let f = fixture("chrome://settings", store_with(&[], None));
        assert_eq!(f.resolver.resolve().await, PassOutcome::Unsupported);
        assert_eq!(
            f.resolver.handle(Request::UpdateVolume { boost: Boost::MAX }).await,
            Response::unsupported()
        );
        assert_eq!(f.resolver.handle(Request::GetCurrentVolume).await, Response::unsupported());
        assert!(f.gain.history().is_empty());
        assert_eq!(f.resolver.phase().await, ResolverPhase::Idle);
    }

    #[tokio::test]
    async fn manual_adjustment_survives_navigation_within_the_rule() {
        let f = fixture("https://youtube.com/", store_with(&[("youtube.com", 200)], None));
        f.resolver.resolve().await;

        let reply = f.resolver.handle(Request::UpdateVolume { boost: Boost::clamped(320) }).await;
        assert_eq!(reply, Response::ok());

        f.resolver.set_page(PageContext::new("https://youtube.com/feed")).await;
        f.resolver.handle(Request::UrlChanged).await;
        assert_eq!(f.gain.current(), Some(Boost::clamped(320)));

        let reply = f.resolver.handle(Request::GetCurrentVolume).await;
        assert_eq!(
            reply,
            Response::CurrentVolume {
                boost: Boost::clamped(320),
                account_name: None
            }
        );
    }

    #[tokio::test]
    async fn current_volume_reports_account() {
        let store = store_with(&[], None);
        let gain = Arc::new(GainStage::new());
        let page = PageContext::new("https://youtube.com/@loud")
            .with_account(AccountKey::new("youtube", "@loud").unwrap());
        let resolver = BoostResolver::new(page, store, None, gain);
        resolver.resolve().await;
        assert_eq!(
            resolver.handle(Request::GetCurrentVolume).await,
            Response::CurrentVolume {
                boost: Boost::DEFAULT,
                account_name: Some("@loud".into())
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn live_override_wins_then_stands_down() {
        let f = fixture(
            "https://www.youtube.com/watch?v=X",
            store_with(&[("youtube.com", 200)], Some(50)),
        );
        f.player.load(playing("X", true));

        let outcome = f.resolver.resolve().await;
        match &outcome {
            PassOutcome::Applied(r) => {
                assert_eq!(r.boost, Boost::clamped(50));
                assert_eq!(r.cause, ResolutionCause::LiveOverride);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(f.resolver.session().await.live_override_active);

        f.player.load(playing("Y", false));
        f.resolver.set_page(PageContext::new("https://www.youtube.com/watch?v=Y")).await;
        let outcome = f.resolver.resolve().await;
        assert_eq!(outcome.boost(), Some(Boost::clamped(200)));

        let session = f.resolver.session().await;
        assert!(!session.live_override_active);
        assert_eq!(session.last_applied_boost, Some(Boost::clamped(200)));
        assert_eq!(f.gain.history(), vec![Boost::clamped(50), Boost::clamped(200)]);
    }

    #[tokio::test(start_paused = true)]
    async fn live_override_ignores_other_content() {
        let f = fixture(
            "https://youtube.com/watch?v=X",
            store_with(&[("youtube.com", 200)], Some(50)),
        );
        // Player still on the previous, live video for every attempt
        f.player.load(playing("previous", true));
        assert_eq!(f.resolver.resolve().await.boost(), Some(Boost::clamped(200)));
    }

    #[tokio::test]
    async fn store_failure_keeps_previous_state() {
        let f = fixture("https://example.com/", store_with(&[("example.com", 150)], None));
        f.resolver.resolve().await;
        let before = f.resolver.session().await;

        f.store.set_unavailable(true);
        assert_eq!(f.resolver.resolve().await, PassOutcome::Abandoned);
        assert_eq!(f.resolver.session().await, before);
        assert_eq!(f.resolver.phase().await, ResolverPhase::Applied);
        assert_eq!(f.gain.history(), vec![Boost::clamped(150)]);
    }

    #[tokio::test]
    async fn apply_failure_leaves_session_untouched() {
        let f = fixture("https://example.com/", store_with(&[("example.com", 150)], None));
        f.gain.set_connected(false);
        assert_eq!(f.resolver.resolve().await, PassOutcome::Abandoned);
        assert_eq!(f.resolver.session().await, SessionState::new());
        assert_eq!(f.resolver.phase().await, ResolverPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn older_pass_is_superseded() {
        let f = fixture(
            "https://youtube.com/watch?v=X",
            store_with(&[("example.com", 150)], Some(50)),
        );
        // First answer is stale, so the live pass has to wait for a retry
        f.player.load(playing("X", true));
        f.player.push(playing("previous", false));

        let slow = f.resolver.resolve();
        let fast = async {
            f.resolver.set_page(PageContext::new("https://example.com/")).await;
            f.resolver.resolve().await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow, PassOutcome::Superseded);
        assert_eq!(fast.boost(), Some(Boost::clamped(150)));
        assert_eq!(f.gain.history(), vec![Boost::clamped(150)]);
        assert!(!f.resolver.session().await.live_override_active);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_update_supersedes_pass_in_flight() {
        let f = fixture(
            "https://youtube.com/watch?v=X",
            store_with(&[], Some(50)),
        );
        f.player.load(playing("X", true));
        f.player.push(playing("previous", false));

        let pass = f.resolver.resolve();
        let manual = f.resolver.apply_manual(Boost::clamped(400));
        let (pass, manual) = tokio::join!(pass, manual);

        assert_eq!(pass, PassOutcome::Superseded);
        assert!(manual.is_ok());
        assert_eq!(f.gain.history(), vec![Boost::clamped(400)]);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_supersedes_pass_for_previous_page() {
        let f = fixture(
            "https://youtube.com/watch?v=X",
            store_with(&[("example.com", 150)], Some(50)),
        );
        f.player.load(playing("X", true));
        f.player.push(playing("previous", false));

        let stale = f.resolver.resolve();
        let reload = async {
            f.resolver.reset(PageContext::new("https://example.com/")).await;
            f.resolver.resolve().await
        };
        let (stale, reload) = tokio::join!(stale, reload);

        assert_eq!(stale, PassOutcome::Superseded);
        assert_eq!(reload.boost(), Some(Boost::clamped(150)));
        assert_eq!(f.gain.history(), vec![Boost::clamped(150)]);
        assert_eq!(f.resolver.current_boost().await, Boost::clamped(150));
    }

    #[tokio::test]
    async fn reset_starts_a_fresh_session() {
        let f = fixture("https://example.com/", store_with(&[], None));
        f.resolver.resolve().await;
        f.resolver.apply_manual(Boost::clamped(90)).await.unwrap();

        f.resolver.reset(PageContext::new("https://example.com/b")).await;
        assert_eq!(f.resolver.session().await, SessionState::new());
        assert_eq!(f.resolver.phase().await, ResolverPhase::Idle);
        assert_eq!(f.resolver.page().await.address, "https://example.com/b");
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_pass_settles_overtaken_phase() {
        let f = fixture("https://youtube.com/watch?v=X", store_with(&[], Some(50)));
        f.player.load(playing("X", true));
        f.player.push(playing("previous", false));

        let slow = f.resolver.resolve();
        let fast = async {
            f.resolver.set_page(PageContext::new("chrome://settings")).await;
            f.resolver.resolve().await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow, PassOutcome::Superseded);
        assert_eq!(fast, PassOutcome::Unsupported);
        assert_eq!(f.resolver.phase().await, ResolverPhase::Idle);
        assert!(f.gain.history().is_empty());
    }

    /// Fails its first load once released; later loads succeed.
    struct GatedStore {
        inner: MemoryStore,
        gate: Notify,
        failed_once: AtomicBool,
    }

    #[async_trait]
    impl RuleStore for GatedStore {
        async fn load(&self) -> Result<StoreSnapshot, StoreError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                self.gate.notified().await;
                return Err(StoreError::Unavailable);
            }
            self.inner.load().await
        }

        async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
            self.inner.save(snapshot).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_store_failure_leaves_newer_pass_running() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.live_override_settings = LiveOverrideSettings {
            enabled: true,
            target_volume: Boost::clamped(50),
        };
        let store = Arc::new(GatedStore {
            inner: MemoryStore::with_snapshot(snapshot),
            gate: Notify::new(),
            failed_once: AtomicBool::new(false),
        });
        let player = Arc::new(ScriptedPlayer::default());
        let (bridge, _task) = spawn_probe_context(player.clone());
        let probe = Arc::new(LiveProbe::new(Arc::new(bridge), ProbeConfig::default()));
        let gain = Arc::new(GainStage::new());
        let resolver = BoostResolver::new(
            PageContext::new("https://youtube.com/watch?v=X"),
            store.clone(),
            Some(probe),
            gain.clone(),
        );
        player.load(playing("X", true));
        player.push(playing("previous", false));

        let failing = resolver.resolve();
        let newer = resolver.resolve();
        let observed = async {
            store.gate.notify_one();
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            resolver.phase().await
        };
        let (failing, newer, observed) = tokio::join!(failing, newer, observed);

        assert_eq!(failing, PassOutcome::Superseded);
        assert_eq!(observed, ResolverPhase::Resolving);
        assert_eq!(newer.boost(), Some(Boost::clamped(50)));
        assert_eq!(resolver.phase().await, ResolverPhase::Applied);
        assert_eq!(gain.history(), vec![Boost::clamped(50)]);
    }
}
