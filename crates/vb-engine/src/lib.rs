//! Volume Booster Engine
//!
//! Async runtime around the `vb-core` resolution engine. Each execution
//! context of the extension is modelled as an independent component that
//! only talks to the others through messages:
//!
//! - `store`: durable settings snapshot, read and written whole
//! - `writer`: debounced persistence of slider edits
//! - `probe`: live-broadcast probe and the context that answers it
//! - `applier`: the gain stage a resolved boost is handed to
//! - `resolver`: one page context's resolution state machine
//! - `host`: open tabs, message dispatch and broadcasts
//! - `service`: settings edits from the options page and popup

pub mod applier;
pub mod config;
pub mod host;
pub mod probe;
pub mod resolver;
pub mod service;
pub mod store;
pub mod writer;

pub use applier::{ApplyError, AudioApplier, GainStage, GAIN_HISTORY_LIMIT};
pub use config::{ConfigError, EngineConfig, ProbeConfig, WriterConfig};
pub use host::{Host, TabId};
pub use probe::{
    spawn_probe_context, BridgeError, ChannelBridge, LiveProbe, PlayerStateSource, ProbeBridge,
    ScriptedPlayer,
};
pub use resolver::{BoostResolver, PageContext, PassOutcome, ResolverPhase};
pub use service::{ServiceError, SettingsService};
pub use store::{transact, JsonFileStore, MemoryStore, RuleStore, StoreError};
pub use writer::{PersistenceWriter, SavedEntry};
