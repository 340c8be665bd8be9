//! Volume Booster Core Library
//!
//! This crate provides the boost resolution engine: given a page address, the
//! saved rules and the per-tab session state, it decides which gain multiplier
//! applies to the page. Everything here is synchronous and side-effect free;
//! the async runtime (stores, probe bridge, debounced writes) lives in
//! `vb-engine` and the browser bindings in `vb-wasm`.
//!
//! # Modules
//!
//! - `boost`: clamped boost percentages
//! - `url`: address normalization, boundary checks and content id extraction
//! - `matcher`: longest-prefix rule matching
//! - `types`: live status, account keys, preferences
//! - `settings`: the durable store snapshot
//! - `session`: per-tab session state
//! - `resolve`: the resolution state machine step
//! - `probe`: live probe retry policy and player-state inspection
//! - `messages`: cross-context wire messages
//! - `edit`: validation at the rule edit boundary
//! - `panel`: the popup panel model

pub mod boost;
pub mod edit;
pub mod matcher;
pub mod messages;
pub mod panel;
pub mod probe;
pub mod resolve;
pub mod session;
pub mod settings;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use boost::Boost;
pub use edit::{EditError, EditScope};
pub use matcher::{find_best_match, Matcher, RuleMatch};
pub use messages::{AckStatus, ProbeMessage, Request, Response};
pub use probe::{ProbeAttempts, ProbeVerdict};
pub use resolve::{resolve, Resolution, ResolutionCause, ResolutionInputs};
pub use session::SessionState;
pub use settings::{MapKind, RuleMap, StoreSnapshot};
pub use types::{AccountKey, Language, LiveOverrideSettings, LiveStatus, Theme};
pub use url::{normalize, NormalizedAddress};
