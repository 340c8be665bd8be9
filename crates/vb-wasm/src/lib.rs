//! WebAssembly bindings for Volume Booster

use wasm_bindgen::prelude::*;
use web_sys::console;

use vb_core::probe::{read_live_status, PlayerSnapshot};
use vb_core::resolve::live_override_target;
use vb_core::url::{is_supported_address, site_key, target_content_id};
use vb_core::{
    find_best_match, normalize, resolve, Boost, LiveOverrideSettings, LiveStatus, ProbeAttempts,
    ProbeMessage, ProbeVerdict, ResolutionCause, ResolutionInputs, RuleMap, SessionState,
};

fn set(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &key.into(), value);
}

/// Read a `{ key: boost }` object. Entries whose boost is not a number are
/// skipped with a console warning.
fn rules_from_js(rules: &JsValue) -> RuleMap {
    let mut map = RuleMap::new();
    if !rules.is_object() {
        return map;
    }
    let object = js_sys::Object::from(rules.clone());
    for entry in js_sys::Object::entries(&object).iter() {
        let pair = js_sys::Array::from(&entry);
        let Some(key) = pair.get(0).as_string() else {
            continue;
        };
        match pair.get(1).as_f64().and_then(Boost::from_f64) {
            Some(boost) => {
                map.insert(key, boost);
            }
            None => console::warn_1(&format!("ignoring rule {:?}: boost is not a number", key).into()),
        }
    }
    map
}

fn cause_name(cause: ResolutionCause) -> &'static str {
    match cause {
        ResolutionCause::LiveOverride => "liveOverride",
        ResolutionCause::SessionContinuity => "sessionContinuity",
        ResolutionCause::MatchedRule => "matchedRule",
        ResolutionCause::SessionCarryover => "sessionCarryover",
        ResolutionCause::Default => "default",
    }
}

fn status_to_js(status: &LiveStatus) -> js_sys::Object {
    let result = js_sys::Object::new();
    set(&result, "isLive", &JsValue::from(status.is_live));
    match &status.content_id {
        Some(id) => set(&result, "contentId", &JsValue::from_str(id)),
        None => set(&result, "contentId", &JsValue::NULL),
    }
    result
}

#[wasm_bindgen]
pub fn normalize_address(address: &str) -> String {
    normalize(address).into_string()
}

#[wasm_bindgen]
pub fn is_supported_page(address: &str) -> bool {
    is_supported_address(address)
}

#[wasm_bindgen]
pub fn site_key_js(address: &str) -> Option<String> {
    site_key(address).map(|h| h.to_string())
}

#[wasm_bindgen]
pub fn target_content_id_js(address: &str) -> Option<String> {
    target_content_id(normalize(address).as_str()).map(|id| id.to_string())
}

/// Clamp any number into a boost; `NaN` becomes 100.
#[wasm_bindgen]
pub fn clamp_boost(value: f64) -> u16 {
    Boost::from_f64(value).unwrap_or_default().percent()
}

/// Best rule for `address`: `{ key, boost }`, or `null` when nothing matches.
#[wasm_bindgen]
pub fn match_rules(address: &str, rules: JsValue) -> JsValue {
    let rules = rules_from_js(&rules);
    let address = normalize(address);
    match find_best_match(address.as_str(), &rules) {
        Some(found) => {
            let result = js_sys::Object::new();
            set(&result, "key", &JsValue::from_str(found.key));
            set(&result, "boost", &JsValue::from(found.boost.percent()));
            result.into()
        }
        None => JsValue::NULL,
    }
}

/// Boost the live override imposes, if it applies to this page.
#[wasm_bindgen]
pub fn live_override_boost(
    enabled: bool,
    target_volume: f64,
    is_live: bool,
    content_id: Option<String>,
    address: &str,
) -> Option<u16> {
    let settings = LiveOverrideSettings {
        enabled,
        target_volume: Boost::from_f64(target_volume)?,
    };
    let status = LiveStatus { is_live, content_id };
    let address = normalize(address);
    let target = target_content_id(address.as_str())?;
    live_override_target(&settings, &status, target).map(Boost::percent)
}

/// Probe context side: answer a probe from the player state, given as the
/// JSON shape `{ playerApi, initialResponse }`.
#[wasm_bindgen]
pub fn live_status_reply(player_state: &str) -> Result<String, JsValue> {
    let snapshot: PlayerSnapshot = serde_json::from_str(player_state)
        .map_err(|e| JsValue::from_str(&format!("Invalid player state: {}", e)))?;
    let message = ProbeMessage::from(read_live_status(&snapshot));
    serde_json::to_string(&message).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Session state of one tab, held by its content script.
#[wasm_bindgen]
pub struct TabResolver {
    session: SessionState,
}

impl Default for TabResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl TabResolver {
    #[wasm_bindgen(constructor)]
    pub fn new() -> TabResolver {
        TabResolver {
            session: SessionState::new(),
        }
    }

    /// Run one pass. `live_target` is the override boost when the probe
    /// qualified this page, `undefined` otherwise.
    pub fn resolve(&mut self, address: &str, rules: JsValue, live_target: Option<f64>) -> JsValue {
        let rules = rules_from_js(&rules);
        let address = normalize(address);
        let resolution = resolve(
            &mut self.session,
            ResolutionInputs {
                address: &address,
                rules: &rules,
                live_override: live_target.and_then(Boost::from_f64),
            },
        );

        let result = js_sys::Object::new();
        set(&result, "boost", &JsValue::from(resolution.boost.percent()));
        match &resolution.matched_key {
            Some(key) => set(&result, "matchedKey", &JsValue::from_str(key)),
            None => set(&result, "matchedKey", &JsValue::NULL),
        }
        set(&result, "cause", &JsValue::from_str(cause_name(resolution.cause)));
        result.into()
    }

    /// Record a boost the user applied directly.
    pub fn record_manual(&mut self, boost: f64) -> u16 {
        let boost = Boost::from_f64(boost).unwrap_or_default();
        self.session.record_manual(boost);
        boost.percent()
    }

    pub fn cached_boost(&self) -> Option<u16> {
        self.session.cached_boost().map(Boost::percent)
    }

    pub fn current_boost(&self) -> u16 {
        self.session.cached_boost().unwrap_or_default().percent()
    }

    pub fn live_override_active(&self) -> bool {
        self.session.live_override_active
    }
}

/// Tracks one probe run's replies for a target content id.
#[wasm_bindgen]
pub struct ProbeTracker {
    attempts: ProbeAttempts,
}

#[wasm_bindgen]
impl ProbeTracker {
    #[wasm_bindgen(constructor)]
    pub fn new(target: &str, max_attempts: u32) -> ProbeTracker {
        ProbeTracker {
            attempts: ProbeAttempts::new(target, max_attempts),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.attempts()
    }

    /// Feed one `LIVE_STATUS_RESULT` message. Returns `{ verdict, status }`,
    /// where `verdict` is `"accept"`, `"retry"` or `"exhausted"`.
    pub fn record(&mut self, reply: &str) -> Result<JsValue, JsValue> {
        let message: ProbeMessage = serde_json::from_str(reply).map_err(|e| {
            console::warn_1(&format!("malformed probe reply: {}", e).into());
            JsValue::from_str(&format!("Malformed probe reply: {}", e))
        })?;

        let result = js_sys::Object::new();
        let (verdict, status) = match self.attempts.record(message.into()) {
            ProbeVerdict::Accept(status) => ("accept", status),
            ProbeVerdict::Retry => ("retry", LiveStatus::not_live()),
            ProbeVerdict::Exhausted => ("exhausted", LiveStatus::not_live()),
        };
        set(&result, "verdict", &JsValue::from_str(verdict));
        set(&result, "status", &status_to_js(&status));
        Ok(result.into())
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use wasm_bindgen_test::*;

    use super::*;

    fn rules(entries: &[(&str, f64)]) -> JsValue {
        let object = js_sys::Object::new();
        for &(key, boost) in entries {
            set(&object, key, &JsValue::from(boost));
        }
        object.into()
    }

    fn field(value: &JsValue, key: &str) -> JsValue {
        js_sys::Reflect::get(value, &key.into()).unwrap()
    }

    #[wasm_bindgen_test]
    fn normalizes_and_extracts_ids() {
        assert_eq!(normalize_address("https://www.example.com/a"), "example.com/a");
        assert_eq!(
            target_content_id_js("https://www.youtube.com/watch?v=abc&t=3").as_deref(),
            Some("abc")
        );
        assert_eq!(site_key_js("https://www.youtube.com/watch").as_deref(), Some("youtube.com"));
        assert!(!is_supported_page("chrome://extensions"));
    }

    #[wasm_bindgen_test]
    fn clamps_numbers() {
        assert_eq!(clamp_boost(-5.0), 0);
        assert_eq!(clamp_boost(123.9), 123);
        assert_eq!(clamp_boost(9000.0), 600);
        assert_eq!(clamp_boost(f64::NAN), 100);
    }

    #[wasm_bindgen_test]
    fn matches_longest_rule() {
        let found = match_rules(
            "https://example.com/watch?v=1",
            rules(&[("example.com", 100.0), ("example.com/watch", 200.0)]),
        );
        assert_eq!(field(&found, "key").as_string().as_deref(), Some("example.com/watch"));
        assert_eq!(field(&found, "boost").as_f64(), Some(200.0));
        assert!(match_rules("https://example.com2/", rules(&[("example.com", 100.0)])).is_null());
    }

    #[wasm_bindgen_test]
    fn tab_resolver_keeps_session() {
        let mut tab = TabResolver::new();
        let table = rules(&[("youtube.com", 200.0)]);

        let first = tab.resolve("https://youtube.com/", table.clone(), None);
        assert_eq!(field(&first, "boost").as_f64(), Some(200.0));
        assert_eq!(field(&first, "cause").as_string().as_deref(), Some("matchedRule"));

        tab.record_manual(350.0);
        let second = tab.resolve("https://youtube.com/feed", table.clone(), None);
        assert_eq!(field(&second, "boost").as_f64(), Some(350.0));

        let live = tab.resolve("https://youtube.com/watch?v=X", table, Some(50.0));
        assert_eq!(field(&live, "cause").as_string().as_deref(), Some("liveOverride"));
        assert!(tab.live_override_active());
    }

    #[wasm_bindgen_test]
    fn live_override_requires_matching_content() {
        let page = "https://www.youtube.com/watch?v=X";
        assert_eq!(live_override_boost(true, 50.0, true, Some("X".into()), page), Some(50));
        assert_eq!(live_override_boost(true, 50.0, true, Some("Y".into()), page), None);
        assert_eq!(live_override_boost(false, 50.0, true, Some("X".into()), page), None);
    }

    #[wasm_bindgen_test]
    fn probe_tracker_retries_stale_replies() {
        let mut tracker = ProbeTracker::new("X", 2);
        let stale = tracker
            .record(r#"{"type":"LIVE_STATUS_RESULT","isLive":true,"contentId":"old"}"#)
            .unwrap();
        assert_eq!(field(&stale, "verdict").as_string().as_deref(), Some("retry"));

        let done = tracker
            .record(r#"{"type":"LIVE_STATUS_RESULT","isLive":true,"contentId":"old"}"#)
            .unwrap();
        assert_eq!(field(&done, "verdict").as_string().as_deref(), Some("exhausted"));
        assert!(tracker.record("not json").is_err());
    }

    #[wasm_bindgen_test]
    fn answers_probe_from_player_state() {
        let reply = live_status_reply(r#"{"playerApi":{"videoId":"abc","isLiveContent":true}}"#).unwrap();
        assert_eq!(reply, r#"{"type":"LIVE_STATUS_RESULT","isLive":true,"contentId":"abc"}"#);
    }
}
