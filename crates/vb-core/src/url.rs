//! Address utilities for rule matching
//!
//! These functions work directly on string slices; only `normalize` allocates,
//! to produce an owned `NormalizedAddress`.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Normalization
// =============================================================================

const SCHEMES: [&str; 2] = ["https://", "http://"];
const WWW: &str = "www.";

/// A page address with its scheme and leading `www.` label removed.
///
/// This is the key space rules are written in: `https://www.example.com/watch`
/// and `example.com/watch` normalize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedAddress(String);

impl NormalizedAddress {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a page address into rule key space.
pub fn normalize(address: &str) -> NormalizedAddress {
    NormalizedAddress(normalize_str(address).to_string())
}

/// Borrowing form of [`normalize`].
///
/// Prefixes are stripped to a fixed point so that normalizing twice is a
/// no-op even for degenerate inputs like `https://www.www.example.com`.
#[inline]
pub fn normalize_str(address: &str) -> &str {
    let mut current = address;
    loop {
        let next = strip_www(strip_scheme(current));
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// Strip a leading `http://` or `https://`.
#[inline]
pub fn strip_scheme(address: &str) -> &str {
    SCHEMES
        .iter()
        .find_map(|scheme| address.strip_prefix(scheme))
        .unwrap_or(address)
}

/// Strip a leading `www.` label.
#[inline]
pub fn strip_www(address: &str) -> &str {
    address.strip_prefix(WWW).unwrap_or(address)
}

/// Whether the page can host an audio graph: only http(s) pages qualify.
#[inline]
pub fn is_supported_address(address: &str) -> bool {
    SCHEMES.iter().any(|scheme| address.starts_with(scheme))
}

/// Clean a rule key typed by the user: surrounding whitespace, scheme and
/// `www.` are removed.
#[inline]
pub fn clean_rule_key(input: &str) -> &str {
    normalize_str(input.trim())
}

// =============================================================================
// Boundary Check
// =============================================================================

/// Characters that may follow a rule key inside a longer address.
pub const BOUNDARY_CHARS: [u8; 3] = [b'/', b'?', b'#'];

#[inline]
pub fn is_boundary_char(c: u8) -> bool {
    BOUNDARY_CHARS.contains(&c)
}

/// Check whether `key` covers `address`: the address starts with the key and
/// either ends there or continues with a path, query or fragment.
///
/// `example.com` covers `example.com/watch` but not `example.com2`.
#[inline]
pub fn is_prefix_match(key: &str, address: &str) -> bool {
    if !address.starts_with(key) {
        return false;
    }
    match address.as_bytes().get(key.len()) {
        None => true,
        Some(&c) => is_boundary_char(c),
    }
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the start and end positions of the hostname in a full address.
#[inline]
pub fn get_host_position(address: &str) -> Option<(usize, usize)> {
    let rest = strip_scheme(address);
    if rest.len() == address.len() {
        return None;
    }
    let scheme_end = address.len() - rest.len();
    let bytes = address.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' || b == b'?' || b == b'#' {
            break;
        }
    }

    // Find host end
    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Hostname of a full address without a leading `www.`; this is the key the
/// popup saves site-wide adjustments under.
#[inline]
pub fn site_key(address: &str) -> Option<&str> {
    let (start, end) = get_host_position(address)?;
    let host = strip_www(&address[start..end]);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

// =============================================================================
// Content Identifiers
// =============================================================================

/// Hosts whose embedded player can carry a live broadcast.
pub const LIVE_CAPABLE_HOSTS: [&str; 2] = ["youtube.com", "m.youtube.com"];

const WATCH_PATH: &str = "/watch";
const LIVE_PATH: &str = "/live/";
const CONTENT_ID_PARAM: &str = "v";

/// Split a normalized address into host and the remainder (path, query and
/// fragment, possibly empty).
#[inline]
fn split_host(normalized: &str) -> (&str, &str) {
    match normalized.bytes().position(|b| is_boundary_char(b) || b == b':') {
        Some(pos) => {
            let host = &normalized[..pos];
            let rest = &normalized[pos..];
            // Drop a port so `youtube.com:443/watch` still qualifies
            match rest.strip_prefix(':') {
                Some(after_port) => {
                    let skip = after_port
                        .bytes()
                        .position(is_boundary_char)
                        .unwrap_or(after_port.len());
                    (host, &after_port[skip..])
                }
                None => (host, rest),
            }
        }
        None => (normalized, ""),
    }
}

/// Whether the normalized address belongs to a live-capable player page.
pub fn is_live_capable(normalized: &str) -> bool {
    let (host, _) = split_host(normalized);
    LIVE_CAPABLE_HOSTS
        .iter()
        .any(|h| host.eq_ignore_ascii_case(h))
}

/// Derive the content item a live-capable page is supposed to be showing.
///
/// Watch pages carry it in the `v` query parameter; live pages in the path
/// segment after `/live/`. Returns `None` for any other page.
pub fn target_content_id(normalized: &str) -> Option<&str> {
    if !is_live_capable(normalized) {
        return None;
    }
    let (_, rest) = split_host(normalized);

    let path_end = rest
        .bytes()
        .position(|b| b == b'?' || b == b'#')
        .unwrap_or(rest.len());
    let path = &rest[..path_end];

    if let Some(segment) = path.strip_prefix(LIVE_PATH) {
        let id = segment.split('/').next().unwrap_or("");
        return if id.is_empty() { None } else { Some(id) };
    }

    if path == WATCH_PATH || path == "/watch/" {
        return query_param(rest, CONTENT_ID_PARAM).filter(|id| !id.is_empty());
    }

    None
}

/// Look up a query parameter in an address (or address fragment).
/// Returns the raw, undecoded value of the first occurrence.
pub fn query_param<'a>(address: &'a str, name: &str) -> Option<&'a str> {
    let q_pos = address.find('?')?;
    let query = &address[q_pos + 1..];
    let query = match query.find('#') {
        Some(hash_pos) => &query[..hash_pos],
        None => query,
    };

    for pair in query.split('&') {
        let (key, value) = match pair.find('=') {
            Some(eq_pos) => (&pair[..eq_pos], &pair[eq_pos + 1..]),
            None => (pair, ""),
        };
        if key == name {
            return Some(value);
        }
    }
    None
}
