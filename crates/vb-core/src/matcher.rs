//! Longest-prefix rule matching
//!
//! A rule key matches an address when it is a boundary-respecting prefix of
//! it (see [`is_prefix_match`]). Among all matching keys the longest one wins,
//! so `example.com/watch` beats `example.com` on a watch page.
//!
//! Ties between equal-length keys cannot happen for distinct keys (two keys
//! of the same length that both prefix one address are the same string), but
//! the tie-break is still fixed: the lexicographically smallest key wins.

use std::cmp::Ordering;

use crate::boost::Boost;
use crate::url::is_prefix_match;

/// A rule selected for an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub key: &'a str,
    pub boost: Boost,
}

/// Order two candidate keys: longer first, then lexicographically smaller.
#[inline]
fn specificity(a: &str, b: &str) -> Ordering {
    b.len().cmp(&a.len()).then_with(|| a.cmp(b))
}

/// Find the most specific rule covering `address`.
///
/// Works over any map iterator yielding `(key, boost)` pairs, e.g.
/// `BTreeMap<String, Boost>::iter()`.
pub fn find_best_match<'a, K, I>(address: &str, rules: I) -> Option<RuleMatch<'a>>
where
    K: AsRef<str> + ?Sized + 'a,
    I: IntoIterator<Item = (&'a K, &'a Boost)>,
{
    let mut best: Option<RuleMatch<'a>> = None;

    for (key, &boost) in rules {
        let key = key.as_ref();
        if !is_prefix_match(key, address) {
            continue;
        }
        let better = match &best {
            Some(current) => specificity(key, current.key) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some(RuleMatch { key, boost });
        }
    }

    best
}

// =============================================================================
// Matcher
// =============================================================================

/// Pre-sorted view over a rule map for repeated lookups.
///
/// Keys are ordered by specificity, so the first covering key is the answer
/// and the scan stops there.
pub struct Matcher<'a> {
    entries: Vec<(&'a str, Boost)>,
}

impl<'a> Matcher<'a> {
    /// Build a matcher over the given rules.
    pub fn new<K, I>(rules: I) -> Self
    where
        K: AsRef<str> + ?Sized + 'a,
        I: IntoIterator<Item = (&'a K, &'a Boost)>,
    {
        let mut entries: Vec<(&'a str, Boost)> = rules
            .into_iter()
            .map(|(key, &boost)| (key.as_ref(), boost))
            .collect();
        entries.sort_by(|a, b| specificity(a.0, b.0));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most specific rule covering `address`.
    pub fn best_match(&self, address: &str) -> Option<RuleMatch<'a>> {
        self.entries
            .iter()
            .find(|(key, _)| is_prefix_match(key, address))
            .map(|&(key, boost)| RuleMatch { key, boost })
    }

    /// Every rule covering `address`, most specific first.
    pub fn all_matches<'s>(&'s self, address: &'s str) -> impl Iterator<Item = RuleMatch<'a>> + 's {
        self.entries
            .iter()
            .filter(move |(key, _)| is_prefix_match(key, address))
            .map(|&(key, boost)| RuleMatch { key, boost })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;

    fn rules(entries: &[(&str, i64)]) -> BTreeMap<String, Boost> {
        entries
            .iter()
            .map(|&(k, v)| (k.to_string(), Boost::clamped(v)))
            .collect()
    }

    #[test]
    fn longest_prefix_wins() {
        let rules = rules(&[("example.com", 100), ("example.com/watch", 200)]);
        let found = find_best_match("example.com/watch?v=1", &rules).unwrap();
        assert_eq!(found.key, "example.com/watch");
        assert_eq!(found.boost.percent(), 200);

        let found = find_best_match("example.com/watchlist", &rules).unwrap();
        assert_eq!(found.key, "example.com");
    }

    #[test]
    fn boundary_rejects_lookalike_hosts() {
        let rules = rules(&[("example.com", 150)]);
        assert!(find_best_match("example.com", &rules).is_some());
        assert!(find_best_match("example.com?x=1", &rules).is_some());
        assert!(find_best_match("example.com2", &rules).is_none());
        assert!(find_best_match("notexample.com", &rules).is_none());
    }

    #[test]
    fn empty_rules_match_nothing() {
        let rules: BTreeMap<String, Boost> = BTreeMap::new();
        assert!(find_best_match("example.com", &rules).is_none());
        assert!(Matcher::new(&rules).best_match("example.com").is_none());
    }

    #[test]
    fn works_with_hash_maps() {
        let mut rules: HashMap<String, Boost> = HashMap::new();
        rules.insert("a.com".to_string(), Boost::clamped(120));
        rules.insert("a.com/b".to_string(), Boost::clamped(80));
        rules.insert("a.com/b/c".to_string(), Boost::clamped(60));
        let found = find_best_match("a.com/b/c/d", &rules).unwrap();
        assert_eq!(found.key, "a.com/b/c");
    }

    #[test]
    fn specificity_orders_longest_then_lexicographic() {
        assert_eq!(specificity("abc", "ab"), Ordering::Less);
        assert_eq!(specificity("abc", "abd"), Ordering::Less);
        assert_eq!(specificity("ab", "ab"), Ordering::Equal);
    }

    #[test]
    fn matcher_agrees_with_linear_scan() {
        let rules = rules(&[
            ("example.com", 110),
            ("example.com/watch", 200),
            ("example.com/watch/live", 50),
            ("video.example.com", 300),
            ("other.org", 90),
        ]);
        let matcher = Matcher::new(&rules);
        assert_eq!(matcher.len(), 5);

        let addresses = [
            "example.com",
            "example.com/watch",
            "example.com/watch/live?x",
            "example.com/watchers",
            "video.example.com/clip",
            "other.org#frag",
            "unmatched.net",
        ];
        for address in addresses {
            assert_eq!(
                matcher.best_match(address),
                find_best_match(address, &rules),
                "disagreement on {address}"
            );
        }

        let all: Vec<&str> = matcher
            .all_matches("example.com/watch/live")
            .map(|m| m.key)
            .collect();
        assert_eq!(all, vec!["example.com/watch/live", "example.com/watch", "example.com"]);
    }
}
