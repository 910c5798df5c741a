/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Category path -> catalog entry resolution.
//!
//! The taxonomy and the entry registry are indexed by different producers, so
//! keys may disagree on separators, letter case or a leading root name.
//! Resolution tries an exact normalized match first, then the longest
//! segment-suffix match, and finally returns an empty scope under a
//! synthesized key. A miss is a valid "no entries" outcome.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::taxonomy::TaxonomyPath;
use crate::shell::desktop::runtime::events::ScopeChanged;

pub const SCOPE_KEY_ALL: &str = "all";
const KEY_SEPARATORS: &[char] = &['/', '>', '\\', '|'];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    /// Category key as written by the registry producer.
    pub category_key: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, category_key: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(id),
            category_key: category_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeResolution {
    pub requested_key: String,
    pub resolved_key: String,
    pub matched: bool,
    pub fallback_used: bool,
    pub entry_ids: BTreeSet<EntryId>,
}

impl ScopeResolution {
    pub fn entry_count(&self) -> usize {
        self.entry_ids.len()
    }
}

/// Lowercased, trimmed segments joined with `/`.
pub fn normalize_key(raw: &str) -> String {
    raw.split(KEY_SEPARATORS)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("/")
}

fn key_segments(key: &str) -> Vec<&str> {
    if key.is_empty() {
        Vec::new()
    } else {
        key.split('/').collect()
    }
}

fn is_within_key(key: &str, prefix: &str) -> bool {
    key == prefix
        || (key.starts_with(prefix) && key.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Length of the common trailing run when one key is a segment-suffix of the
/// other, else zero.
fn suffix_overlap(a: &[&str], b: &[&str]) -> usize {
    let shorter = a.len().min(b.len());
    if shorter == 0 {
        return 0;
    }
    if a[a.len() - shorter..] == b[b.len() - shorter..] {
        shorter
    } else {
        0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    /// Normalized category key -> entries registered directly under it.
    by_key: BTreeMap<String, BTreeSet<EntryId>>,
    /// Every registered key plus all of its ancestors.
    known_keys: BTreeSet<String>,
    all: BTreeSet<EntryId>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(entry);
        }
        registry
    }

    pub fn register(&mut self, entry: CatalogEntry) {
        let key = normalize_key(&entry.category_key);
        let segments = key_segments(&key);
        for depth in 1..=segments.len() {
            self.known_keys.insert(segments[..depth].join("/"));
        }
        self.all.insert(entry.id.clone());
        self.by_key.entry(key).or_default().insert(entry.id);
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Unfiltered view: every registered entry.
    pub fn resolve_all(&self) -> ScopeResolution {
        ScopeResolution {
            requested_key: SCOPE_KEY_ALL.to_string(),
            resolved_key: SCOPE_KEY_ALL.to_string(),
            matched: true,
            fallback_used: false,
            entry_ids: self.all.clone(),
        }
    }

    pub fn resolve_path(&self, path: &TaxonomyPath) -> ScopeResolution {
        self.resolve(path.as_str())
    }

    pub fn resolve(&self, requested: &str) -> ScopeResolution {
        let normalized = normalize_key(requested);
        if normalized.is_empty() {
            return self.resolve_all();
        }

        if self.known_keys.contains(&normalized) {
            return ScopeResolution {
                requested_key: requested.to_string(),
                entry_ids: self.entries_within(&normalized),
                resolved_key: normalized,
                matched: true,
                fallback_used: false,
            };
        }

        if let Some(resolved) = self.longest_suffix_match(&normalized) {
            return ScopeResolution {
                requested_key: requested.to_string(),
                entry_ids: self.entries_within(&resolved),
                resolved_key: resolved,
                matched: true,
                fallback_used: true,
            };
        }

        ScopeResolution {
            requested_key: requested.to_string(),
            resolved_key: normalized,
            matched: false,
            fallback_used: true,
            entry_ids: BTreeSet::new(),
        }
    }

    fn longest_suffix_match(&self, normalized: &str) -> Option<String> {
        let wanted = key_segments(normalized);
        self.known_keys
            .iter()
            .filter_map(|candidate| {
                let overlap = suffix_overlap(&wanted, &key_segments(candidate));
                (overlap > 0).then_some((overlap, candidate))
            })
            .max_by(|(overlap_a, key_a), (overlap_b, key_b)| {
                overlap_a
                    .cmp(overlap_b)
                    .then_with(|| key_segments(key_b).len().cmp(&key_segments(key_a).len()))
                    .then_with(|| key_b.cmp(key_a))
            })
            .map(|(_, key)| key.clone())
    }

    fn entries_within(&self, key: &str) -> BTreeSet<EntryId> {
        self.by_key
            .range(key.to_string()..)
            .take_while(|(candidate, _)| candidate.starts_with(key))
            .filter(|(candidate, _)| is_within_key(candidate, key))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }
}

/// Consumer-side dedup for scope notifications: identical repeats are no-ops.
#[derive(Debug, Clone, Default)]
pub struct ScopeWatcher {
    last: Option<(String, BTreeSet<EntryId>)>,
}

impl ScopeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the notification changes what is in view.
    pub fn observe(&mut self, event: &ScopeChanged) -> bool {
        let incoming = (event.resolved_key.clone(), event.entry_ids.clone());
        if self.last.as_ref() == Some(&incoming) {
            return false;
        }
        self.last = Some(incoming);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::desktop::runtime::events::ScopeSource;
    use rstest::rstest;

    fn registry() -> CatalogRegistry {
        CatalogRegistry::from_entries([
            CatalogEntry::new("nmap", "Catalog > Phase2 > GroupX"),
            CatalogEntry::new("masscan", "Catalog > Phase2 > GroupX"),
            CatalogEntry::new("whois", "catalog/phase1/groupa"),
            CatalogEntry::new("dig", "catalog/phase1/groupa/dns"),
            CatalogEntry::new("burp", "Catalog/Phase1/GroupB"),
        ])
    }

    fn ids(raw: &[&str]) -> BTreeSet<EntryId> {
        raw.iter().map(|id| EntryId::new(*id)).collect()
    }

    #[rstest]
    #[case(" a > B\\c ", "a/b/c")]
    #[case("A|B/", "a/b")]
    #[case("", "")]
    fn keys_normalize_across_separators(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_key(raw), expected);
    }

    #[test]
    fn exact_match_includes_descendant_entries() {
        let resolution = registry().resolve("Catalog/Phase1/GroupA");

        assert!(resolution.matched);
        assert!(!resolution.fallback_used);
        assert_eq!(resolution.resolved_key, "catalog/phase1/groupa");
        assert_eq!(resolution.entry_ids, ids(&["dig", "whois"]));
    }

    #[test]
    fn missing_root_name_resolves_by_suffix() {
        let resolution = registry().resolve("Phase2/GroupX");

        assert!(resolution.matched);
        assert!(resolution.fallback_used);
        assert_eq!(resolution.resolved_key, "catalog/phase2/groupx");
        assert_eq!(resolution.entry_ids, ids(&["masscan", "nmap"]));
    }

    #[test]
    fn extra_root_name_on_request_resolves_by_suffix() {
        let resolution = registry().resolve("Root/Catalog/Phase1");

        assert_eq!(resolution.resolved_key, "catalog/phase1");
        assert_eq!(resolution.entry_ids, ids(&["burp", "dig", "whois"]));
    }

    #[test]
    fn sibling_with_shared_leaf_name_does_not_match() {
        let resolution = registry().resolve("Phase9/GroupA/Other");

        assert!(!resolution.matched);
        assert!(resolution.entry_ids.is_empty());
    }

    #[test]
    fn unknown_path_yields_empty_scope_with_synthesized_key() {
        let resolution = registry().resolve("UnknownPhase/Nope");

        assert!(!resolution.matched);
        assert!(resolution.fallback_used);
        assert_eq!(resolution.resolved_key, "unknownphase/nope");
        assert!(resolution.entry_ids.is_empty());
    }

    #[test]
    fn empty_request_is_the_unfiltered_view() {
        let resolution = registry().resolve("  ");
        assert_eq!(resolution.resolved_key, SCOPE_KEY_ALL);
        assert_eq!(resolution.entry_count(), 5);
    }

    #[test]
    fn watcher_treats_identical_notifications_as_idempotent() {
        let mut watcher = ScopeWatcher::new();
        let event = ScopeChanged {
            resolved_key: "catalog/phase1".to_string(),
            entry_ids: ids(&["whois"]),
            source: ScopeSource::UserNavigation,
        };
        let restored = ScopeChanged {
            source: ScopeSource::Restoration,
            ..event.clone()
        };

        assert!(watcher.observe(&event));
        assert!(!watcher.observe(&event));
        assert!(!watcher.observe(&restored));
        assert!(watcher.observe(&ScopeChanged {
            entry_ids: BTreeSet::new(),
            ..event
        }));
    }
}
