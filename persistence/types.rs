/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Persisted navigation keys and their typed, validated view.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::model::taxonomy::{TaxonomyModel, TaxonomyPath};

pub const KEY_ACTIVE_PATH: &str = "nav.active_path";
pub const KEY_ACTIVE_KEY: &str = "nav.active_key";
pub const KEY_SIDEBAR_COLLAPSED: &str = "nav.sidebar_collapsed";
/// Temporary: branches left open during the current search. Mirrored while
/// the search runs and erased at startup; never read back across restarts.
pub const KEY_SEARCH_OPEN_BRANCHES: &str = "nav.search_open_branches";
/// Temporary: navigation state captured when a search started.
pub const KEY_PRE_SEARCH: &str = "nav.pre_search";

pub const ALL_KEYS: [&str; 5] = [
    KEY_ACTIVE_PATH,
    KEY_ACTIVE_KEY,
    KEY_SIDEBAR_COLLAPSED,
    KEY_SEARCH_OPEN_BRANCHES,
    KEY_PRE_SEARCH,
];

pub const SEARCH_KEYS: [&str; 2] = [KEY_SEARCH_OPEN_BRANCHES, KEY_PRE_SEARCH];

/// Navigation state captured on entering search, restored on leaving it.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreSearchSnapshot {
    pub current_branch: Option<String>,
    pub active_path: Option<TaxonomyPath>,
    pub open_branches: BTreeSet<String>,
}

impl PreSearchSnapshot {
    /// Drop anything the taxonomy no longer knows about.
    fn validated(mut self, taxonomy: &TaxonomyModel) -> Self {
        if let Some(path) = self.active_path.as_ref()
            && !taxonomy.contains(path)
        {
            warn!("Discarding stale pre-search path '{path}'");
            self.active_path = None;
        }
        if let Some(branch) = self.current_branch.as_deref()
            && !taxonomy.has_branch(branch)
        {
            warn!("Discarding stale pre-search branch '{branch}'");
            self.current_branch = None;
            self.active_path = None;
        }
        self.open_branches.retain(|branch| taxonomy.has_branch(branch));
        self
    }
}

/// Typed view over the raw key/value pairs. Every field is optional on load;
/// malformed or stale values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedNavState {
    pub active_path: Option<TaxonomyPath>,
    pub active_key: Option<String>,
    pub sidebar_collapsed: bool,
    pub pre_search: Option<PreSearchSnapshot>,
}

impl PersistedNavState {
    pub fn from_raw(raw: &BTreeMap<String, String>, taxonomy: &TaxonomyModel) -> Self {
        let active_path = raw
            .get(KEY_ACTIVE_PATH)
            .and_then(|value| parse_active_path(value, taxonomy));
        let active_key = active_path
            .as_ref()
            .and(raw.get(KEY_ACTIVE_KEY))
            .filter(|key| !key.trim().is_empty())
            .cloned();
        let sidebar_collapsed = raw
            .get(KEY_SIDEBAR_COLLAPSED)
            .map(|value| parse_flag(value))
            .unwrap_or(false);
        let pre_search = raw
            .get(KEY_PRE_SEARCH)
            .and_then(|value| parse_json::<PreSearchSnapshot>(KEY_PRE_SEARCH, value))
            .map(|snapshot| snapshot.validated(taxonomy));

        Self {
            active_path,
            active_key,
            sidebar_collapsed,
            pre_search,
        }
    }
}

fn parse_active_path(value: &str, taxonomy: &TaxonomyModel) -> Option<TaxonomyPath> {
    if value.trim().is_empty() {
        return None;
    }
    match TaxonomyPath::parse(value) {
        Ok(path) if taxonomy.contains(&path) => Some(path),
        Ok(path) => {
            warn!("Persisted active path '{path}' is no longer in the taxonomy; ignoring");
            None
        }
        Err(error) => {
            warn!("Persisted active path is malformed: {error}");
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    match value.trim() {
        "true" | "1" => true,
        "false" | "0" | "" => false,
        other => {
            warn!("Persisted flag '{other}' is not a boolean; treating as false");
            false
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Option<T> {
    match serde_json::from_str(value) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            warn!("Persisted value for '{key}' is malformed: {error}");
            None
        }
    }
}

pub fn encode_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> TaxonomyModel {
        TaxonomyModel::from_paths(["Phase1/GroupA", "Phase2/GroupX"]).expect("taxonomy")
    }

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn absent_keys_mean_no_prior_state() {
        let state = PersistedNavState::from_raw(&BTreeMap::new(), &taxonomy());
        assert_eq!(state, PersistedNavState::default());
    }

    #[test]
    fn valid_values_are_parsed() {
        let state = PersistedNavState::from_raw(
            &raw(&[
                (KEY_ACTIVE_PATH, "Phase1/GroupA"),
                (KEY_ACTIVE_KEY, "catalog/phase1/groupa"),
                (KEY_SIDEBAR_COLLAPSED, "true"),
                (KEY_SEARCH_OPEN_BRANCHES, r#"["Phase2","Gone"]"#),
                (
                    KEY_PRE_SEARCH,
                    r#"{"current_branch":"Phase1","active_path":"Phase1/GroupA","open_branches":["Phase1"]}"#,
                ),
            ]),
            &taxonomy(),
        );

        assert_eq!(state.active_path.as_ref().map(TaxonomyPath::as_str), Some("Phase1/GroupA"));
        assert_eq!(state.active_key.as_deref(), Some("catalog/phase1/groupa"));
        assert!(state.sidebar_collapsed);
        let snapshot = state.pre_search.expect("snapshot parsed");
        assert_eq!(snapshot.current_branch.as_deref(), Some("Phase1"));
    }

    #[test]
    fn malformed_and_stale_values_read_as_absent() {
        let state = PersistedNavState::from_raw(
            &raw(&[
                (KEY_ACTIVE_PATH, "Phase9/Removed"),
                (KEY_ACTIVE_KEY, "catalog/phase9/removed"),
                (KEY_SIDEBAR_COLLAPSED, "maybe"),
                (KEY_SEARCH_OPEN_BRANCHES, "not json"),
                (
                    KEY_PRE_SEARCH,
                    r#"{"current_branch":"Phase9","active_path":"Phase9/Removed","open_branches":[]}"#,
                ),
            ]),
            &taxonomy(),
        );

        assert_eq!(state.active_path, None);
        assert_eq!(state.active_key, None);
        assert!(!state.sidebar_collapsed);
        assert_eq!(state.pre_search, Some(PreSearchSnapshot::default()));
    }

    #[test]
    fn malformed_path_string_is_ignored() {
        let state =
            PersistedNavState::from_raw(&raw(&[(KEY_ACTIVE_PATH, "Phase1//GroupA")]), &taxonomy());
        assert_eq!(state.active_path, None);
    }
}
