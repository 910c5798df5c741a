/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Fixtures shared by unit tests and the `scenarios` integration binary.

use crate::app::NavigatorApp;
use crate::config::NavigatorConfig;
use crate::model::taxonomy::{TaxonomyModel, TaxonomyPath};
use crate::registries::atomic::scope::{CatalogEntry, CatalogRegistry, EntryId};
use crate::shell::desktop::ui::search_context::SearchContext;

/// Two-level catalog with three phases, small enough to reason about by hand.
pub const SAMPLE_TAXONOMY_TOML: &str = r#"
[Phase1]
GroupA = ["Sub1", "Sub2"]
GroupB = []

[Phase2]
GroupX = []
GroupY = ["Deep"]

[Phase3]
GroupZ = []
"#;

pub const SAMPLE_ENTRIES: &[(&str, &str)] = &[
    ("whois", "Phase1/GroupA/Sub1"),
    ("dig", "Phase1/GroupA/Sub2"),
    ("theharvester", "Phase1/GroupB"),
    ("nmap", "Phase2/GroupX"),
    ("masscan", "Phase2/GroupX"),
    ("nikto", "Phase2/GroupY/Deep"),
    ("sqlmap", "Phase3/GroupZ"),
];

pub fn path(raw: &str) -> TaxonomyPath {
    match TaxonomyPath::parse(raw) {
        Ok(path) => path,
        Err(error) => panic!("invalid fixture path '{raw}': {error}"),
    }
}

pub fn sample_taxonomy() -> TaxonomyModel {
    match TaxonomyModel::from_toml_str(SAMPLE_TAXONOMY_TOML) {
        Ok(taxonomy) => taxonomy,
        Err(error) => panic!("sample taxonomy must parse: {error}"),
    }
}

pub fn sample_registry() -> CatalogRegistry {
    CatalogRegistry::from_entries(
        SAMPLE_ENTRIES
            .iter()
            .map(|(id, key)| CatalogEntry::new(*id, *key)),
    )
}

pub fn sample_config() -> NavigatorConfig {
    let mut config = NavigatorConfig::default();
    config
        .phase_colors
        .insert("Phase1".to_string(), "#3b82f6".to_string());
    config
        .phase_colors
        .insert("Phase2".to_string(), "#ef4444".to_string());
    config
}

pub fn sample_app() -> NavigatorApp {
    NavigatorApp::new(sample_taxonomy(), sample_registry(), sample_config())
}

/// Search result for `query` built from the sample entries whose id contains
/// it, the way an external matcher would report them.
pub fn sample_search(query: &str) -> SearchContext {
    let needle = query.trim().to_lowercase();
    SearchContext::from_matches(
        query,
        SAMPLE_ENTRIES
            .iter()
            .filter(|(id, _)| !needle.is_empty() && id.contains(needle.as_str()))
            .map(|(id, key)| (EntryId::new(*id), path(key))),
    )
}
