/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Output of the external query matcher, as consumed from `search:context`.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::model::taxonomy::{TaxonomyModel, TaxonomyPath};
use crate::registries::atomic::scope::EntryId;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SearchContext {
    #[serde(default)]
    pub query: String,
    pub has_query: bool,
    #[serde(default)]
    pub matched_paths_by_branch: BTreeMap<String, BTreeSet<TaxonomyPath>>,
    #[serde(default)]
    pub counts_by_branch: BTreeMap<String, usize>,
    #[serde(default)]
    pub matched_entry_ids: BTreeSet<EntryId>,
}

impl SearchContext {
    /// Build a context from `(entry, category path)` matches. Counts are per
    /// matched entry, so two entries under one path count twice.
    pub fn from_matches<I>(query: &str, matches: I) -> Self
    where
        I: IntoIterator<Item = (EntryId, TaxonomyPath)>,
    {
        let mut context = Self {
            query: query.to_string(),
            has_query: !query.trim().is_empty(),
            ..Self::default()
        };
        for (entry, path) in matches {
            let branch = path.branch().to_string();
            *context.counts_by_branch.entry(branch.clone()).or_default() += 1;
            context
                .matched_paths_by_branch
                .entry(branch)
                .or_default()
                .insert(path);
            context.matched_entry_ids.insert(entry);
        }
        context
    }

    pub fn cleared() -> Self {
        Self::default()
    }

    /// Drop matched paths the taxonomy does not know, and branch keys that
    /// disagree with the paths filed under them.
    pub fn sanitized(mut self, taxonomy: &TaxonomyModel) -> Self {
        for (branch, paths) in self.matched_paths_by_branch.iter_mut() {
            paths.retain(|path| {
                let known = taxonomy.contains(path) && path.branch() == branch;
                if !known {
                    warn!("Ignoring search match on unknown path '{path}'");
                }
                known
            });
        }
        self.matched_paths_by_branch
            .retain(|branch, paths| taxonomy.has_branch(branch) && !paths.is_empty());
        self.counts_by_branch
            .retain(|branch, count| taxonomy.has_branch(branch) && *count > 0);
        self
    }

    pub fn hit_count(&self, branch: &str) -> usize {
        self.counts_by_branch.get(branch).copied().unwrap_or(0)
    }

    /// Branches with at least one hit.
    pub fn branches_with_hits(&self) -> BTreeSet<String> {
        self.matched_paths_by_branch
            .iter()
            .filter(|(_, paths)| !paths.is_empty())
            .map(|(branch, _)| branch.clone())
            .chain(
                self.counts_by_branch
                    .iter()
                    .filter(|(_, count)| **count > 0)
                    .map(|(branch, _)| branch.clone()),
            )
            .collect()
    }

    pub fn matched_paths(&self, branch: &str) -> impl Iterator<Item = &TaxonomyPath> {
        self.matched_paths_by_branch
            .get(branch)
            .into_iter()
            .flat_map(|paths| paths.iter())
    }

    pub fn hits(&self) -> BTreeSet<TaxonomyPath> {
        self.matched_paths_by_branch
            .values()
            .flat_map(|paths| paths.iter().cloned())
            .collect()
    }

    /// Proper ancestors of every hit that are not hits themselves.
    pub fn intermediates(&self) -> BTreeSet<TaxonomyPath> {
        let hits = self.hits();
        hits.iter()
            .flat_map(|hit| hit.proper_prefixes())
            .filter(|prefix| !hits.contains(prefix))
            .collect()
    }

    /// Hits in `branch` plus all of their ancestors: the pruned subtree a
    /// ghost overlay shows.
    pub fn ghost_paths(&self, branch: &str) -> BTreeSet<TaxonomyPath> {
        self.matched_paths(branch)
            .flat_map(|hit| hit.prefixes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> TaxonomyPath {
        TaxonomyPath::parse(raw).unwrap()
    }

    fn context() -> SearchContext {
        SearchContext::from_matches(
            "nmap",
            [
                (EntryId::new("nmap"), path("Phase2/GroupX/Ports")),
                (EntryId::new("nmap-nse"), path("Phase2/GroupX/Ports")),
                (EntryId::new("zenmap"), path("Phase2/GroupY")),
            ],
        )
    }

    #[test]
    fn matches_fold_into_per_branch_counts_and_paths() {
        let context = context();
        assert!(context.has_query);
        assert_eq!(context.hit_count("Phase2"), 3);
        assert_eq!(context.hit_count("Phase1"), 0);
        assert_eq!(context.matched_paths("Phase2").count(), 2);
        assert_eq!(context.branches_with_hits(), BTreeSet::from(["Phase2".to_string()]));
    }

    #[test]
    fn intermediates_and_ghost_paths_follow_ancestors() {
        let context = context();
        assert_eq!(
            context.intermediates(),
            BTreeSet::from([path("Phase2"), path("Phase2/GroupX")])
        );
        assert_eq!(
            context.ghost_paths("Phase2"),
            BTreeSet::from([
                path("Phase2"),
                path("Phase2/GroupX"),
                path("Phase2/GroupX/Ports"),
                path("Phase2/GroupY"),
            ])
        );
        assert!(context.ghost_paths("Phase1").is_empty());
    }

    #[test]
    fn sanitize_drops_unknown_paths_and_branches() {
        let taxonomy = TaxonomyModel::from_paths(["Phase2/GroupX/Ports"]).unwrap();
        let context = context().sanitized(&taxonomy);
        assert_eq!(
            context.hits(),
            BTreeSet::from([path("Phase2/GroupX/Ports")])
        );
    }

    #[test]
    fn event_payload_deserializes_with_missing_optional_fields() {
        let context: SearchContext = serde_json::from_str(
            r#"{"has_query":true,"matched_paths_by_branch":{"Phase2":["Phase2/GroupX"]},"counts_by_branch":{"Phase2":1}}"#,
        )
        .unwrap();
        assert!(context.has_query);
        assert!(context.matched_entry_ids.is_empty());
        assert_eq!(context.hit_count("Phase2"), 1);
    }
}
