/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Derived, surface-independent view of navigation state.
//!
//! `ViewState` is recomputed on demand from Branch Memory (idle) or the live
//! search context (search). Every surface is synchronized from the same
//! `ViewState`, so they agree on what is open and highlighted and differ only
//! in which rows they actually carry.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::branch_memory::BranchMemoryStore;
use crate::model::taxonomy::TaxonomyPath;
use crate::shell::desktop::ui::search_context::SearchContext;
use crate::shell::desktop::workbench::surface::Badge;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Highlight {
    Normal {
        active: Option<TaxonomyPath>,
    },
    Search {
        hits: BTreeSet<TaxonomyPath>,
        intermediates: BTreeSet<TaxonomyPath>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Paths whose child container should be open, parents before children.
    pub open_paths: Vec<TaxonomyPath>,
    pub highlight: Highlight,
    /// Branch toggle badges. Absent key means no badge.
    pub badges: BTreeMap<String, Badge>,
}

/// Live search inputs to `ViewState::derive`.
#[derive(Debug, Clone, Copy)]
pub struct SearchView<'a> {
    pub context: &'a SearchContext,
    pub open_branches: &'a BTreeSet<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewInputs<'a> {
    pub memory: &'a BranchMemoryStore,
    pub current_branch: Option<&'a str>,
    pub open_branches: &'a BTreeSet<String>,
    pub search: Option<SearchView<'a>>,
    /// Resolved scope size for the current branch's badge while idle.
    pub scope_count: Option<usize>,
}

impl ViewState {
    pub fn derive(inputs: ViewInputs<'_>) -> Self {
        match inputs.search {
            Some(search) => Self::derive_search(search),
            None => Self::derive_idle(inputs),
        }
    }

    /// Idle view for one branch, open with its own memory. What a single
    /// branch surface shows when nothing else is in play.
    pub fn for_branch(memory: &BranchMemoryStore, branch: &str) -> Self {
        let open = BTreeSet::from([branch.to_string()]);
        Self::derive(ViewInputs {
            memory,
            current_branch: Some(branch),
            open_branches: &open,
            search: None,
            scope_count: None,
        })
    }

    fn derive_idle(inputs: ViewInputs<'_>) -> Self {
        let mut open_paths = Vec::new();
        for branch in inputs.open_branches {
            let Ok(root) = TaxonomyPath::branch_root(branch) else {
                continue;
            };
            open_paths.push(root.clone());
            open_paths.extend(
                inputs
                    .memory
                    .expanded_paths(branch)
                    .into_iter()
                    .filter(|path| *path != root),
            );
        }
        sort_shallowest_first(&mut open_paths);

        let active = inputs
            .current_branch
            .and_then(|branch| inputs.memory.active_path(branch))
            .cloned();

        let mut badges = BTreeMap::new();
        if let (Some(branch), Some(count)) = (inputs.current_branch, inputs.scope_count) {
            badges.insert(branch.to_string(), Badge::ScopeCount(count));
        }

        Self {
            open_paths,
            highlight: Highlight::Normal { active },
            badges,
        }
    }

    fn derive_search(search: SearchView<'_>) -> Self {
        let mut open_paths = Vec::new();
        for branch in search.open_branches {
            let Ok(root) = TaxonomyPath::branch_root(branch) else {
                continue;
            };
            let mut branch_paths: BTreeSet<TaxonomyPath> = search
                .context
                .matched_paths(branch)
                .flat_map(|hit| hit.proper_prefixes())
                .collect();
            branch_paths.insert(root);
            open_paths.extend(branch_paths);
        }
        sort_shallowest_first(&mut open_paths);

        let badges = search
            .context
            .counts_by_branch
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(branch, count)| (branch.clone(), Badge::SearchCount(*count)))
            .collect();

        Self {
            open_paths,
            highlight: Highlight::Search {
                hits: search.context.hits(),
                intermediates: search.context.intermediates(),
            },
            badges,
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self.highlight, Highlight::Search { .. })
    }

    pub fn active_path(&self) -> Option<&TaxonomyPath> {
        match &self.highlight {
            Highlight::Normal { active } => active.as_ref(),
            Highlight::Search { .. } => None,
        }
    }

    /// Prefixes of the active path, i.e. what any surface may mark as
    /// in-active-path.
    pub fn highlighted_prefixes(&self) -> BTreeSet<TaxonomyPath> {
        self.active_path()
            .map(|active| active.prefixes().into_iter().collect())
            .unwrap_or_default()
    }
}

fn sort_shallowest_first(paths: &mut Vec<TaxonomyPath>) {
    paths.sort_by(|a, b| a.depth_order_key().cmp(&b.depth_order_key()));
    paths.dedup();
}
