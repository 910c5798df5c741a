/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Search layer over normal navigation.
//!
//! While a query is active the controller owns what is open and highlighted;
//! Branch Memory is left frozen and is restored from the pre-search snapshot
//! when the query clears. Open state during search is "branches with hits",
//! adjusted by explicit user toggles which are tracked separately.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::model::taxonomy::TaxonomyPath;
use crate::persistence::PreSearchSnapshot;
use crate::shell::desktop::ui::search_context::SearchContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSearch {
    context: SearchContext,
    /// `None` when the search began from the unfiltered view.
    pre_search: Option<PreSearchSnapshot>,
    /// Branch -> explicitly chosen open state during this search.
    user_open: BTreeMap<String, bool>,
    effective_open: BTreeSet<String>,
}

impl ActiveSearch {
    fn recompute_open(&mut self) {
        let mut open = self.context.branches_with_hits();
        for (branch, keep_open) in &self.user_open {
            if *keep_open {
                open.insert(branch.clone());
            } else {
                open.remove(branch);
            }
        }
        self.effective_open = open;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchPhase {
    #[default]
    Idle,
    Active(ActiveSearch),
}

/// What the caller must do after a context update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTransition {
    Entered,
    Updated,
    Exited(RestoreTarget),
    Unchanged,
}

/// Navigation state to return to when a search ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreTarget {
    Snapshot(PreSearchSnapshot),
    Unfiltered,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOverlayController {
    phase: SearchPhase,
}

impl SearchOverlayController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SearchPhase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SearchPhase::Active(_))
    }

    pub fn context(&self) -> Option<&SearchContext> {
        match &self.phase {
            SearchPhase::Active(search) => Some(&search.context),
            SearchPhase::Idle => None,
        }
    }

    pub fn pre_search(&self) -> Option<&PreSearchSnapshot> {
        match &self.phase {
            SearchPhase::Active(search) => search.pre_search.as_ref(),
            SearchPhase::Idle => None,
        }
    }

    /// Feed a new matcher result. `snapshot` is only called on the idle to
    /// active edge, to capture the state to restore later.
    pub fn apply_context(
        &mut self,
        context: SearchContext,
        snapshot: impl FnOnce() -> Option<PreSearchSnapshot>,
    ) -> SearchTransition {
        if !context.has_query {
            return self.clear();
        }
        match &mut self.phase {
            SearchPhase::Idle => {
                let mut search = ActiveSearch {
                    context,
                    pre_search: snapshot(),
                    user_open: BTreeMap::new(),
                    effective_open: BTreeSet::new(),
                };
                search.recompute_open();
                debug!(
                    "search entered with {} branch(es) open",
                    search.effective_open.len()
                );
                self.phase = SearchPhase::Active(search);
                SearchTransition::Entered
            },
            SearchPhase::Active(search) => {
                if search.context == context {
                    return SearchTransition::Unchanged;
                }
                search.context = context;
                search.recompute_open();
                SearchTransition::Updated
            },
        }
    }

    pub fn clear(&mut self) -> SearchTransition {
        match std::mem::take(&mut self.phase) {
            SearchPhase::Idle => SearchTransition::Unchanged,
            SearchPhase::Active(search) => SearchTransition::Exited(
                search
                    .pre_search
                    .map(RestoreTarget::Snapshot)
                    .unwrap_or(RestoreTarget::Unfiltered),
            ),
        }
    }

    /// Record an explicit user toggle of `branch` during search. Returns the
    /// new open state, or `None` when idle.
    pub fn toggle_branch(&mut self, branch: &str) -> Option<bool> {
        let SearchPhase::Active(search) = &mut self.phase else {
            return None;
        };
        let open = !search.effective_open.contains(branch);
        search.user_open.insert(branch.to_string(), open);
        search.recompute_open();
        Some(open)
    }

    pub fn user_open_decisions(&self) -> Option<&BTreeMap<String, bool>> {
        match &self.phase {
            SearchPhase::Active(search) => Some(&search.user_open),
            SearchPhase::Idle => None,
        }
    }

    /// Branches open during search: hits, adjusted by user decisions.
    pub fn open_branches(&self) -> Option<&BTreeSet<String>> {
        match &self.phase {
            SearchPhase::Active(search) => Some(&search.effective_open),
            SearchPhase::Idle => None,
        }
    }

    /// Pruned subtree for an overlay showing `branch` during search.
    pub fn ghost_paths(&self, branch: &str) -> Option<BTreeSet<TaxonomyPath>> {
        let context = self.context()?;
        let mut ghost = context.ghost_paths(branch);
        if let Ok(root) = TaxonomyPath::branch_root(branch) {
            ghost.insert(root);
        }
        Some(ghost)
    }

    pub fn reset(&mut self) {
        self.phase = SearchPhase::Idle;
    }
}
