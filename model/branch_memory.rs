/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-branch drill-down memory.
//!
//! Each top-level branch keeps its own `{active_path, expanded}` record so
//! switching branches never loses a branch's state. Records are created
//! lazily on first touch and cleared only by `reset_all`.

use std::collections::{BTreeSet, HashMap};

use crate::model::taxonomy::TaxonomyPath;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BranchMemory {
    pub active_path: Option<TaxonomyPath>,
    pub expanded: BTreeSet<TaxonomyPath>,
}

impl BranchMemory {
    /// Expanded paths, parents before children.
    pub fn expanded_in_depth_order(&self) -> Vec<TaxonomyPath> {
        let mut paths: Vec<TaxonomyPath> = self.expanded.iter().cloned().collect();
        paths.sort_by(|a, b| a.depth_order_key().cmp(&b.depth_order_key()));
        paths
    }
}

#[derive(Debug, Clone, Default)]
pub struct BranchMemoryStore {
    branches: HashMap<String, BranchMemory>,
}

impl BranchMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view; unknown branches read as the default record.
    pub fn memory(&self, branch: &str) -> BranchMemory {
        self.branches.get(branch).cloned().unwrap_or_default()
    }

    fn memory_mut(&mut self, branch: &str) -> &mut BranchMemory {
        self.branches.entry(branch.to_string()).or_default()
    }

    pub fn active_path(&self, branch: &str) -> Option<&TaxonomyPath> {
        self.branches
            .get(branch)
            .and_then(|memory| memory.active_path.as_ref())
    }

    /// Set (or clear) the active path. Proper prefixes of a new active path
    /// are expanded so the path stays visible.
    pub fn set_active_path(&mut self, branch: &str, path: Option<TaxonomyPath>) {
        let memory = self.memory_mut(branch);
        if let Some(path) = path.as_ref() {
            memory.expanded.extend(path.proper_prefixes());
        }
        memory.active_path = path;
    }

    pub fn expand(&mut self, branch: &str, path: TaxonomyPath) {
        self.memory_mut(branch).expanded.insert(path);
    }

    pub fn is_expanded(&self, branch: &str, path: &TaxonomyPath) -> bool {
        self.branches
            .get(branch)
            .is_some_and(|memory| memory.expanded.contains(path))
    }

    /// Remove every expanded path equal to or nested under `prefix`.
    pub fn collapse_subtree(&mut self, branch: &str, prefix: &TaxonomyPath) {
        self.memory_mut(branch)
            .expanded
            .retain(|path| !path.is_within(prefix));
    }

    /// Expanded paths for `branch`, shallowest first.
    pub fn expanded_paths(&self, branch: &str) -> Vec<TaxonomyPath> {
        self.branches
            .get(branch)
            .map(BranchMemory::expanded_in_depth_order)
            .unwrap_or_default()
    }

    pub fn touched_branches(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    pub fn reset_all(&mut self) {
        self.branches.clear();
    }
}
