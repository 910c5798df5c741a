/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Concrete render surfaces for the category tree.
//!
//! Two kinds exist:
//! - **Panel**: the persistent sidebar. Every branch toggle is always present;
//!   nested rows exist only under materialized containers.
//! - **Overlay**: the floating flyout shown for one branch while the panel is
//!   collapsed. It may be pruned to a "ghost" subset during search.
//!
//! A surface never holds navigation truth. It is written to by the
//! synchronizer from a derived `ViewState` and can be rebuilt at any time.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::rc::Rc;

use log::debug;

use crate::model::taxonomy::{TaxonomyModel, TaxonomyPath};
use crate::shell::desktop::lifecycle::transition::TransitionView;

pub type SurfaceHandle = Rc<RefCell<Surface>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SurfaceId(uuid::Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Panel,
    Overlay,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeMarks {
    pub active: bool,
    pub in_active_path: bool,
    pub has_active_descendant: bool,
    pub search_hit: bool,
    pub search_intermediate: bool,
}

impl NodeMarks {
    pub fn has_normal_marks(&self) -> bool {
        self.active || self.in_active_path || self.has_active_descendant
    }

    pub fn has_search_marks(&self) -> bool {
        self.search_hit || self.search_intermediate
    }
}

/// Count shown on a branch toggle. One slot per toggle, so the two modes can
/// never be displayed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    SearchCount(usize),
    ScopeCount(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    Open,
    /// Close transition in flight; children are removed when it completes.
    Closing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildContainer {
    pub state: ContainerState,
    pub children: Vec<TaxonomyPath>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceNode {
    pub path: TaxonomyPath,
    pub is_leaf: bool,
    pub container: Option<ChildContainer>,
    pub marks: NodeMarks,
    pub badge: Option<Badge>,
}

impl SurfaceNode {
    fn new(path: TaxonomyPath, is_leaf: bool) -> Self {
        Self {
            path,
            is_leaf,
            container: None,
            marks: NodeMarks::default(),
            badge: None,
        }
    }

    pub fn label(&self) -> &str {
        self.path.name()
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self.container,
            Some(ChildContainer {
                state: ContainerState::Open,
                ..
            })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SurfaceFilter {
    Everything,
    Branch {
        branch: String,
        ghost: Option<BTreeSet<TaxonomyPath>>,
    },
}

impl SurfaceFilter {
    fn admits(&self, path: &TaxonomyPath) -> bool {
        match self {
            Self::Everything => true,
            Self::Branch { branch, ghost } => {
                path.branch() == branch && ghost.as_ref().is_none_or(|paths| paths.contains(path))
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InFlightTransition {
    pub opening: bool,
    pub target_extent: f32,
}

#[derive(Debug, Clone)]
pub struct Surface {
    id: SurfaceId,
    kind: SurfaceKind,
    filter: SurfaceFilter,
    roots: Vec<TaxonomyPath>,
    nodes: BTreeMap<TaxonomyPath, SurfaceNode>,
    in_flight: BTreeMap<TaxonomyPath, InFlightTransition>,
    row_extent: f32,
}

impl Surface {
    /// Sidebar panel with one toggle per branch.
    pub fn panel(taxonomy: &TaxonomyModel, row_extent: f32) -> Self {
        let mut surface = Self::empty(SurfaceKind::Panel, SurfaceFilter::Everything, row_extent);
        for branch in taxonomy.branches() {
            if let Ok(root) = TaxonomyPath::branch_root(branch) {
                surface.insert_root(taxonomy, root);
            }
        }
        surface
    }

    /// Flyout overlay, initially showing nothing.
    pub fn overlay(row_extent: f32) -> Self {
        Self::empty(
            SurfaceKind::Overlay,
            SurfaceFilter::Branch {
                branch: String::new(),
                ghost: None,
            },
            row_extent,
        )
    }

    fn empty(kind: SurfaceKind, filter: SurfaceFilter, row_extent: f32) -> Self {
        Self {
            id: SurfaceId::new(),
            kind,
            filter,
            roots: Vec::new(),
            nodes: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            row_extent,
        }
    }

    pub fn into_handle(self) -> SurfaceHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// Branch shown by an overlay; `None` for the panel or a blank overlay.
    pub fn target_branch(&self) -> Option<&str> {
        match &self.filter {
            SurfaceFilter::Branch { branch, .. } if !branch.is_empty() => Some(branch),
            _ => None,
        }
    }

    /// Path an overlay keeps open regardless of Branch Memory: its own root.
    pub fn pinned_root(&self) -> Option<&TaxonomyPath> {
        match self.kind {
            SurfaceKind::Overlay => self.roots.first(),
            SurfaceKind::Panel => None,
        }
    }

    /// Point an overlay at `branch`, optionally pruned to `ghost`. Switching
    /// branches rebuilds from scratch; changing only the ghost set prunes
    /// rows that are no longer admitted.
    pub fn retarget(
        &mut self,
        taxonomy: &TaxonomyModel,
        branch: &str,
        ghost: Option<BTreeSet<TaxonomyPath>>,
    ) {
        if self.kind != SurfaceKind::Overlay {
            debug!("retarget ignored on {:?} surface {}", self.kind, self.id);
            return;
        }
        let branch_changed = self.target_branch() != Some(branch);
        self.filter = SurfaceFilter::Branch {
            branch: branch.to_string(),
            ghost,
        };
        if branch_changed {
            self.clear();
            if let Ok(root) = TaxonomyPath::branch_root(branch)
                && taxonomy.contains(&root)
            {
                self.insert_root(taxonomy, root);
            }
            return;
        }
        self.prune_unadmitted();
    }

    /// Back to the freshly constructed state, keeping the identity.
    pub fn rebuild(&mut self, taxonomy: &TaxonomyModel) {
        let fresh = match self.kind {
            SurfaceKind::Panel => Self::panel(taxonomy, self.row_extent),
            SurfaceKind::Overlay => Self::overlay(self.row_extent),
        };
        *self = Self { id: self.id, ..fresh };
    }

    /// Drop every row; an overlay goes blank.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.nodes.clear();
        self.in_flight.clear();
    }

    pub fn hide(&mut self) {
        self.clear();
        self.filter = SurfaceFilter::Branch {
            branch: String::new(),
            ghost: None,
        };
    }

    fn insert_root(&mut self, taxonomy: &TaxonomyModel, root: TaxonomyPath) {
        if !self.filter.admits(&root) || self.nodes.contains_key(&root) {
            return;
        }
        let is_leaf = taxonomy.is_leaf(&root);
        self.roots.push(root.clone());
        self.nodes.insert(root.clone(), SurfaceNode::new(root, is_leaf));
    }

    fn prune_unadmitted(&mut self) {
        let rejected: Vec<TaxonomyPath> = self
            .nodes
            .keys()
            .filter(|path| !self.filter.admits(path))
            .cloned()
            .collect();
        for path in rejected {
            self.remove_subtree(&path);
        }
    }

    pub fn roots(&self) -> &[TaxonomyPath] {
        &self.roots
    }

    pub fn contains(&self, path: &TaxonomyPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn node(&self, path: &TaxonomyPath) -> Option<&SurfaceNode> {
        self.nodes.get(path)
    }

    pub(crate) fn node_mut(&mut self, path: &TaxonomyPath) -> Option<&mut SurfaceNode> {
        self.nodes.get_mut(path)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SurfaceNode> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SurfaceNode> {
        self.nodes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn active_nodes(&self) -> Vec<&TaxonomyPath> {
        self.nodes
            .values()
            .filter(|node| node.marks.active)
            .map(|node| &node.path)
            .collect()
    }

    /// Every path carrying a normal highlight mark.
    pub fn highlighted_paths(&self) -> BTreeSet<TaxonomyPath> {
        self.nodes
            .values()
            .filter(|node| node.marks.in_active_path)
            .map(|node| node.path.clone())
            .collect()
    }

    pub fn in_flight(&self, path: &TaxonomyPath) -> Option<InFlightTransition> {
        self.in_flight.get(path).copied()
    }

    /// Ensure `path` has an open child container holding every admitted child.
    /// Returns true when the container went from absent or closing to open.
    /// Leaves and paths not on this surface are left alone.
    pub(crate) fn ensure_open(&mut self, taxonomy: &TaxonomyModel, path: &TaxonomyPath) -> bool {
        let Some(node) = self.nodes.get(path) else {
            return false;
        };
        if node.is_leaf {
            return false;
        }
        let was_open = node.is_open();
        let existing: BTreeSet<TaxonomyPath> = node
            .container
            .as_ref()
            .map(|container| container.children.iter().cloned().collect())
            .unwrap_or_default();

        let admitted: Vec<TaxonomyPath> = taxonomy
            .child_paths(path)
            .into_iter()
            .filter(|child| self.filter.admits(child))
            .collect();
        for child in &admitted {
            if !existing.contains(child) {
                let is_leaf = taxonomy.is_leaf(child);
                self.nodes
                    .entry(child.clone())
                    .or_insert_with(|| SurfaceNode::new(child.clone(), is_leaf));
            }
        }
        if let Some(node) = self.nodes.get_mut(path) {
            node.container = Some(ChildContainer {
                state: ContainerState::Open,
                children: admitted,
            });
        }
        !was_open
    }

    /// Flag an open container as closing. Its rows stay until `finish_close`.
    pub(crate) fn begin_close(&mut self, path: &TaxonomyPath) -> bool {
        match self.nodes.get_mut(path).and_then(|node| node.container.as_mut()) {
            Some(container) if container.state == ContainerState::Open => {
                container.state = ContainerState::Closing;
                true
            },
            _ => false,
        }
    }

    /// Remove a closing container and everything under it. A container that
    /// was reopened in the meantime is left untouched.
    pub fn finish_close(&mut self, path: &TaxonomyPath) -> bool {
        let closing = self
            .nodes
            .get(path)
            .and_then(|node| node.container.as_ref())
            .is_some_and(|container| container.state == ContainerState::Closing);
        if !closing {
            return false;
        }
        self.remove_descendants(path);
        if let Some(node) = self.nodes.get_mut(path) {
            node.container = None;
        }
        true
    }

    fn remove_descendants(&mut self, path: &TaxonomyPath) {
        let doomed: Vec<TaxonomyPath> = self
            .nodes
            .keys()
            .filter(|candidate| *candidate != path && candidate.is_within(path))
            .cloned()
            .collect();
        for candidate in doomed {
            self.nodes.remove(&candidate);
            self.in_flight.remove(&candidate);
        }
    }

    fn remove_subtree(&mut self, path: &TaxonomyPath) {
        self.remove_descendants(path);
        self.nodes.remove(path);
        self.in_flight.remove(path);
        self.roots.retain(|root| root != path);
        if let Some(parent) = path.parent()
            && let Some(container) = self
                .nodes
                .get_mut(&parent)
                .and_then(|node| node.container.as_mut())
        {
            container.children.retain(|child| child != path);
        }
    }

    /// Rows a user can currently see, in display order: roots, then the
    /// children of every open container, depth-first.
    pub fn visible_rows(&self) -> Vec<&SurfaceNode> {
        let mut rows = Vec::new();
        let mut stack: Vec<&TaxonomyPath> = self.roots.iter().rev().collect();
        while let Some(path) = stack.pop() {
            let Some(node) = self.nodes.get(path) else {
                continue;
            };
            rows.push(node);
            if let Some(container) = node.container.as_ref()
                && container.state == ContainerState::Open
            {
                stack.extend(container.children.iter().rev());
            }
        }
        rows
    }

    fn visible_rows_under(&self, path: &TaxonomyPath) -> usize {
        let Some(container) = self.nodes.get(path).and_then(|node| node.container.as_ref()) else {
            return 0;
        };
        container
            .children
            .iter()
            .map(|child| {
                let nested = match self.nodes.get(child) {
                    Some(node) if node.is_open() => self.visible_rows_under(child),
                    _ => 0,
                };
                1 + nested
            })
            .sum()
    }

    /// Indented text rendering used by tests and debug logs.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for node in self.visible_rows() {
            let indent = "  ".repeat(node.path.depth().saturating_sub(1));
            let marker = match node.container.as_ref().map(|container| container.state) {
                Some(ContainerState::Open) => "v",
                Some(ContainerState::Closing) => "~",
                None if node.is_leaf => "-",
                None => ">",
            };
            let _ = write!(out, "{indent}{marker} {}", node.label());
            let marks = &node.marks;
            for (on, tag) in [
                (marks.active, "active"),
                (marks.in_active_path, "path"),
                (marks.has_active_descendant, "desc"),
                (marks.search_hit, "hit"),
                (marks.search_intermediate, "via"),
            ] {
                if on {
                    let _ = write!(out, " [{tag}]");
                }
            }
            match node.badge {
                Some(Badge::SearchCount(count)) => {
                    let _ = write!(out, " (search {count})");
                },
                Some(Badge::ScopeCount(count)) => {
                    let _ = write!(out, " ({count})");
                },
                None => {},
            }
            out.push('\n');
        }
        out
    }
}

impl TransitionView for Surface {
    fn measure_extent(&self, container: &TaxonomyPath) -> Option<f32> {
        let node = self.nodes.get(container)?;
        node.container.as_ref()?;
        Some(self.visible_rows_under(container) as f32 * self.row_extent)
    }

    fn begin_transition(&mut self, container: &TaxonomyPath, opening: bool, target_extent: f32) {
        self.in_flight.insert(
            container.clone(),
            InFlightTransition {
                opening,
                target_extent,
            },
        );
    }

    fn complete_transition(&mut self, container: &TaxonomyPath, opening: bool) {
        self.in_flight.remove(container);
        if !opening {
            self.finish_close(container);
        }
    }
}
