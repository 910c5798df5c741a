/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Apply a `ViewState` to a concrete surface.
//!
//! Order of operations:
//! 1. Materialize containers for every open path, shallowest first.
//! 2. Begin closing containers that are open but no longer wanted. Only the
//!    outermost such container is reported; nested ones go with it.
//! 3. Clear every mark and reapply the highlight.
//! 4. Replace branch toggle badges.
//!
//! Paths the surface does not carry are skipped silently. Running the sync
//! twice without a state change in between changes nothing the second time.

use std::collections::BTreeSet;

use log::debug;

use crate::model::taxonomy::{TaxonomyModel, TaxonomyPath};
use crate::shell::desktop::workbench::surface::{ContainerState, Surface};
use crate::shell::desktop::workbench::view_state::{Highlight, ViewState};

/// Container changes a sync produced. The caller turns these into
/// open/close transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub opened: Vec<TaxonomyPath>,
    pub closed: Vec<TaxonomyPath>,
    pub skipped: usize,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty()
    }
}

pub fn sync_surface(surface: &mut Surface, taxonomy: &TaxonomyModel, view: &ViewState) -> SyncReport {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!(
        "sync_surface",
        surface = %surface.id(),
        open_paths = view.open_paths.len()
    )
    .entered();

    let mut report = SyncReport::default();
    let mut wanted: Vec<TaxonomyPath> = surface.pinned_root().cloned().into_iter().collect();
    wanted.extend(view.open_paths.iter().cloned());
    let wanted_set: BTreeSet<TaxonomyPath> = wanted.iter().cloned().collect();

    for path in &wanted {
        if !surface.contains(path) {
            report.skipped += 1;
            continue;
        }
        if surface.ensure_open(taxonomy, path) {
            report.opened.push(path.clone());
        }
    }

    for path in containers_to_close(surface, &wanted_set) {
        if surface.begin_close(&path) {
            report.closed.push(path);
        }
    }

    apply_marks(surface, view);
    apply_badges(surface, view);

    if report.skipped > 0 {
        debug!(
            "sync on {} skipped {} path(s) not carried by the surface",
            surface.id(),
            report.skipped
        );
    }
    report
}

fn containers_to_close(surface: &Surface, wanted: &BTreeSet<TaxonomyPath>) -> Vec<TaxonomyPath> {
    let closing_or_unwanted: BTreeSet<&TaxonomyPath> = surface
        .nodes()
        .filter(|node| match node.container.as_ref().map(|container| container.state) {
            Some(ContainerState::Closing) => true,
            Some(ContainerState::Open) => !wanted.contains(&node.path),
            None => false,
        })
        .map(|node| &node.path)
        .collect();

    surface
        .nodes()
        .filter(|node| node.is_open() && !wanted.contains(&node.path))
        .filter(|node| {
            !node
                .path
                .proper_prefixes()
                .iter()
                .any(|ancestor| closing_or_unwanted.contains(ancestor))
        })
        .map(|node| node.path.clone())
        .collect()
}

fn apply_marks(surface: &mut Surface, view: &ViewState) {
    for node in surface.nodes_mut() {
        node.marks = Default::default();
    }

    match &view.highlight {
        Highlight::Normal { active: Some(active) } => {
            // Deepest first, carrying whether the row below is on the path.
            let mut child_on_path = false;
            for prefix in active.prefixes().iter().rev() {
                match surface.node_mut(prefix) {
                    Some(node) => {
                        node.marks.in_active_path = true;
                        node.marks.has_active_descendant = child_on_path;
                        node.marks.active = prefix == active;
                        child_on_path = true;
                    },
                    None => child_on_path = false,
                }
            }
        },
        Highlight::Normal { active: None } => {},
        Highlight::Search {
            hits,
            intermediates,
        } => {
            for hit in hits {
                if let Some(node) = surface.node_mut(hit) {
                    node.marks.search_hit = true;
                }
            }
            for via in intermediates {
                if let Some(node) = surface.node_mut(via) {
                    node.marks.search_intermediate = true;
                }
            }
        },
    }
}

fn apply_badges(surface: &mut Surface, view: &ViewState) {
    let roots: Vec<TaxonomyPath> = surface.roots().to_vec();
    for root in roots {
        if let Some(node) = surface.node_mut(&root) {
            node.badge = view.badges.get(root.as_str()).copied();
        }
    }
}
