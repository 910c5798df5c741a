/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::shell::desktop::workbench::surface::Surface;

pub fn collect_surface_invariant_violations(surface: &Surface) -> Vec<String> {
    let mut violations = Vec::new();
    let id = surface.id();

    let active = surface.active_nodes();
    if active.len() > 1 {
        violations.push(format!(
            "surface {id}: {} active rows ({})",
            active.len(),
            active
                .iter()
                .map(|path| path.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let mut saw_normal = false;
    let mut saw_search = false;
    for node in surface.nodes() {
        let path = &node.path;
        saw_normal |= node.marks.has_normal_marks();
        saw_search |= node.marks.has_search_marks();

        if node.marks.has_normal_marks() && node.marks.has_search_marks() {
            violations.push(format!(
                "surface {id}: {path} carries both search and normal marks"
            ));
        }
        if node.badge.is_some() && !surface.roots().contains(path) {
            violations.push(format!("surface {id}: badge on non-toggle row {path}"));
        }
        if node.is_leaf && node.container.is_some() {
            violations.push(format!("surface {id}: leaf {path} has a child container"));
        }

        if surface.roots().contains(path) {
            continue;
        }
        let listed = path.parent().and_then(|parent| surface.node(&parent)).and_then(|parent| {
            parent
                .container
                .as_ref()
                .map(|container| container.children.contains(path))
        });
        match listed {
            Some(true) => {},
            Some(false) => violations.push(format!(
                "surface {id}: {path} is not listed by its parent container"
            )),
            None => violations.push(format!(
                "surface {id}: orphaned row {path} under a missing container"
            )),
        }
    }

    if saw_normal && saw_search {
        violations.push(format!(
            "surface {id}: search and normal highlighting are mixed"
        ));
    }
    violations
}
