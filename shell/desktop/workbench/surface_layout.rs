/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Layout-affecting recomputation, debounced per surface.
//!
//! Fitting a surface to its longest visible label and placing the trailing
//! stroke under the last visible row both depend on the full visible tree,
//! so bursts of state changes collapse into one recompute on the next idle
//! tick.

use std::time::{Duration, Instant};

use crate::model::taxonomy::TaxonomyPath;
use crate::shell::desktop::runtime::timers::Debouncer;
use crate::shell::desktop::workbench::surface::{Surface, SurfaceId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceLayout {
    /// Longest visible label, measured in characters plus one per indent level.
    pub widest_label: usize,
    pub widest_path: Option<TaxonomyPath>,
    /// Row that carries the trailing stroke.
    pub last_visible: Option<TaxonomyPath>,
}

pub fn compute_layout(surface: &Surface) -> SurfaceLayout {
    let rows = surface.visible_rows();
    let mut layout = SurfaceLayout {
        last_visible: rows.last().map(|node| node.path.clone()),
        ..SurfaceLayout::default()
    };
    for node in rows {
        let width = node.label().chars().count() + node.path.depth().saturating_sub(1);
        if width > layout.widest_label {
            layout.widest_label = width;
            layout.widest_path = Some(node.path.clone());
        }
    }
    layout
}

#[derive(Debug, Clone)]
pub struct LayoutDebouncer {
    debouncer: Debouncer<SurfaceId>,
}

impl LayoutDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(delay),
        }
    }

    pub fn request(&mut self, surface: SurfaceId, now: Instant) {
        self.debouncer.request(surface, now);
    }

    /// Surfaces whose idle deadline has passed, each at most once.
    pub fn take_due(&mut self, now: Instant) -> Vec<SurfaceId> {
        self.debouncer.take_due(now)
    }

    pub fn is_pending(&self, surface: SurfaceId) -> bool {
        self.debouncer.is_pending(&surface)
    }

    pub fn coalesced_count(&self) -> u64 {
        self.debouncer.coalesced_count()
    }

    pub fn clear(&mut self) {
        self.debouncer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::taxonomy::TaxonomyModel;

    fn path(raw: &str) -> TaxonomyPath {
        TaxonomyPath::parse(raw).unwrap()
    }

    #[test]
    fn layout_tracks_widest_label_and_last_row() {
        let taxonomy =
            TaxonomyModel::from_paths(["Recon/Passive", "Recon/ActiveScanning", "Exploit"]).unwrap();
        let mut panel = Surface::panel(&taxonomy, 28.0);
        assert_eq!(compute_layout(&panel).last_visible, Some(path("Exploit")));

        panel.ensure_open(&taxonomy, &path("Recon"));
        let layout = compute_layout(&panel);

        assert_eq!(layout.widest_path, Some(path("Recon/ActiveScanning")));
        assert_eq!(layout.widest_label, "ActiveScanning".len() + 1);
        assert_eq!(layout.last_visible, Some(path("Exploit")));
    }

    #[test]
    fn bursts_collapse_into_one_recompute_per_surface() {
        let start = Instant::now();
        let panel = SurfaceId::new();
        let overlay = SurfaceId::new();
        let mut debouncer = LayoutDebouncer::new(Duration::from_millis(16));

        debouncer.request(panel, start);
        debouncer.request(panel, start + Duration::from_millis(5));
        debouncer.request(overlay, start + Duration::from_millis(5));

        assert!(debouncer.take_due(start + Duration::from_millis(10)).is_empty());
        let mut due = debouncer.take_due(start + Duration::from_millis(30));
        due.sort();
        let mut expected = vec![panel, overlay];
        expected.sort();
        assert_eq!(due, expected);
        assert_eq!(debouncer.coalesced_count(), 1);
        assert!(!debouncer.is_pending(panel));
    }
}
