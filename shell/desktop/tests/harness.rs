/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::app::{NavIntent, NavigatorApp};
use crate::persistence::{MemoryStore, PersistenceAdapter};
use crate::shell::desktop::runtime::events::{NavEvent, ScopeChanged, drain};
use crate::shell::desktop::workbench::surface::SurfaceHandle;
use crate::shell::desktop::workbench::surface_invariants::collect_surface_invariant_violations;
use crate::test_utils::{path, sample_app, sample_search, sample_taxonomy};

/// Drives a `NavigatorApp` on a manual clock and records what it emits.
pub(crate) struct TestHarness {
    pub(crate) app: NavigatorApp,
    events: Receiver<NavEvent>,
    now: Instant,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        let mut app = sample_app();
        let events = app.subscribe();
        Self {
            app,
            events,
            now: Instant::now(),
        }
    }

    /// Harness whose session is restored from `store`.
    pub(crate) fn restored_from(store: &MemoryStore) -> Self {
        let mut harness = Self::new();
        let adapter = PersistenceAdapter::open(Box::new(store.clone()), &sample_taxonomy())
            .expect("memory store should open");
        harness.app.restore_session(adapter);
        harness
    }

    pub(crate) fn apply(&mut self, intent: NavIntent) {
        self.app.apply_intents_at(self.now, [intent]);
        self.assert_invariants();
    }

    pub(crate) fn select(&mut self, raw: &str) {
        self.apply(NavIntent::SelectPath { path: path(raw) });
    }

    pub(crate) fn toggle(&mut self, branch: &str) {
        self.apply(NavIntent::ToggleBranch {
            branch: branch.to_string(),
        });
    }

    pub(crate) fn search(&mut self, query: &str) {
        self.apply(NavIntent::SearchContext(sample_search(query)));
    }

    pub(crate) fn clear_search(&mut self) {
        self.apply(NavIntent::SearchCleared);
    }

    pub(crate) fn set_collapsed(&mut self, collapsed: bool) {
        self.apply(NavIntent::SetSidebarCollapsed { collapsed });
    }

    pub(crate) fn hover_branch(&mut self, branch: &str) {
        self.apply(NavIntent::HoverBranchEnter {
            branch: branch.to_string(),
        });
    }

    /// Move the clock forward and deliver a tick.
    pub(crate) fn advance(&mut self, by: Duration) {
        self.now += by;
        let now = self.now;
        self.apply(NavIntent::Tick { now });
    }

    /// Complete every queued transition on the spot, as a view without
    /// animations would.
    pub(crate) fn settle_transitions(&mut self) {
        for request in self.app.take_transition_requests() {
            if request.opening {
                continue;
            }
            if let Some(surface) = self.app.surface(request.surface) {
                surface.borrow_mut().finish_close(&request.path);
            }
        }
    }

    pub(crate) fn events(&self) -> Vec<NavEvent> {
        drain(&self.events)
    }

    pub(crate) fn scope_events(&self) -> Vec<ScopeChanged> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                NavEvent::ScopeChanged(scope) => Some(scope),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn panel_outline(&self) -> String {
        self.app.panel().borrow().outline()
    }

    pub(crate) fn overlay_outline(&self) -> String {
        self.app.overlay().borrow().outline()
    }

    fn assert_invariants(&self) {
        for surface in [self.app.panel(), self.app.overlay()] {
            assert_clean(&surface);
        }
    }
}

fn assert_clean(surface: &SurfaceHandle) {
    let violations = collect_surface_invariant_violations(&surface.borrow());
    assert!(
        violations.is_empty(),
        "surface invariants violated: {violations:?}"
    );
}
