/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use super::super::harness::TestHarness;
use crate::config::DEFAULT_LAYOUT_DEBOUNCE_MS;
use crate::test_utils::path;

const DEBOUNCE: Duration = Duration::from_millis(DEFAULT_LAYOUT_DEBOUNCE_MS);

#[test]
fn layout_waits_for_idle_then_fits_the_visible_tree() {
    let mut harness = TestHarness::new();
    let panel = harness.app.panel().borrow().id();

    harness.select("Phase1/GroupA");
    harness.select("Phase1/GroupB");
    assert!(harness.app.layout(panel).is_none());

    harness.advance(DEBOUNCE);

    let layout = harness
        .app
        .layout(panel)
        .cloned()
        .expect("panel layout after idle tick");
    assert_eq!(layout.widest_path, Some(path("Phase1/GroupA")));
    assert_eq!(layout.widest_label, "GroupA".len() + 1);
    assert_eq!(layout.last_visible, Some(path("Phase3")));
}

#[test]
fn closing_a_branch_moves_the_trailing_stroke_once_idle() {
    let mut harness = TestHarness::new();
    let panel = harness.app.panel().borrow().id();
    harness.toggle("Phase3");
    harness.advance(DEBOUNCE);
    assert_eq!(
        harness.app.layout(panel).and_then(|layout| layout.last_visible.clone()),
        Some(path("Phase3/GroupZ"))
    );

    harness.toggle("Phase3");
    harness.settle_transitions();
    harness.advance(DEBOUNCE / 2);
    assert_eq!(
        harness.app.layout(panel).and_then(|layout| layout.last_visible.clone()),
        Some(path("Phase3/GroupZ"))
    );

    harness.advance(DEBOUNCE);
    assert_eq!(
        harness.app.layout(panel).and_then(|layout| layout.last_visible.clone()),
        Some(path("Phase3"))
    );
}
