/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use super::super::harness::TestHarness;
use crate::app::NavIntent;
use crate::config::{DEFAULT_HOVER_CLOSE_GRACE_MS, DEFAULT_HOVER_OPEN_DELAY_MS};

const OPEN_DELAY: Duration = Duration::from_millis(DEFAULT_HOVER_OPEN_DELAY_MS);
const CLOSE_GRACE: Duration = Duration::from_millis(DEFAULT_HOVER_CLOSE_GRACE_MS);

fn collapsed() -> TestHarness {
    let mut harness = TestHarness::new();
    harness.set_collapsed(true);
    harness
}

#[test]
fn overlay_shows_branch_memory_even_when_panel_branch_is_closed() {
    let mut harness = TestHarness::new();
    harness.select("Phase2/GroupY/Deep");
    harness.toggle("Phase2");
    harness.set_collapsed(true);

    harness.hover_branch("Phase2");
    harness.advance(OPEN_DELAY);

    insta::assert_snapshot!(harness.overlay_outline(), @r"
    v Phase2 [path] [desc] (1)
      - GroupX
      v GroupY [path] [desc]
        - Deep [active] [path]
    ");
}

#[test]
fn close_grace_survives_a_trip_into_the_overlay() {
    let mut harness = collapsed();
    harness.hover_branch("Phase1");
    harness.advance(OPEN_DELAY);

    harness.apply(NavIntent::HoverBranchLeave);
    harness.advance(CLOSE_GRACE / 2);
    harness.apply(NavIntent::HoverOverlayEnter);
    harness.advance(CLOSE_GRACE);
    assert_eq!(harness.app.hover().shown_branch(), Some("Phase1"));

    harness.apply(NavIntent::HoverOverlayLeave);
    harness.advance(CLOSE_GRACE);
    assert_eq!(harness.app.hover().shown_branch(), None);
    assert!(harness.overlay_outline().is_empty());
}

#[test]
fn sweeping_across_toggles_only_opens_the_last_one() {
    let mut harness = collapsed();
    let step = OPEN_DELAY / 2;

    harness.hover_branch("Phase1");
    harness.advance(step);
    harness.hover_branch("Phase2");
    harness.advance(step);
    assert_eq!(harness.app.hover().shown_branch(), None);

    harness.advance(step);
    assert_eq!(harness.app.hover().shown_branch(), Some("Phase2"));
    assert_eq!(harness.app.overlay().borrow().target_branch(), Some("Phase2"));
}

#[test]
fn overlay_during_search_shows_the_pruned_subtree() {
    let mut harness = collapsed();
    harness.search("nmap");

    harness.hover_branch("Phase2");
    harness.advance(OPEN_DELAY);
    insta::assert_snapshot!(harness.overlay_outline(), @r"
    v Phase2 [via] (search 1)
      - GroupX [hit]
    ");

    harness.hover_branch("Phase1");
    harness.advance(OPEN_DELAY);
    insta::assert_snapshot!(harness.overlay_outline(), @"v Phase1");
}

#[test]
fn expanding_the_panel_dismisses_the_overlay() {
    let mut harness = collapsed();
    harness.hover_branch("Phase3");
    harness.advance(OPEN_DELAY);
    assert!(!harness.overlay_outline().is_empty());

    harness.set_collapsed(false);

    assert!(harness.overlay_outline().is_empty());
    assert_eq!(harness.app.hover().next_deadline(), None);
}
