/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::BTreeSet;

use super::super::harness::TestHarness;
use crate::app::NavIntent;
use crate::shell::desktop::runtime::events::ScopeSource;
use crate::test_utils::path;

#[test]
fn search_replaces_highlighting_and_clearing_restores_it() {
    let mut harness = TestHarness::new();
    harness.select("Phase1/GroupA");
    harness.settle_transitions();
    let idle = harness.panel_outline();
    insta::assert_snapshot!(idle, @r"
    v Phase1 [path] [desc] (2)
      v GroupA [active] [path]
        - Sub1
        - Sub2
      - GroupB
    > Phase2
    > Phase3
    ");

    harness.search("nmap");
    harness.settle_transitions();
    insta::assert_snapshot!(harness.panel_outline(), @r"
    > Phase1
    v Phase2 [via] (search 1)
      - GroupX [hit]
      > GroupY
    > Phase3
    ");

    harness.clear_search();
    harness.settle_transitions();
    assert_eq!(harness.panel_outline(), idle);
    let last = harness.scope_events().pop().expect("restoration scope");
    assert_eq!(last.source, ScopeSource::Restoration);
    assert_eq!(last.resolved_key, "phase1/groupa");
}

#[test]
fn badges_follow_search_counts_only() {
    let mut harness = TestHarness::new();
    harness.select("Phase1/GroupA");
    harness.settle_transitions();

    harness.search("map");
    harness.settle_transitions();

    insta::assert_snapshot!(harness.panel_outline(), @r"
    > Phase1
    v Phase2 [via] (search 1)
      - GroupX [hit]
      > GroupY
    v Phase3 [via] (search 1)
      - GroupZ [hit]
    ");
}

#[test]
fn toggles_during_search_survive_refinement_but_not_the_search() {
    let mut harness = TestHarness::new();
    harness.select("Phase1/GroupA");
    harness.search("nmap");
    harness.toggle("Phase3");
    harness.search("nma");

    assert_eq!(
        harness.app.open_branches(),
        &BTreeSet::from(["Phase2".to_string(), "Phase3".to_string()])
    );

    harness.clear_search();
    assert_eq!(
        harness.app.open_branches(),
        &BTreeSet::from(["Phase1".to_string()])
    );
    assert_eq!(harness.app.active_path(), Some(&path("Phase1/GroupA")));
}

#[test]
fn expanding_the_panel_mid_search_rebuilds_from_live_results() {
    let mut harness = TestHarness::new();
    harness.set_collapsed(true);
    harness.select("Phase1/GroupA");
    harness.search("nmap");
    insta::assert_snapshot!(harness.panel_outline(), @r"
    > Phase1
    > Phase2
    > Phase3
    ");

    harness.set_collapsed(false);

    insta::assert_snapshot!(harness.panel_outline(), @r"
    > Phase1
    v Phase2 [via] (search 1)
      - GroupX [hit]
      > GroupY
    > Phase3
    ");
}

#[test]
fn clear_selection_during_search_keeps_the_search_scope() {
    let mut harness = TestHarness::new();
    harness.select("Phase2/GroupX");
    harness.search("nmap");
    harness.scope_events();

    harness.apply(NavIntent::ClearSelection);

    let scopes = harness.scope_events();
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes[0].source, ScopeSource::Search);
    assert_eq!(scopes[0].resolved_key, "search:nmap");
    assert_eq!(harness.app.current_branch(), Some("Phase2"));
}
