/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use super::super::harness::TestHarness;
use crate::persistence::MemoryStore;
use crate::persistence::types::{
    KEY_ACTIVE_KEY, KEY_ACTIVE_PATH, KEY_PRE_SEARCH, KEY_SEARCH_OPEN_BRANCHES,
    KEY_SIDEBAR_COLLAPSED,
};
use crate::shell::desktop::runtime::events::{NavEvent, ScopeSource};
use crate::test_utils::path;

#[test]
fn session_ended_mid_search_restores_pre_search_navigation() {
    let store = MemoryStore::new();
    {
        let mut first = TestHarness::restored_from(&store);
        first.select("Phase1/GroupB");
        first.search("nmap");
        first.app.flush_persistence().expect("flush");

        let saved = store.snapshot();
        assert!(saved.contains_key(KEY_PRE_SEARCH));
        assert_eq!(
            saved.get(KEY_SEARCH_OPEN_BRANCHES).map(String::as_str),
            Some(r#"["Phase2"]"#)
        );
        assert_eq!(
            saved.get(KEY_ACTIVE_PATH).map(String::as_str),
            Some("Phase1/GroupB")
        );
    }

    let second = TestHarness::restored_from(&store);
    second.app.flush_persistence().expect("flush");

    assert_eq!(second.app.active_path(), Some(&path("Phase1/GroupB")));
    assert!(!second.app.is_search_active());
    let saved = store.snapshot();
    assert!(!saved.contains_key(KEY_PRE_SEARCH));
    assert!(!saved.contains_key(KEY_SEARCH_OPEN_BRANCHES));

    let scopes = second.scope_events();
    assert_eq!(scopes[0].source, ScopeSource::Restoration);
    assert_eq!(scopes[0].resolved_key, "phase1/groupb");
}

#[test]
fn collapsed_sidebar_restores_collapsed_and_syncs_on_expand() {
    let store = MemoryStore::with_values([
        (KEY_SIDEBAR_COLLAPSED, "true"),
        (KEY_ACTIVE_PATH, "Phase2/GroupX"),
    ]);
    let mut harness = TestHarness::restored_from(&store);

    assert!(harness.app.sidebar_collapsed());
    assert!(
        harness
            .events()
            .contains(&NavEvent::SidebarToggled { collapsed: true })
    );
    insta::assert_snapshot!(harness.panel_outline(), @r"
    > Phase1
    > Phase2
    > Phase3
    ");

    harness.set_collapsed(false);

    insta::assert_snapshot!(harness.panel_outline(), @r"
    > Phase1
    v Phase2 [path] [desc] (2)
      - GroupX [active] [path]
      > GroupY
    > Phase3
    ");
}

#[test]
fn stale_active_path_falls_back_to_unfiltered() {
    let store = MemoryStore::with_values([
        (KEY_ACTIVE_PATH, "Phase9/Gone"),
        (KEY_ACTIVE_KEY, "phase9/gone"),
    ]);
    let harness = TestHarness::restored_from(&store);
    harness.app.flush_persistence().expect("flush");

    assert_eq!(harness.app.current_branch(), None);
    assert_eq!(harness.app.scope().resolved_key, "all");
    let saved = store.snapshot();
    assert_eq!(saved.get(KEY_ACTIVE_PATH), None);
    assert_eq!(saved.get(KEY_ACTIVE_KEY).map(String::as_str), Some("all"));
}
