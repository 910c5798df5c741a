/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use catalogshell::VERSION;
use catalogshell::registries::atomic::ScopeWatcher;
use catalogshell::shell::desktop::runtime::events::drain;
use catalogshell::test_utils::{path, sample_app, sample_registry, sample_search, sample_taxonomy};
use catalogshell::{
    NavEvent, NavIntent, NavigatorRuntime, PersistenceAdapter, RedbStore, ScopeSource,
};

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

#[test]
fn unknown_category_resolves_to_empty_fallback_scope() {
    let resolution = sample_registry().resolve("UnknownPhase/Nope");

    assert!(resolution.entry_ids.is_empty());
    assert!(!resolution.matched);
    assert!(resolution.fallback_used);
    assert_eq!(resolution.resolved_key, "unknownphase/nope");
}

#[test]
fn scope_watcher_ignores_repeated_notifications() {
    let mut app = sample_app();
    let rx = app.subscribe();
    app.apply_intents([
        NavIntent::SelectPath {
            path: path("Phase2/GroupX"),
        },
        NavIntent::SelectPath {
            path: path("Phase2/GroupX"),
        },
        NavIntent::SelectPath {
            path: path("Phase3/GroupZ"),
        },
    ]);

    let mut watcher = ScopeWatcher::new();
    let changes = drain(&rx)
        .iter()
        .filter_map(|event| match event {
            NavEvent::ScopeChanged(scope) => Some(watcher.observe(scope)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(changes, vec![true, false, true]);
}

#[test]
fn search_round_trip_through_public_api() {
    let mut app = sample_app();
    app.apply_intents([NavIntent::SelectPath {
        path: path("Phase1/GroupA"),
    }]);
    let before = app.view_state();
    let rx = app.subscribe();

    app.apply_intents([
        NavIntent::SearchContext(sample_search("nmap")),
        NavIntent::SearchCleared,
    ]);

    assert_eq!(app.view_state(), before);
    let sources: Vec<ScopeSource> = drain(&rx)
        .into_iter()
        .filter_map(|event| match event {
            NavEvent::ScopeChanged(scope) => Some(scope.source),
            _ => None,
        })
        .collect();
    assert_eq!(sources, vec![ScopeSource::Search, ScopeSource::Restoration]);
}

#[test]
fn redb_session_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nav").join("state.redb");
    let taxonomy = sample_taxonomy();

    {
        let store = RedbStore::open(&db_path).expect("open redb");
        let adapter = PersistenceAdapter::open(Box::new(store), &taxonomy).expect("adapter");
        let mut app = sample_app();
        app.restore_session(adapter);
        app.apply_intents([
            NavIntent::SelectPath {
                path: path("Phase2/GroupY/Deep"),
            },
            NavIntent::SetSidebarCollapsed { collapsed: true },
        ]);
        app.flush_persistence().expect("flush");
    }

    let store = RedbStore::open(&db_path).expect("reopen redb");
    let adapter = PersistenceAdapter::open(Box::new(store), &taxonomy).expect("adapter");
    let mut app = sample_app();
    app.restore_session(adapter);

    assert!(app.sidebar_collapsed());
    assert_eq!(app.active_path(), Some(&path("Phase2/GroupY/Deep")));
    assert_eq!(app.scope().entry_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn runtime_drives_queued_transitions_to_completion() {
    let mut runtime = NavigatorRuntime::new(sample_app());
    runtime.apply_intents([NavIntent::SelectPath {
        path: path("Phase1/GroupA/Sub1"),
    }]);

    let summary = runtime.drive_transitions().await;

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.superseded + summary.cancelled, 0);
    let panel = runtime.app().panel();
    assert!(panel.borrow().in_flight(&path("Phase1/GroupA")).is_none());
    assert_eq!(panel.borrow().active_nodes(), vec![&path("Phase1/GroupA/Sub1")]);
}
