/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Navigation core for a hierarchical catalog browser.
//!
//! `NavigatorApp` owns the navigation state and reduces `NavIntent`s into
//! Branch Memory updates, scope notifications and surface synchronization.
//! `NavigatorRuntime` pairs it with the transition orchestrator.

pub mod app;
pub mod config;
pub mod model;
pub mod persistence;
pub mod registries;
pub mod shell;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{NavIntent, NavigatorApp, TransitionRequest};
pub use config::{ConfigError, NavigatorConfig};
pub use model::taxonomy::{TaxonomyError, TaxonomyModel, TaxonomyPath};
pub use persistence::{
    KeyValueStore, MemoryStore, PersistenceAdapter, PersistenceError, RedbStore,
};
pub use shell::desktop::host::navigator_runtime::{NavigatorRuntime, TransitionSummary};
pub use shell::desktop::runtime::events::{NavEvent, ScopeChanged, ScopeSource};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
