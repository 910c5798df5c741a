/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Outbound notifications for collaborators (content grid, theming, layout).
//!
//! Subscribers receive events over `crossbeam-channel` receivers; a dropped
//! receiver is pruned on the next emit.

use std::collections::BTreeSet;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;

use crate::registries::atomic::scope::EntryId;

pub const CHANNEL_SCOPE_CHANGED: &str = "scope:changed";
pub const CHANNEL_PHASE_COLOR_CHANGED: &str = "phase:colorChanged";
pub const CHANNEL_SIDEBAR_TOGGLED: &str = "sidebar:toggled";

/// Why a scope notification was emitted. Collaborators skip re-animating on
/// `Restoration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ScopeSource {
    UserNavigation,
    Restoration,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScopeChanged {
    pub resolved_key: String,
    pub entry_ids: BTreeSet<EntryId>,
    pub source: ScopeSource,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NavEvent {
    ScopeChanged(ScopeChanged),
    PhaseColorChanged { color: String },
    SidebarToggled { collapsed: bool },
}

impl NavEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::ScopeChanged(_) => CHANNEL_SCOPE_CHANGED,
            Self::PhaseColorChanged { .. } => CHANNEL_PHASE_COLOR_CHANGED,
            Self::SidebarToggled { .. } => CHANNEL_SIDEBAR_TOGGLED,
        }
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<NavEvent>>,
    emitted: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<NavEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: NavEvent) {
        debug!("emit {} {:?}", event.channel(), event);
        self.emitted = self.emitted.saturating_add(1);
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Drain everything currently buffered on a subscription.
pub fn drain(rx: &Receiver<NavEvent>) -> Vec<NavEvent> {
    rx.try_iter().collect()
}
