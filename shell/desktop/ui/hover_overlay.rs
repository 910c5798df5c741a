/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Hover-triggered flyout for the collapsed panel.
//!
//! Opening waits `open_delay` so sweeping the pointer across toggles does not
//! flash every branch. Closing waits `close_grace` so a short excursion off
//! the toggle or flyout does not flicker it shut. Both are deadlines in a
//! `TimerRegistry` keyed by the element that armed them.

use std::time::{Duration, Instant};

use crate::shell::desktop::runtime::timers::TimerRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Pending open, keyed by the branch toggle being hovered.
    HoverOpen(String),
    /// Pending close of the flyout.
    HoverClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEffect {
    Show(String),
    Hide,
}

#[derive(Debug, Clone)]
pub struct HoverOverlay {
    timers: TimerRegistry<TimerKey>,
    open_delay: Duration,
    close_grace: Duration,
    shown: Option<String>,
}

impl HoverOverlay {
    pub fn new(open_delay: Duration, close_grace: Duration) -> Self {
        Self {
            timers: TimerRegistry::new(),
            open_delay,
            close_grace,
            shown: None,
        }
    }

    pub fn shown_branch(&self) -> Option<&str> {
        self.shown.as_deref()
    }

    /// Branch whose open delay is currently running.
    pub fn pending_open(&self) -> Option<&str> {
        self.timers.keys().find_map(|key| match key {
            TimerKey::HoverOpen(branch) => Some(branch.as_str()),
            TimerKey::HoverClose => None,
        })
    }

    pub fn is_close_pending(&self) -> bool {
        self.timers.is_armed(&TimerKey::HoverClose)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn branch_enter(&mut self, branch: &str, now: Instant) {
        self.timers.cancel(&TimerKey::HoverClose);
        self.timers
            .cancel_where(|key| matches!(key, TimerKey::HoverOpen(other) if other != branch));
        if self.shown.as_deref() == Some(branch) {
            return;
        }
        let key = TimerKey::HoverOpen(branch.to_string());
        if !self.timers.is_armed(&key) {
            self.timers.arm(key, now + self.open_delay);
        }
    }

    pub fn branch_leave(&mut self, now: Instant) {
        self.timers
            .cancel_where(|key| matches!(key, TimerKey::HoverOpen(_)));
        self.arm_close(now);
    }

    pub fn overlay_enter(&mut self) {
        self.timers.cancel(&TimerKey::HoverClose);
    }

    pub fn overlay_leave(&mut self, now: Instant) {
        self.arm_close(now);
    }

    fn arm_close(&mut self, now: Instant) {
        if self.shown.is_some() {
            self.timers.arm(TimerKey::HoverClose, now + self.close_grace);
        }
    }

    /// Fire every due timer, earliest first.
    pub fn tick(&mut self, now: Instant) -> Vec<HoverEffect> {
        let mut effects = Vec::new();
        for key in self.timers.take_due(now) {
            match key {
                TimerKey::HoverOpen(branch) => {
                    self.shown = Some(branch.clone());
                    effects.push(HoverEffect::Show(branch));
                },
                TimerKey::HoverClose => {
                    if self.shown.take().is_some() {
                        effects.push(HoverEffect::Hide);
                    }
                },
            }
        }
        effects
    }

    /// Drop the flyout and every pending timer.
    pub fn reset(&mut self) -> bool {
        self.timers.clear();
        self.shown.take().is_some()
    }
}
