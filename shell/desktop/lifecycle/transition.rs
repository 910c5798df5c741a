/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Open/close transition sequencing.
//!
//! Every container carries a monotonic operation token. Starting a
//! transition bumps the token; a transition resolves on the first of the view
//! layer's completion signal or a fallback deadline, and only acts if its
//! token is still current. A superseded transition resolves as a no-op.
//!
//! For a closing transition the container's rows are removed inside the
//! completion handler, never before.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::join_all;
use log::debug;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::model::taxonomy::TaxonomyPath;
use crate::shell::desktop::workbench::surface::SurfaceId;

/// What the orchestrator needs from a rendered surface.
pub trait TransitionView {
    /// Natural extent of the container's content; `None` if it does not exist.
    fn measure_extent(&self, container: &TaxonomyPath) -> Option<f32>;
    fn begin_transition(&mut self, container: &TaxonomyPath, opening: bool, target_extent: f32);
    /// Called exactly once per transition that was not superseded or cancelled.
    fn complete_transition(&mut self, container: &TaxonomyPath, opening: bool);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerKey {
    pub surface: SurfaceId,
    pub path: TaxonomyPath,
}

impl ContainerKey {
    pub fn new(surface: SurfaceId, path: TaxonomyPath) -> Self {
        Self { surface, path }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    Signal,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Completed(CompletionSource),
    Superseded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionStats {
    pub started: u64,
    pub by_signal: u64,
    pub by_fallback: u64,
    pub superseded: u64,
    pub cancelled: u64,
}

#[derive(Debug)]
struct OrchestratorState {
    tokens: HashMap<ContainerKey, u64>,
    waiters: HashMap<ContainerKey, (u64, oneshot::Sender<()>)>,
    cancel: CancellationToken,
    stats: TransitionStats,
}

/// Cheap to clone; clones share tokens and waiters. Single-threaded.
#[derive(Debug, Clone)]
pub struct AnimationOrchestrator {
    state: Rc<RefCell<OrchestratorState>>,
    fallback: Duration,
}

impl AnimationOrchestrator {
    pub fn new(fallback: Duration) -> Self {
        Self {
            state: Rc::new(RefCell::new(OrchestratorState {
                tokens: HashMap::new(),
                waiters: HashMap::new(),
                cancel: CancellationToken::new(),
                stats: TransitionStats::default(),
            })),
            fallback,
        }
    }

    pub fn fallback(&self) -> Duration {
        self.fallback
    }

    pub fn stats(&self) -> TransitionStats {
        self.state.borrow().stats
    }

    pub fn current_token(&self, key: &ContainerKey) -> Option<u64> {
        self.state.borrow().tokens.get(key).copied()
    }

    pub fn measure<V: TransitionView>(view: &RefCell<V>, container: &TaxonomyPath) -> f32 {
        view.borrow().measure_extent(container).unwrap_or(0.0)
    }

    /// Bump the container's token and start the transition toward an already
    /// measured extent. Any transition pending on the same container becomes
    /// stale.
    pub fn start<V: TransitionView>(
        &self,
        view: Rc<RefCell<V>>,
        key: ContainerKey,
        opening: bool,
        target_extent: f32,
    ) -> PendingTransition<V> {
        let (tx, rx) = oneshot::channel();
        let (token, cancel) = {
            let mut state = self.state.borrow_mut();
            let token = state
                .tokens
                .entry(key.clone())
                .and_modify(|token| *token += 1)
                .or_insert(1);
            let token = *token;
            // Replacing the sender wakes the previous waiter as superseded.
            state.waiters.insert(key.clone(), (token, tx));
            state.stats.started += 1;
            (token, state.cancel.clone())
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(container = %key.path, surface = %key.surface, token, opening, "transition start");
        view.borrow_mut()
            .begin_transition(&key.path, opening, target_extent);

        PendingTransition {
            orchestrator: self.clone(),
            view,
            key,
            token,
            opening,
            target_extent,
            signal: rx,
            cancel,
        }
    }

    /// Measure, start and await one transition.
    pub async fn transition<V: TransitionView>(
        &self,
        view: Rc<RefCell<V>>,
        key: ContainerKey,
        opening: bool,
    ) -> TransitionOutcome {
        let extent = Self::measure(&view, &key.path);
        self.start(view, key, opening, extent).finish().await
    }

    /// Close many independent containers together: every extent is measured
    /// before any transition starts, all start in the same tick, and the
    /// batch resolves once every member has.
    pub async fn close_batch<V: TransitionView>(
        &self,
        view: Rc<RefCell<V>>,
        surface: SurfaceId,
        containers: &[TaxonomyPath],
    ) -> Vec<TransitionOutcome> {
        let pending = self.start_close_batch(view, surface, containers);
        join_all(pending.into_iter().map(PendingTransition::finish)).await
    }

    /// Synchronous half of `close_batch`.
    pub fn start_close_batch<V: TransitionView>(
        &self,
        view: Rc<RefCell<V>>,
        surface: SurfaceId,
        containers: &[TaxonomyPath],
    ) -> Vec<PendingTransition<V>> {
        let extents: Vec<f32> = containers
            .iter()
            .map(|path| Self::measure(&view, path))
            .collect();
        containers
            .iter()
            .zip(extents)
            .map(|(path, extent)| {
                self.start(
                    Rc::clone(&view),
                    ContainerKey::new(surface, path.clone()),
                    false,
                    extent,
                )
            })
            .collect()
    }

    /// Deliver the view layer's completion signal. Returns false when nothing
    /// is waiting on `key`.
    pub fn signal_complete(&self, key: &ContainerKey) -> bool {
        let waiter = self.state.borrow_mut().waiters.remove(key);
        match waiter {
            Some((_, tx)) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Resolve every pending transition as cancelled without touching views.
    pub fn cancel_all(&self) {
        let mut state = self.state.borrow_mut();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.waiters.clear();
    }

    fn is_current(&self, key: &ContainerKey, token: u64) -> bool {
        self.state.borrow().tokens.get(key) == Some(&token)
    }

    fn settle(&self, key: &ContainerKey, token: u64, outcome: TransitionOutcome) {
        let mut state = self.state.borrow_mut();
        if state
            .waiters
            .get(key)
            .is_some_and(|(waiting, _)| *waiting == token)
        {
            state.waiters.remove(key);
        }
        match outcome {
            TransitionOutcome::Completed(CompletionSource::Signal) => state.stats.by_signal += 1,
            TransitionOutcome::Completed(CompletionSource::Fallback) => {
                state.stats.by_fallback += 1
            },
            TransitionOutcome::Superseded => state.stats.superseded += 1,
            TransitionOutcome::Cancelled => state.stats.cancelled += 1,
        }
    }
}

enum Fired {
    Signal,
    Fallback,
    Replaced,
    Cancelled,
}

/// A started transition. Awaiting `finish` resolves it exactly once.
pub struct PendingTransition<V: TransitionView> {
    orchestrator: AnimationOrchestrator,
    view: Rc<RefCell<V>>,
    key: ContainerKey,
    token: u64,
    opening: bool,
    target_extent: f32,
    signal: oneshot::Receiver<()>,
    cancel: CancellationToken,
}

impl<V: TransitionView> PendingTransition<V> {
    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn target_extent(&self) -> f32 {
        self.target_extent
    }

    pub async fn finish(self) -> TransitionOutcome {
        let Self {
            orchestrator,
            view,
            key,
            token,
            opening,
            signal,
            cancel,
            ..
        } = self;

        let fired = tokio::select! {
            biased;
            _ = cancel.cancelled() => Fired::Cancelled,
            received = signal => match received {
                Ok(()) => Fired::Signal,
                Err(_) => Fired::Replaced,
            },
            _ = tokio::time::sleep(orchestrator.fallback) => Fired::Fallback,
        };

        let outcome = match fired {
            Fired::Cancelled => TransitionOutcome::Cancelled,
            Fired::Replaced => TransitionOutcome::Superseded,
            Fired::Signal | Fired::Fallback if !orchestrator.is_current(&key, token) => {
                debug!(
                    "stale transition completion on {} (token {token})",
                    key.path
                );
                TransitionOutcome::Superseded
            },
            Fired::Signal => TransitionOutcome::Completed(CompletionSource::Signal),
            Fired::Fallback => TransitionOutcome::Completed(CompletionSource::Fallback),
        };

        if let TransitionOutcome::Completed(source) = outcome {
            if matches!(source, CompletionSource::Fallback) {
                debug!("transition on {} resolved by fallback deadline", key.path);
            }
            view.borrow_mut().complete_transition(&key.path, opening);
        }
        orchestrator.settle(&key, token, outcome);
        outcome
    }
}
