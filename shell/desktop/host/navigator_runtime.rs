/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Host-side driver pairing the navigation reducer with the transition
//! orchestrator. Intents go through `apply_intents`; container changes the
//! reducer queued are then turned into awaited transitions.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::rc::Rc;
use std::time::Instant;

use futures_util::future::join_all;
use log::{debug, warn};

use crate::app::{NavIntent, NavigatorApp, TransitionRequest};
use crate::model::taxonomy::TaxonomyPath;
use crate::shell::desktop::lifecycle::transition::{
    AnimationOrchestrator, ContainerKey, PendingTransition, TransitionOutcome,
};
use crate::shell::desktop::workbench::surface::{Surface, SurfaceId};

/// How a round of dispatched transitions resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionSummary {
    pub completed: usize,
    pub superseded: usize,
    pub cancelled: usize,
    /// Surfaces that had at least one transition in the round.
    pub surfaces: BTreeSet<SurfaceId>,
}

impl TransitionSummary {
    fn record(&mut self, outcome: TransitionOutcome) {
        match outcome {
            TransitionOutcome::Completed(_) => self.completed += 1,
            TransitionOutcome::Superseded => self.superseded += 1,
            TransitionOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Default)]
struct SurfaceRequests {
    opening: Vec<TaxonomyPath>,
    closing: Vec<TaxonomyPath>,
}

/// Collapse the queue to its last request per `(surface, path)`, keeping
/// queue order among the survivors.
fn latest_per_container(requests: Vec<TransitionRequest>) -> Vec<TransitionRequest> {
    let mut latest: Vec<TransitionRequest> = Vec::with_capacity(requests.len());
    for request in requests {
        if let Some(index) = latest
            .iter()
            .position(|queued| queued.surface == request.surface && queued.path == request.path)
        {
            let dropped = latest.remove(index);
            debug!(
                "dropping stale {} request for {} on {}",
                if dropped.opening { "open" } else { "close" },
                dropped.path,
                dropped.surface
            );
        }
        latest.push(request);
    }
    latest
}

pub struct NavigatorRuntime {
    app: NavigatorApp,
    orchestrator: AnimationOrchestrator,
    seen_reset_generation: u64,
}

impl NavigatorRuntime {
    pub fn new(app: NavigatorApp) -> Self {
        let orchestrator = AnimationOrchestrator::new(app.config().transition_fallback());
        let seen_reset_generation = app.reset_generation();
        Self {
            app,
            orchestrator,
            seen_reset_generation,
        }
    }

    pub fn app(&self) -> &NavigatorApp {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut NavigatorApp {
        &mut self.app
    }

    /// Shared handle for delivering completion signals from the view layer.
    pub fn orchestrator(&self) -> AnimationOrchestrator {
        self.orchestrator.clone()
    }

    pub fn apply_intents<I>(&mut self, intents: I)
    where
        I: IntoIterator<Item = NavIntent>,
    {
        self.app.apply_intents(intents);
        self.cancel_if_reset();
    }

    pub fn apply_intents_at<I>(&mut self, now: Instant, intents: I)
    where
        I: IntoIterator<Item = NavIntent>,
    {
        self.app.apply_intents_at(now, intents);
        self.cancel_if_reset();
    }

    fn cancel_if_reset(&mut self) {
        let generation = self.app.reset_generation();
        if generation != self.seen_reset_generation {
            debug!("navigation reset; cancelling in-flight transitions");
            self.orchestrator.cancel_all();
            self.seen_reset_generation = generation;
        }
    }

    /// Start every queued transition now and return a future resolving when
    /// all of them have. Only the last request queued for a container is
    /// started, since the surface already reflects it. Closes on one surface
    /// are measured together before any of them starts.
    pub fn dispatch_transitions(&mut self) -> impl Future<Output = TransitionSummary> + 'static {
        let mut by_surface: BTreeMap<SurfaceId, SurfaceRequests> = BTreeMap::new();
        for TransitionRequest {
            surface,
            path,
            opening,
        } in latest_per_container(self.app.take_transition_requests())
        {
            let requests = by_surface.entry(surface).or_default();
            if opening {
                requests.opening.push(path);
            } else {
                requests.closing.push(path);
            }
        }

        let mut pending: Vec<PendingTransition<Surface>> = Vec::new();
        let mut surfaces = BTreeSet::new();
        for (surface, requests) in by_surface {
            let Some(handle) = self.app.surface(surface) else {
                warn!("dropping transitions for retired surface {surface}");
                continue;
            };
            surfaces.insert(surface);

            pending.extend(self.orchestrator.start_close_batch(
                Rc::clone(&handle),
                surface,
                &requests.closing,
            ));
            for path in requests.opening {
                let extent = AnimationOrchestrator::measure(&handle, &path);
                pending.push(self.orchestrator.start(
                    Rc::clone(&handle),
                    ContainerKey::new(surface, path),
                    true,
                    extent,
                ));
            }
        }

        async move {
            let mut summary = TransitionSummary {
                surfaces,
                ..TransitionSummary::default()
            };
            for outcome in join_all(pending.into_iter().map(PendingTransition::finish)).await {
                summary.record(outcome);
            }
            summary
        }
    }

    /// Dispatch and await queued transitions, then schedule a layout pass on
    /// every surface they touched.
    pub async fn drive_transitions(&mut self) -> TransitionSummary {
        let summary = self.dispatch_transitions().await;
        let now = Instant::now();
        for surface in &summary.surfaces {
            self.app.request_layout(*surface, now);
        }
        summary
    }

    /// Completion signal from the view layer for one container.
    pub fn signal_transition_end(&self, surface: SurfaceId, path: TaxonomyPath) -> bool {
        self.orchestrator
            .signal_complete(&ContainerKey::new(surface, path))
    }
}
