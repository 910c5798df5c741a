/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Navigation state management for the catalog sidebar.
//!
//! `NavigatorApp` is the single owner of navigation state for a session.
//! Input arrives as `NavIntent`s through `apply_intents`; each intent updates
//! Branch Memory or the search layer, resolves the scope, mirrors durable
//! state to persistence and re-synchronizes the visible surfaces. Surfaces are
//! projections and are never read back to make decisions.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use crossbeam_channel::Receiver;
use log::{debug, error, warn};

use crate::config::NavigatorConfig;
use crate::model::branch_memory::BranchMemoryStore;
use crate::model::taxonomy::{TaxonomyModel, TaxonomyPath};
use crate::persistence::{PersistenceAdapter, PersistenceError, PreSearchSnapshot};
use crate::registries::atomic::scope::{CatalogRegistry, ScopeResolution};
use crate::registries::atomic::theme::PhasePalette;
use crate::shell::desktop::runtime::events::{EventBus, NavEvent, ScopeChanged, ScopeSource};
use crate::shell::desktop::ui::hover_overlay::{HoverEffect, HoverOverlay};
use crate::shell::desktop::ui::search_context::SearchContext;
use crate::shell::desktop::ui::search_overlay::{
    RestoreTarget, SearchOverlayController, SearchTransition,
};
use crate::shell::desktop::workbench::surface::{Surface, SurfaceHandle, SurfaceId};
use crate::shell::desktop::workbench::surface_invariants::collect_surface_invariant_violations;
use crate::shell::desktop::workbench::surface_layout::{
    LayoutDebouncer, SurfaceLayout, compute_layout,
};
use crate::shell::desktop::workbench::surface_sync::{SyncReport, sync_surface};
use crate::shell::desktop::workbench::view_state::{SearchView, ViewInputs, ViewState};

/// Prefix of the resolved key carried by search-filtered scope notifications.
pub const SEARCH_SCOPE_PREFIX: &str = "search:";

#[derive(Debug, Clone, PartialEq)]
pub enum NavIntent {
    SelectPath { path: TaxonomyPath },
    ToggleBranch { branch: String },
    ExpandPath { path: TaxonomyPath },
    CollapsePath { path: TaxonomyPath },
    /// Return to the unfiltered view.
    ClearSelection,
    SetSidebarCollapsed { collapsed: bool },
    SearchContext(SearchContext),
    SearchCleared,
    HoverBranchEnter { branch: String },
    HoverBranchLeave,
    HoverOverlayEnter,
    HoverOverlayLeave,
    ResetAll,
    Tick { now: Instant },
}

/// A container that must animate open or closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub surface: SurfaceId,
    pub path: TaxonomyPath,
    pub opening: bool,
}

pub struct NavigatorApp {
    taxonomy: TaxonomyModel,
    registry: CatalogRegistry,
    palette: PhasePalette,
    config: NavigatorConfig,
    memory: BranchMemoryStore,
    /// Branch whose active path drives scope and highlighting.
    current_branch: Option<String>,
    /// Branch toggles open outside of search.
    open_branches: BTreeSet<String>,
    scope: ScopeResolution,
    search: SearchOverlayController,
    sidebar_collapsed: bool,
    hover: HoverOverlay,
    layout: LayoutDebouncer,
    layouts: HashMap<SurfaceId, SurfaceLayout>,
    panel: SurfaceHandle,
    overlay: SurfaceHandle,
    events: EventBus,
    persistence: Option<PersistenceAdapter>,
    last_phase_color: Option<String>,
    pending_transitions: Vec<TransitionRequest>,
    reset_generation: u64,
}

impl NavigatorApp {
    pub fn new(taxonomy: TaxonomyModel, registry: CatalogRegistry, config: NavigatorConfig) -> Self {
        let panel = Surface::panel(&taxonomy, config.row_extent).into_handle();
        let overlay = Surface::overlay(config.row_extent).into_handle();
        let scope = registry.resolve_all();
        Self {
            palette: PhasePalette::from_config(&config),
            hover: HoverOverlay::new(config.hover_open_delay(), config.hover_close_grace()),
            layout: LayoutDebouncer::new(config.layout_debounce()),
            taxonomy,
            registry,
            config,
            memory: BranchMemoryStore::new(),
            current_branch: None,
            open_branches: BTreeSet::new(),
            scope,
            search: SearchOverlayController::new(),
            sidebar_collapsed: false,
            layouts: HashMap::new(),
            panel,
            overlay,
            events: EventBus::new(),
            persistence: None,
            last_phase_color: None,
            pending_transitions: Vec::new(),
            reset_generation: 0,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<NavEvent> {
        self.events.subscribe()
    }

    /// Attach persistence and seed state from what it read at startup. A
    /// snapshot left by a session that ended mid-search wins over the plain
    /// active path; temporary search keys are cleared either way.
    pub fn restore_session(&mut self, persistence: PersistenceAdapter) {
        let state = persistence.startup_state().clone();
        self.persistence = Some(persistence);

        if let Some(snapshot) = state.pre_search {
            debug!("restoring navigation from pre-search snapshot");
            self.apply_snapshot(snapshot);
        } else if let Some(path) = state.active_path {
            let branch = path.branch().to_string();
            self.memory.set_active_path(&branch, Some(path));
            self.open_branches.insert(branch.clone());
            self.current_branch = Some(branch);
        }
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.clear_search_keys();
        }

        if state.sidebar_collapsed {
            self.sidebar_collapsed = true;
            self.events
                .emit(NavEvent::SidebarToggled { collapsed: true });
        }
        self.resolve_scope();
        self.emit_scope(ScopeSource::Restoration);
        self.update_phase_color();
        self.persist_active();
        self.refresh(Instant::now());
    }

    pub fn apply_intents<I>(&mut self, intents: I)
    where
        I: IntoIterator<Item = NavIntent>,
    {
        self.apply_intents_at(Instant::now(), intents);
    }

    /// Like `apply_intents` with an explicit clock for hover and layout
    /// deadlines.
    pub fn apply_intents_at<I>(&mut self, now: Instant, intents: I)
    where
        I: IntoIterator<Item = NavIntent>,
    {
        for intent in intents {
            self.apply_intent(intent, now);
        }
    }

    fn apply_intent(&mut self, intent: NavIntent, now: Instant) {
        match intent {
            NavIntent::SelectPath { path } => self.select_path(path, now),
            NavIntent::ToggleBranch { branch } => self.toggle_branch(&branch, now),
            NavIntent::ExpandPath { path } => self.expand_path(path, now),
            NavIntent::CollapsePath { path } => self.collapse_path(&path, now),
            NavIntent::ClearSelection => self.clear_selection(now),
            NavIntent::SetSidebarCollapsed { collapsed } => {
                self.set_sidebar_collapsed(collapsed, now)
            },
            NavIntent::SearchContext(context) => self.apply_search_context(context, now),
            NavIntent::SearchCleared => {
                let transition = self.search.clear();
                self.finish_search_transition(transition, now);
            },
            NavIntent::HoverBranchEnter { branch } => {
                if self.sidebar_collapsed && self.require_branch(&branch) {
                    self.hover.branch_enter(&branch, now);
                }
            },
            NavIntent::HoverBranchLeave => {
                if self.sidebar_collapsed {
                    self.hover.branch_leave(now);
                }
            },
            NavIntent::HoverOverlayEnter => self.hover.overlay_enter(),
            NavIntent::HoverOverlayLeave => {
                if self.sidebar_collapsed {
                    self.hover.overlay_leave(now);
                }
            },
            NavIntent::ResetAll => self.reset_all(now),
            NavIntent::Tick { now } => self.tick(now),
        }
    }

    fn select_path(&mut self, path: TaxonomyPath, now: Instant) {
        let branch = path.branch().to_string();
        if !self.require_branch(&branch) {
            return;
        }
        if !self.taxonomy.contains(&path) {
            warn!("Ignoring selection of unknown path '{path}'");
            return;
        }

        if let Some(context) = self.search.context() {
            // Narrow the search results; Branch Memory stays frozen.
            let mut event = search_scope(context);
            let within = self.registry.resolve_path(&path).entry_ids;
            event.entry_ids.retain(|id| within.contains(id));
            self.events.emit(NavEvent::ScopeChanged(event));
            return;
        }

        if !self.taxonomy.is_leaf(&path) {
            self.memory.expand(&branch, path.clone());
        }
        self.memory.set_active_path(&branch, Some(path));
        self.open_branches.insert(branch.clone());
        self.current_branch = Some(branch);
        self.resolve_scope();
        self.emit_scope(ScopeSource::UserNavigation);
        self.update_phase_color();
        self.persist_active();
        self.refresh(now);
    }

    fn toggle_branch(&mut self, branch: &str, now: Instant) {
        if !self.require_branch(branch) {
            return;
        }
        if self.search.toggle_branch(branch).is_some() {
            self.persist_search_open_branches();
        } else if !self.open_branches.remove(branch) {
            self.open_branches.insert(branch.to_string());
        }
        self.refresh(now);
    }

    fn expand_path(&mut self, path: TaxonomyPath, now: Instant) {
        let branch = path.branch().to_string();
        if !self.require_branch(&branch) || !self.taxonomy.contains(&path) {
            return;
        }
        if self.search.is_active() {
            debug!("expand of '{path}' ignored while search is active");
            return;
        }
        self.memory.expand(&branch, path);
        self.refresh(now);
    }

    fn collapse_path(&mut self, path: &TaxonomyPath, now: Instant) {
        let branch = path.branch().to_string();
        if !self.require_branch(&branch) {
            return;
        }
        if self.search.is_active() {
            debug!("collapse of '{path}' ignored while search is active");
            return;
        }
        self.memory.collapse_subtree(&branch, path);
        self.refresh(now);
    }

    fn clear_selection(&mut self, now: Instant) {
        if let Some(context) = self.search.context() {
            let event = search_scope(context);
            self.events.emit(NavEvent::ScopeChanged(event));
            return;
        }
        self.current_branch = None;
        self.resolve_scope();
        self.emit_scope(ScopeSource::UserNavigation);
        self.update_phase_color();
        self.persist_active();
        self.refresh(now);
    }

    fn set_sidebar_collapsed(&mut self, collapsed: bool, now: Instant) {
        if self.sidebar_collapsed == collapsed {
            return;
        }
        self.sidebar_collapsed = collapsed;
        self.hover.reset();
        self.overlay.borrow_mut().hide();
        self.events.emit(NavEvent::SidebarToggled { collapsed });
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.save_sidebar_collapsed(collapsed);
        }
        self.refresh(now);
    }

    fn apply_search_context(&mut self, context: SearchContext, now: Instant) {
        let context = context.sanitized(&self.taxonomy);
        let snapshot = self.pre_search_snapshot();
        let transition = self.search.apply_context(context, move || snapshot);
        self.finish_search_transition(transition, now);
    }

    fn finish_search_transition(&mut self, transition: SearchTransition, now: Instant) {
        match transition {
            SearchTransition::Entered => {
                if let Some(persistence) = self.persistence.as_mut()
                    && let Some(snapshot) = self.search.pre_search()
                {
                    persistence.save_pre_search(snapshot);
                }
                self.persist_search_open_branches();
                self.emit_search_scope();
                self.refresh(now);
            },
            SearchTransition::Updated => {
                self.persist_search_open_branches();
                self.emit_search_scope();
                self.refresh(now);
            },
            SearchTransition::Exited(target) => self.restore(target, now),
            SearchTransition::Unchanged => {},
        }
    }

    fn restore(&mut self, target: RestoreTarget, now: Instant) {
        match target {
            RestoreTarget::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            RestoreTarget::Unfiltered => self.current_branch = None,
        }
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.clear_search_keys();
        }
        self.resolve_scope();
        self.emit_scope(ScopeSource::Restoration);
        self.update_phase_color();
        self.persist_active();
        self.refresh(now);
    }

    fn apply_snapshot(&mut self, snapshot: PreSearchSnapshot) {
        if let (Some(branch), Some(path)) = (snapshot.current_branch.as_deref(), snapshot.active_path)
            && path.branch() == branch
        {
            self.memory.set_active_path(branch, Some(path));
        }
        self.current_branch = snapshot.current_branch;
        self.open_branches = snapshot.open_branches;
    }

    /// `None` when navigation is in the unfiltered view.
    fn pre_search_snapshot(&self) -> Option<PreSearchSnapshot> {
        let branch = self.current_branch.as_ref()?;
        Some(PreSearchSnapshot {
            current_branch: Some(branch.clone()),
            active_path: self.memory.active_path(branch).cloned(),
            open_branches: self.open_branches.clone(),
        })
    }

    fn reset_all(&mut self, now: Instant) {
        self.memory.reset_all();
        self.search.reset();
        self.open_branches.clear();
        self.current_branch = None;
        self.hover.reset();
        self.layout.clear();
        self.layouts.clear();
        self.pending_transitions.clear();
        self.panel.borrow_mut().rebuild(&self.taxonomy);
        self.overlay.borrow_mut().rebuild(&self.taxonomy);
        self.reset_generation += 1;
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.clear_search_keys();
        }
        self.resolve_scope();
        self.emit_scope(ScopeSource::UserNavigation);
        self.update_phase_color();
        self.persist_active();
        self.refresh(now);
    }

    fn tick(&mut self, now: Instant) {
        let mut overlay_changed = false;
        for effect in self.hover.tick(now) {
            match effect {
                HoverEffect::Show(branch) => {
                    debug!("hover overlay shows '{branch}'");
                    overlay_changed = true;
                },
                HoverEffect::Hide => {
                    self.overlay.borrow_mut().hide();
                    overlay_changed = true;
                },
            }
        }
        if overlay_changed {
            self.refresh(now);
        }

        for surface in self.layout.take_due(now) {
            if let Some(handle) = self.surface(surface) {
                let layout = compute_layout(&handle.borrow());
                self.layouts.insert(surface, layout);
            }
        }
    }

    /// Programmer error: intents must name a branch the taxonomy defines.
    fn require_branch(&self, branch: &str) -> bool {
        if self.taxonomy.has_branch(branch) {
            return true;
        }
        error!("navigation intent names unknown branch '{branch}'");
        debug_assert!(false, "unknown branch '{branch}'");
        false
    }

    fn resolve_scope(&mut self) {
        self.scope = match self.current_branch.as_deref() {
            Some(branch) => match self.memory.active_path(branch) {
                Some(path) => self.registry.resolve_path(path),
                None => self.registry.resolve(branch),
            },
            None => self.registry.resolve_all(),
        };
    }

    fn emit_scope(&mut self, source: ScopeSource) {
        self.events.emit(NavEvent::ScopeChanged(ScopeChanged {
            resolved_key: self.scope.resolved_key.clone(),
            entry_ids: self.scope.entry_ids.clone(),
            source,
        }));
    }

    fn emit_search_scope(&mut self) {
        if let Some(context) = self.search.context() {
            let event = search_scope(context);
            self.events.emit(NavEvent::ScopeChanged(event));
        }
    }

    fn update_phase_color(&mut self) {
        let color = self.palette.resolve(self.current_branch.as_deref()).color;
        if self.last_phase_color.as_ref() == Some(&color) {
            return;
        }
        self.last_phase_color = Some(color.clone());
        self.events.emit(NavEvent::PhaseColorChanged { color });
    }

    fn persist_active(&mut self) {
        let Some(persistence) = self.persistence.as_mut() else {
            return;
        };
        let active = self
            .current_branch
            .as_deref()
            .and_then(|branch| self.memory.active_path(branch));
        persistence.save_active(active, &self.scope.resolved_key);
    }

    fn persist_search_open_branches(&mut self) {
        if let (Some(persistence), Some(open)) =
            (self.persistence.as_mut(), self.search.open_branches())
        {
            persistence.save_search_open_branches(open);
        }
    }

    pub fn view_state(&self) -> ViewState {
        self.derive_view(None)
    }

    /// `force_open` is added to the live open set; the overlay uses it so its
    /// branch always shows regardless of the panel toggle.
    fn derive_view(&self, force_open: Option<&str>) -> ViewState {
        let mut open = self.open_branches().clone();
        if let Some(branch) = force_open {
            open.insert(branch.to_string());
        }
        ViewState::derive(ViewInputs {
            memory: &self.memory,
            current_branch: self.current_branch.as_deref(),
            open_branches: &open,
            search: self.search.context().map(|context| SearchView {
                context,
                open_branches: &open,
            }),
            scope_count: self
                .current_branch
                .as_ref()
                .map(|_| self.scope.entry_count()),
        })
    }

    /// Re-synchronize every visible surface from a freshly derived view.
    fn refresh(&mut self, now: Instant) {
        if !self.sidebar_collapsed {
            let view = self.view_state();
            let report = sync_surface(&mut self.panel.borrow_mut(), &self.taxonomy, &view);
            let id = self.panel.borrow().id();
            self.queue_transitions(id, report);
            self.layout.request(id, now);
            self.check_invariants(&self.panel);
        }

        if let Some(branch) = self.hover.shown_branch().map(str::to_string) {
            let ghost = self.search.ghost_paths(&branch);
            let view = self.derive_view(Some(&branch));
            let report = {
                let mut overlay = self.overlay.borrow_mut();
                overlay.retarget(&self.taxonomy, &branch, ghost);
                sync_surface(&mut overlay, &self.taxonomy, &view)
            };
            let id = self.overlay.borrow().id();
            self.queue_transitions(id, report);
            self.layout.request(id, now);
            self.check_invariants(&self.overlay);
        }
    }

    fn queue_transitions(&mut self, surface: SurfaceId, report: SyncReport) {
        let SyncReport { opened, closed, .. } = report;
        self.pending_transitions.extend(opened.into_iter().map(|path| TransitionRequest {
            surface,
            path,
            opening: true,
        }));
        self.pending_transitions.extend(closed.into_iter().map(|path| TransitionRequest {
            surface,
            path,
            opening: false,
        }));
    }

    fn check_invariants(&self, surface: &SurfaceHandle) {
        if !cfg!(debug_assertions) {
            return;
        }
        for violation in collect_surface_invariant_violations(&surface.borrow()) {
            warn!("{violation}");
        }
    }

    pub fn request_layout(&mut self, surface: SurfaceId, now: Instant) {
        self.layout.request(surface, now);
    }

    pub fn take_transition_requests(&mut self) -> Vec<TransitionRequest> {
        std::mem::take(&mut self.pending_transitions)
    }

    /// Bumped on every `ResetAll`; transition drivers cancel in-flight work
    /// when it changes.
    pub fn reset_generation(&self) -> u64 {
        self.reset_generation
    }

    pub fn flush_persistence(&self) -> Result<(), PersistenceError> {
        match self.persistence.as_ref() {
            Some(persistence) => persistence.flush(),
            None => Ok(()),
        }
    }

    pub fn taxonomy(&self) -> &TaxonomyModel {
        &self.taxonomy
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn memory(&self) -> &BranchMemoryStore {
        &self.memory
    }

    pub fn current_branch(&self) -> Option<&str> {
        self.current_branch.as_deref()
    }

    pub fn active_path(&self) -> Option<&TaxonomyPath> {
        self.current_branch
            .as_deref()
            .and_then(|branch| self.memory.active_path(branch))
    }

    /// Branches open right now: the search layer's set while searching.
    pub fn open_branches(&self) -> &BTreeSet<String> {
        self.search.open_branches().unwrap_or(&self.open_branches)
    }

    pub fn scope(&self) -> &ScopeResolution {
        &self.scope
    }

    pub fn search(&self) -> &SearchOverlayController {
        &self.search
    }

    pub fn is_search_active(&self) -> bool {
        self.search.is_active()
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    pub fn hover(&self) -> &HoverOverlay {
        &self.hover
    }

    pub fn panel(&self) -> SurfaceHandle {
        self.panel.clone()
    }

    pub fn overlay(&self) -> SurfaceHandle {
        self.overlay.clone()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<SurfaceHandle> {
        [&self.panel, &self.overlay]
            .into_iter()
            .find(|handle| handle.borrow().id() == id)
            .cloned()
    }

    pub fn layout(&self, surface: SurfaceId) -> Option<&SurfaceLayout> {
        self.layouts.get(&surface)
    }

    pub fn phase_color(&self) -> Option<&str> {
        self.last_phase_color.as_deref()
    }
}

fn search_scope(context: &SearchContext) -> ScopeChanged {
    ScopeChanged {
        resolved_key: format!("{SEARCH_SCOPE_PREFIX}{}", context.query.trim()),
        entry_ids: context.matched_entry_ids.clone(),
        source: ScopeSource::Search,
    }
}
