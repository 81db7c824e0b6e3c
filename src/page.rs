//! Page - owns the host, modifiers, navigation and every surface
//!
//! The page is the single writer of all engine state. `run_tick` is the only
//! place where time advances:
//!
//! 1. rebuild navigation from the host (plus scroll-link)
//! 2. per surface FX housekeeping (selection teardown, stale slots, focus)
//! 3. drain input events, refreshing binding selection and applying zone
//!    commands after each one
//! 4. run deferred (hold-delay) actions
//! 5. push feedback

use crate::action::ActionRegistry;
use crate::config::PageConfig;
use crate::host::HostApi;
use crate::modifiers::ModifierManager;
use crate::navigation::{NavigationSnapshot, TrackNavigationManager};
use crate::zones::{Dispatch, PageContext, SurfaceSnapshot, ZoneManager};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Kind of input carried by an [`InputEvent`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    /// Fader position or button press (non-zero) / release (zero)
    Absolute(f64),
    /// Signed relative step, optionally with an acceleration index
    Relative { delta: f64, acceleration: Option<usize> },
    /// Raw encoder byte, decoded with the widget's acceleration table
    RelativeRaw(u8),
    /// Touch sensor (non-zero = touched)
    Touch(f64),
}

/// Normalised input coming from a transport layer
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// Target surface; `None` picks the first surface owning the widget
    pub surface: Option<String>,
    pub widget: String,
    pub kind: InputKind,
}

impl InputEvent {
    pub fn new(widget: impl Into<String>, kind: InputKind) -> Self {
        Self {
            surface: None,
            widget: widget.into(),
            kind,
        }
    }

    pub fn on_surface(mut self, surface: impl Into<String>) -> Self {
        self.surface = Some(surface.into());
        self
    }
}

/// Serializable page state (`--check`, REPL `status`)
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub name: String,
    pub modifiers: Vec<&'static str>,
    pub modifier_value: u32,
    pub navigation: NavigationSnapshot,
    pub surfaces: Vec<SurfaceSnapshot>,
}

/// One page of surfaces bound to one host
pub struct Page {
    name: String,
    host: Box<dyn HostApi>,
    modifiers: ModifierManager,
    navigation: TrackNavigationManager,
    surfaces: Vec<ZoneManager>,
    registry: Arc<ActionRegistry>,
}

impl Page {
    /// Build a page from its configuration
    pub fn from_config(config: &PageConfig, host: Box<dyn HostApi>) -> Self {
        let registry = Arc::new(ActionRegistry::new());
        let modifiers = ModifierManager::new(Duration::from_millis(config.latch_time_ms));
        let mut page = Self {
            name: config.name.clone(),
            host,
            modifiers,
            navigation: TrackNavigationManager::new(0),
            surfaces: Vec::new(),
            registry,
        };
        page.build(config);
        info!("📄 Page '{}' ready: {} surface(s)", page.name, page.surfaces.len());
        page
    }

    fn build(&mut self, config: &PageConfig) {
        let mut navigation = TrackNavigationManager::new(config.channel_window());
        navigation.configure_scroll_link(config.scroll_link.enabled, config.scroll_link.target_channel);
        navigation.rebuild(&*self.host);
        self.navigation = navigation;

        let squelch = Duration::from_millis(config.feedback_squelch_ms);
        self.surfaces = config
            .surfaces
            .iter()
            .map(|surface| ZoneManager::from_config(surface, squelch, self.registry.clone()))
            .collect();
        for surface in &mut self.surfaces {
            surface.update_modifier_selection(&self.modifiers);
        }
    }

    /// Rebuild surfaces from a new configuration
    ///
    /// The host and modifier latches are kept; navigation offsets, mode and
    /// spill state carry over.
    pub fn reload(&mut self, config: &PageConfig) {
        let previous = std::mem::replace(&mut self.navigation, TrackNavigationManager::new(0));
        self.name = config.name.clone();
        self.build(config);
        self.navigation.inherit_from(&previous);
        self.navigation.rebuild(&*self.host);
        info!("🔄 Page '{}' rebuilt: {} surface(s)", self.name, self.surfaces.len());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &dyn HostApi {
        &*self.host
    }

    pub fn host_mut(&mut self) -> &mut dyn HostApi {
        &mut *self.host
    }

    pub fn modifiers(&self) -> &ModifierManager {
        &self.modifiers
    }

    pub fn navigation(&self) -> &TrackNavigationManager {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut TrackNavigationManager {
        &mut self.navigation
    }

    pub fn surfaces(&self) -> &[ZoneManager] {
        &self.surfaces
    }

    pub fn surface(&self, name: &str) -> Option<&ZoneManager> {
        self.surfaces.iter().find(|s| s.name() == name)
    }

    pub fn surface_mut(&mut self, name: &str) -> Option<&mut ZoneManager> {
        self.surfaces.iter_mut().find(|s| s.name() == name)
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Run one tick; returns how many events were consumed
    pub fn run_tick(&mut self, events: impl IntoIterator<Item = InputEvent>, now: Instant) -> usize {
        self.navigation.rebuild(&*self.host);
        self.navigation.force_scroll_link(&*self.host);

        for surface in &mut self.surfaces {
            surface.refresh_fx_state(&*self.host, &self.navigation);
        }

        let mut consumed = 0;
        for event in events {
            if self.handle_event(&event, now).is_consumed() {
                consumed += 1;
            }
        }

        let mut ctx = PageContext {
            host: &mut *self.host,
            navigation: &mut self.navigation,
            modifiers: &mut self.modifiers,
            now,
        };
        for surface in &mut self.surfaces {
            surface.run_deferred_actions(&mut ctx);
            surface.apply_commands(&mut ctx);
        }
        for surface in &mut self.surfaces {
            surface.request_update(&mut ctx);
        }
        trace!("Tick done: {} event(s) consumed", consumed);
        consumed
    }

    fn surface_index(&self, event: &InputEvent) -> Option<usize> {
        match &event.surface {
            Some(name) => self.surfaces.iter().position(|s| s.name() == name),
            None => self
                .surfaces
                .iter()
                .position(|s| s.widget_id(&event.widget).is_some()),
        }
    }

    /// Dispatch one event and settle its consequences
    fn handle_event(&mut self, event: &InputEvent, now: Instant) -> Dispatch {
        let Some(index) = self.surface_index(event) else {
            debug!("No surface for widget '{}'", event.widget);
            return Dispatch::NotConsumed;
        };
        let surface = &mut self.surfaces[index];
        let Some(widget) = surface.widget_id(&event.widget) else {
            debug!("{}: unknown widget '{}'", surface.name(), event.widget);
            return Dispatch::NotConsumed;
        };

        let mut ctx = PageContext {
            host: &mut *self.host,
            navigation: &mut self.navigation,
            modifiers: &mut self.modifiers,
            now,
        };
        let result = match event.kind {
            InputKind::Absolute(value) => surface.do_action(&mut ctx, widget, value),
            InputKind::Relative {
                delta,
                acceleration: Some(acceleration),
            } => surface.do_accelerated_relative_action(&mut ctx, widget, acceleration, delta),
            InputKind::Relative {
                delta,
                acceleration: None,
            } => surface.do_relative_action(&mut ctx, widget, delta),
            InputKind::RelativeRaw(raw) => surface.do_relative_raw(&mut ctx, widget, raw),
            InputKind::Touch(value) => surface.do_touch(&mut ctx, widget, value),
        };
        if !result.is_consumed() {
            debug!("{}: '{}' not bound in any active zone", surface.name(), event.widget);
        }

        // Modifier changes affect binding selection on every surface
        for surface in &mut self.surfaces {
            surface.update_modifier_selection(&*ctx.modifiers);
            surface.apply_commands(&mut ctx);
        }
        result
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            name: self.name.clone(),
            modifiers: self.modifiers.engaged_names(),
            modifier_value: self.modifiers.modifier_value(),
            navigation: self.navigation.snapshot(),
            surfaces: self.surfaces.iter().map(|s| s.snapshot()).collect(),
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("surfaces", &self.surfaces)
            .finish()
    }
}
