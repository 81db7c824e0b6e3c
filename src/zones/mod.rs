//! Zone engine - per-surface binding tree and its orchestrator
//!
//! A [`ZoneManager`] owns every zone of one surface in an arena keyed by
//! [`ZoneId`]. Zones reference each other by id only (included, sub and
//! associated zones, the enclosing zone of a sub-zone), so the tree has no
//! ownership cycles and zones can be torn down individually.
//!
//! Input is dispatched through the roots in priority order:
//!
//! ```text
//! focused-FX-param → focused-FX → selected-track-FX → FX slots → home
//! ```
//!
//! Within a root the search is depth-first (sub-zones, associated zones,
//! included zones, then the zone's own bindings) and stops at the first active
//! zone owning the widget.

mod builder;
mod commands;
mod dispatch;
mod fx;
mod zone;


pub use commands::{BankCategory, BankOffsets, BankTarget, ZoneCommand};
pub use dispatch::Dispatch;
pub use zone::{select_combination, Zone, ZoneId, ZoneRole};

use crate::action::ActionRegistry;
use crate::config::{SurfaceConfig, ZoneDefinition};
use crate::host::{HostApi, TrackId};
use crate::modifiers::ModifierManager;
use crate::navigation::TrackNavigationManager;
use crate::widget::{FeedbackSquelch, LogSink, Widget, WidgetId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Page-owned state a surface needs while handling input or feedback
pub struct PageContext<'a> {
    pub host: &'a mut dyn HostApi,
    pub navigation: &'a mut TrackNavigationManager,
    pub modifiers: &'a mut ModifierManager,
    pub now: Instant,
}

/// One line of the zone tree printout
#[derive(Debug, Clone, Serialize)]
pub struct ZoneTreeLine {
    pub depth: usize,
    pub name: String,
    pub role: ZoneRole,
    pub navigator: String,
    pub slot_index: usize,
    pub active: bool,
    pub bindings: usize,
}

/// Per-surface orchestrator
pub struct ZoneManager {
    name: String,
    channel_offset: usize,

    widgets: Vec<Widget>,
    widget_index: HashMap<String, WidgetId>,

    zones: HashMap<ZoneId, Zone>,
    next_zone_id: u64,

    home: Option<ZoneId>,
    fx_slot_zones: Vec<ZoneId>,
    selected_track_fx_zones: Vec<ZoneId>,
    focused_fx_zones: Vec<ZoneId>,
    focused_fx_param_zones: Vec<ZoneId>,

    /// Last focus state bitmask seen per (track, fx index)
    focused_fx_dictionary: HashMap<TrackId, HashMap<usize, u32>>,
    /// (track, fx index) the focused-FX zones are currently mapped to
    focused_fx_key: Option<(TrackId, usize)>,
    focused_fx_mapping: bool,
    focused_fx_param_mapping: bool,

    bank_offsets: BankOffsets,
    pending: Vec<ZoneCommand>,

    definitions: HashMap<String, ZoneDefinition>,
    /// FX name → definition name
    fx_templates: HashMap<String, String>,
    registry: Arc<ActionRegistry>,

    /// Cached modifier combinations and touched widgets for binding selection
    combinations: Vec<u32>,
    modifier_generation: u64,
    touched: HashSet<WidgetId>,

    last_selection: Vec<TrackId>,
}

impl ZoneManager {
    /// Create a surface from its widgets and zone definitions
    ///
    /// The home zone (definition named "Home") is instantiated and activated
    /// immediately when present.
    pub fn new(
        name: impl Into<String>,
        widgets: Vec<Widget>,
        definitions: Vec<ZoneDefinition>,
        channel_offset: usize,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        let widget_index = widgets
            .iter()
            .enumerate()
            .map(|(idx, w)| (w.name().to_string(), WidgetId(idx)))
            .collect();

        let fx_templates = definitions
            .iter()
            .filter_map(|d| d.fx.as_ref().map(|fx| (fx.clone(), d.name.clone())))
            .collect();

        let mut manager = Self {
            name: name.into(),
            channel_offset,
            widgets,
            widget_index,
            zones: HashMap::new(),
            next_zone_id: 1,
            home: None,
            fx_slot_zones: Vec::new(),
            selected_track_fx_zones: Vec::new(),
            focused_fx_zones: Vec::new(),
            focused_fx_param_zones: Vec::new(),
            focused_fx_dictionary: HashMap::new(),
            focused_fx_key: None,
            focused_fx_mapping: true,
            focused_fx_param_mapping: false,
            bank_offsets: BankOffsets::default(),
            pending: Vec::new(),
            definitions: definitions.into_iter().map(|d| (d.name.clone(), d)).collect(),
            fx_templates,
            registry,
            combinations: vec![0],
            modifier_generation: 0,
            touched: HashSet::new(),
            last_selection: Vec::new(),
        };
        manager.build_home();
        manager
    }

    /// Build a surface from its config section, with a logging sink per widget
    ///
    /// `squelch` applies to widgets marked `motorized` only.
    pub fn from_config(config: &SurfaceConfig, squelch: Duration, registry: Arc<ActionRegistry>) -> Self {
        let widgets = config
            .widgets
            .iter()
            .map(|w| {
                let mut widget = Widget::new(w.name.clone());
                if w.motorized {
                    widget = widget.with_squelch(FeedbackSquelch::new(squelch));
                }
                if let Some(acceleration) = &w.acceleration {
                    widget = widget.with_acceleration(acceleration.clone());
                }
                widget.add_sink(Box::new(LogSink::new(format!("{}/{}", config.name, w.name))));
                widget
            })
            .collect();

        let manager = Self::new(
            config.name.clone(),
            widgets,
            config.zones.clone(),
            config.channel_offset,
            registry,
        );
        info!(
            "🎛️  Surface '{}': {} widgets, {} zones",
            manager.name,
            manager.widgets.len(),
            manager.zones.len()
        );
        manager
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_offset(&self) -> usize {
        self.channel_offset
    }

    pub fn widget_id(&self, name: &str) -> Option<WidgetId> {
        self.widget_index.get(name).copied()
    }

    pub fn widget(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.get(id.0)
    }

    /// Mutable access by name (attach extra sinks, ...)
    pub fn widget_mut(&mut self, name: &str) -> Option<&mut Widget> {
        let id = self.widget_id(name)?;
        self.widgets.get_mut(id.0)
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    pub fn home(&self) -> Option<ZoneId> {
        self.home
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// First zone with the given instance name
    pub fn find_zone(&self, name: &str) -> Option<ZoneId> {
        let mut ids: Vec<&ZoneId> = self.zones.keys().collect();
        ids.sort_unstable();
        ids.into_iter()
            .find(|id| self.zones[*id].name == name)
            .copied()
    }

    pub fn is_zone_active(&self, name: &str) -> bool {
        self.zones.values().any(|z| z.name == name && z.active)
    }

    /// Names of every active zone, sorted
    pub fn active_zone_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .zones
            .values()
            .filter(|z| z.active)
            .map(|z| z.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn bank_offsets(&self) -> &BankOffsets {
        &self.bank_offsets
    }

    pub fn fx_slot_zones(&self) -> &[ZoneId] {
        &self.fx_slot_zones
    }

    pub fn selected_track_fx_zones(&self) -> &[ZoneId] {
        &self.selected_track_fx_zones
    }

    pub fn focused_fx_zones(&self) -> &[ZoneId] {
        &self.focused_fx_zones
    }

    pub fn focused_fx_param_zones(&self) -> &[ZoneId] {
        &self.focused_fx_param_zones
    }

    pub fn is_focused_fx_mapping_enabled(&self) -> bool {
        self.focused_fx_mapping
    }

    pub fn is_focused_fx_param_mapping_enabled(&self) -> bool {
        self.focused_fx_param_mapping
    }

    /// Root zones in dispatch priority order
    fn roots(&self) -> Vec<ZoneId> {
        self.focused_fx_param_zones
            .iter()
            .chain(&self.focused_fx_zones)
            .chain(&self.selected_track_fx_zones)
            .chain(&self.fx_slot_zones)
            .chain(self.home.iter())
            .copied()
            .collect()
    }

    /// Zone tree in dispatch order, for printing
    pub fn tree(&self) -> Vec<ZoneTreeLine> {
        let mut lines = Vec::new();
        for root in self.roots() {
            self.tree_walk(root, 0, &mut lines);
        }
        lines
    }

    fn tree_walk(&self, id: ZoneId, depth: usize, lines: &mut Vec<ZoneTreeLine>) {
        let Some(zone) = self.zones.get(&id) else {
            return;
        };
        lines.push(ZoneTreeLine {
            depth,
            name: zone.name.clone(),
            role: zone.role,
            navigator: zone.navigator.label(),
            slot_index: zone.slot_index,
            active: zone.active,
            bindings: zone.binding_count(),
        });
        for child in zone.children() {
            self.tree_walk(child, depth + 1, lines);
        }
    }

    /// Set `active` on a zone and, recursively, its included zones
    fn set_active(&mut self, id: ZoneId, active: bool) {
        let included = match self.zones.get_mut(&id) {
            Some(zone) => {
                zone.active = active;
                zone.included.clone()
            }
            None => return,
        };
        for child in included {
            self.set_active(child, active);
        }
    }

    pub fn activate(&mut self, id: ZoneId) {
        self.set_active(id, true);
    }

    pub fn deactivate(&mut self, id: ZoneId) {
        self.set_active(id, false);
    }

    /// Remove a zone and its whole subtree from the arena, clearing its widgets
    fn remove_subtree(&mut self, id: ZoneId) {
        let Some(zone) = self.zones.remove(&id) else {
            return;
        };
        for widget in zone.widgets() {
            if let Some(w) = self.widgets.get_mut(widget.0) {
                w.clear();
            }
        }
        for child in zone.children() {
            self.remove_subtree(child);
        }
    }

    /// Root of the tree containing `id`
    fn root_of(&self, id: ZoneId) -> ZoneId {
        let mut current = id;
        while let Some(parent) = self.zones.get(&current).and_then(|z| z.parent) {
            current = parent;
        }
        current
    }

    /// Adopt a new modifier state; returns true when selection was refreshed
    pub fn update_modifier_selection(&mut self, modifiers: &ModifierManager) -> bool {
        if modifiers.generation() == self.modifier_generation {
            return false;
        }
        self.modifier_generation = modifiers.generation();
        self.combinations = modifiers.active_combinations().to_vec();
        for zone in self.zones.values_mut() {
            zone.refresh_selection(&self.combinations, &self.touched);
        }
        true
    }

    fn set_widget_touched(&mut self, widget: WidgetId, touched: bool) {
        let changed = if touched {
            self.touched.insert(widget)
        } else {
            self.touched.remove(&widget)
        };
        if changed {
            for zone in self.zones.values_mut() {
                zone.refresh_widget(widget, &self.combinations, touched);
            }
        }
    }

    /// Snapshot for `--check` and diagnostics
    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            name: self.name.clone(),
            active_zones: self.active_zone_names(),
            bank_offsets: self.bank_offsets.clone(),
            fx_slots: self.fx_slot_zones.len(),
            focused_fx_mapping: self.focused_fx_mapping,
            focused_fx_param_mapping: self.focused_fx_param_mapping,
        }
    }
}

/// Serializable view of one surface
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSnapshot {
    pub name: String,
    pub active_zones: Vec<String>,
    pub bank_offsets: BankOffsets,
    pub fx_slots: usize,
    pub focused_fx_mapping: bool,
    pub focused_fx_param_mapping: bool,
}

impl std::fmt::Debug for ZoneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneManager")
            .field("name", &self.name)
            .field("widgets", &self.widgets.len())
            .field("zones", &self.zones.len())
            .field("home", &self.home)
            .finish()
    }
}
