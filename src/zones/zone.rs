//! A single zone: bindings plus its composition relations

use crate::action::ActionContext;
use crate::host::TrackId;
use crate::modifiers::TOUCH;
use crate::navigation::Navigator;
use crate::widget::WidgetId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Arena handle of a zone (stable for the zone's lifetime, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ZoneId(pub u64);

/// How a zone is attached to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ZoneRole {
    Home,
    Included,
    SubZone,
    Associated,
    FxSlot,
    SelectedTrackFx,
    FocusedFx,
    FocusedFxParam,
}

/// Binding lists of one widget, keyed by modifier combination
pub type WidgetBindings = BTreeMap<u32, Vec<ActionContext>>;

/// Pick the combination whose bindings fire for a widget
///
/// Combinations are tried most specific first; a touched widget prefers the
/// touch-qualified variant of each combination.
pub fn select_combination(bindings: &WidgetBindings, combinations: &[u32], touched: bool) -> Option<u32> {
    combinations.iter().find_map(|combination| {
        if touched && bindings.contains_key(&(combination | TOUCH)) {
            Some(combination | TOUCH)
        } else if bindings.contains_key(combination) {
            Some(*combination)
        } else {
            None
        }
    })
}

#[derive(Debug)]
pub struct Zone {
    /// Instance name ("Channel3")
    pub(crate) name: String,
    /// Definition it was built from ("Channel")
    pub(crate) definition: String,
    pub(crate) alias: String,
    pub(crate) role: ZoneRole,
    pub(crate) navigator: Navigator,
    pub(crate) slot_index: usize,
    pub(crate) active: bool,

    pub(crate) bindings: HashMap<WidgetId, WidgetBindings>,
    /// Cached combination per widget, refreshed on modifier/touch changes
    pub(crate) current: HashMap<WidgetId, u32>,

    pub(crate) included: Vec<ZoneId>,
    pub(crate) sub_zones: Vec<(String, Vec<ZoneId>)>,
    pub(crate) associated: Vec<(String, Vec<ZoneId>)>,

    pub(crate) parent: Option<ZoneId>,
    /// Set on sub-zones only
    pub(crate) enclosing: Option<ZoneId>,

    /// Track the FX of an FX zone was resolved on when it was created
    pub(crate) fx_track: Option<TrackId>,
}

impl Zone {
    pub(crate) fn new(name: String, definition: String, role: ZoneRole, navigator: Navigator, slot_index: usize) -> Self {
        Self {
            alias: name.clone(),
            name,
            definition,
            role,
            navigator,
            slot_index,
            active: false,
            bindings: HashMap::new(),
            current: HashMap::new(),
            included: Vec::new(),
            sub_zones: Vec::new(),
            associated: Vec::new(),
            parent: None,
            enclosing: None,
            fx_track: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn role(&self) -> ZoneRole {
        self.role
    }

    pub fn navigator(&self) -> Navigator {
        self.navigator
    }

    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn owns_widget(&self, widget: WidgetId) -> bool {
        self.bindings.contains_key(&widget)
    }

    pub fn widgets(&self) -> impl Iterator<Item = WidgetId> + '_ {
        self.bindings.keys().copied()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.values().flat_map(|b| b.values()).map(Vec::len).sum()
    }

    pub(crate) fn add_binding(&mut self, widget: WidgetId, combination: u32, context: ActionContext) {
        self.bindings
            .entry(widget)
            .or_default()
            .entry(combination)
            .or_default()
            .push(context);
    }

    /// Every child id, in search order
    pub(crate) fn children(&self) -> Vec<ZoneId> {
        self.sub_zones
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .chain(self.associated.iter().flat_map(|(_, ids)| ids.iter().copied()))
            .chain(self.included.iter().copied())
            .collect()
    }

    pub(crate) fn sub_zones_named(&self, name: &str) -> Option<&[ZoneId]> {
        self.sub_zones
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ids)| ids.as_slice())
    }

    pub(crate) fn associated_named(&self, name: &str) -> Option<&[ZoneId]> {
        self.associated
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ids)| ids.as_slice())
    }

    /// Recompute the cached combination for every widget
    pub(crate) fn refresh_selection(&mut self, combinations: &[u32], touched: &HashSet<WidgetId>) {
        self.current = self
            .bindings
            .iter()
            .filter_map(|(widget, bindings)| {
                select_combination(bindings, combinations, touched.contains(widget)).map(|c| (*widget, c))
            })
            .collect();
    }

    pub(crate) fn refresh_widget(&mut self, widget: WidgetId, combinations: &[u32], touched: bool) {
        let Some(bindings) = self.bindings.get(&widget) else {
            return;
        };
        match select_combination(bindings, combinations, touched) {
            Some(combination) => self.current.insert(widget, combination),
            None => self.current.remove(&widget),
        };
    }

    /// Contexts firing for `widget` under the cached combination
    pub(crate) fn current_contexts_mut(&mut self, widget: WidgetId) -> Option<&mut Vec<ActionContext>> {
        let combination = *self.current.get(&widget)?;
        self.bindings.get_mut(&widget)?.get_mut(&combination)
    }

    pub(crate) fn all_contexts_mut(&mut self) -> impl Iterator<Item = &mut ActionContext> + '_ {
        self.bindings
            .values_mut()
            .flat_map(|b| b.values_mut())
            .flat_map(|v| v.iter_mut())
    }
}
