//! Zone instantiation from parsed definitions
//!
//! A definition with `channels: N` expands into N zones (`Channel1`..`ChannelN`)
//! addressing consecutive page channels; `|` in their widget names becomes the
//! channel number. A child definition that is itself channel-expanded follows
//! the parent's channel when the parent is a channel instance.

use super::{Zone, ZoneId, ZoneManager, ZoneRole};
use crate::action::ActionContext;
use crate::config::{BindingDefinition, NavigatorKind, ZoneDefinition};
use crate::navigation::Navigator;
use tracing::{debug, info, warn};

/// Name of the definition instantiated as the surface's home zone
pub const HOME_ZONE: &str = "Home";

/// Instantiation request for one definition
#[derive(Debug, Clone, Copy)]
pub(super) struct Placement {
    pub role: ZoneRole,
    pub parent: Option<ZoneId>,
    /// Navigator a definition without its own falls back to
    pub inherited: Navigator,
    /// 1-based channel of the enclosing channel instance
    pub channel: Option<usize>,
    pub slot_index: usize,
}

impl ZoneManager {
    pub(super) fn build_home(&mut self) {
        if !self.definitions.contains_key(HOME_ZONE) {
            warn!("{}: no '{}' zone definition", self.name, HOME_ZONE);
            return;
        }
        let placement = Placement {
            role: ZoneRole::Home,
            parent: None,
            inherited: Navigator::Selected,
            channel: None,
            slot_index: 0,
        };
        let mut stack = Vec::new();
        let ids = self.instantiate(HOME_ZONE, placement, &mut stack);
        self.home = ids.first().copied();
        if let Some(home) = self.home {
            self.activate(home);
            info!("🏠 {}: home zone ready ({} zones)", self.name, self.zones.len());
        }
    }

    /// Instantiate a definition and its children; returns the created root ids
    ///
    /// Unknown names and cycles are logged and skipped.
    pub(super) fn instantiate(&mut self, name: &str, placement: Placement, stack: &mut Vec<String>) -> Vec<ZoneId> {
        let Some(definition) = self.definitions.get(name).cloned() else {
            warn!("{}: unknown zone '{}'", self.name, name);
            return Vec::new();
        };
        if stack.iter().any(|n| n == name) {
            warn!("{}: zone cycle {} → {}", self.name, stack.join(" → "), name);
            return Vec::new();
        }

        let instances: Vec<Option<usize>> = match (definition.channels, placement.channel) {
            (Some(count), Some(channel)) if channel <= count => vec![Some(channel)],
            (Some(_), Some(channel)) => {
                debug!("{}: '{}' has no channel {}", self.name, name, channel);
                Vec::new()
            }
            (Some(count), None) => (1..=count).map(Some).collect(),
            (None, _) => vec![None],
        };

        stack.push(name.to_string());
        let ids = instances
            .into_iter()
            .map(|instance| self.instantiate_one(&definition, placement, instance, stack))
            .collect();
        stack.pop();
        ids
    }

    fn navigator_for(&self, definition: &ZoneDefinition, placement: Placement, channel: Option<usize>) -> Navigator {
        let track = |channel: usize| Navigator::Track {
            channel: self.channel_offset + channel - 1,
        };
        match (definition.navigator, channel) {
            (Some(NavigatorKind::Master), _) => Navigator::Master,
            (Some(NavigatorKind::Selected), _) => Navigator::Selected,
            (Some(NavigatorKind::FocusedFx), _) => Navigator::FocusedFx,
            (Some(NavigatorKind::Track), Some(channel)) => track(channel),
            (Some(NavigatorKind::Track), None) => match placement.inherited {
                inherited @ Navigator::Track { .. } => inherited,
                _ => {
                    warn!(
                        "{}: zone '{}' has a track navigator outside any channel zone, using channel 1",
                        self.name, definition.name
                    );
                    track(1)
                }
            },
            (None, Some(channel)) if definition.channels.is_some() => track(channel),
            (None, _) => placement.inherited,
        }
    }

    /// `channel` is `Some(n)` only for channel instances of this definition
    fn instantiate_one(
        &mut self,
        definition: &ZoneDefinition,
        placement: Placement,
        channel: Option<usize>,
        stack: &mut Vec<String>,
    ) -> ZoneId {
        let id = ZoneId(self.next_zone_id);
        self.next_zone_id += 1;

        // Channel number used for "|" substitution: own instance, else the enclosing one
        let widget_channel = channel.or(placement.channel);
        let navigator = self.navigator_for(definition, placement, channel);
        let instance_name = match channel {
            Some(n) => format!("{}{}", definition.name, n),
            None => definition.name.clone(),
        };

        let mut zone = Zone::new(
            instance_name,
            definition.name.clone(),
            placement.role,
            navigator,
            placement.slot_index,
        );
        if let Some(alias) = &definition.alias {
            zone.alias = match widget_channel {
                Some(n) => alias.replace('|', &n.to_string()),
                None => alias.clone(),
            };
        }
        zone.parent = placement.parent;
        if placement.role == ZoneRole::SubZone {
            zone.enclosing = placement.parent;
        }

        for binding in &definition.bindings {
            self.add_binding(&mut zone, id, binding, widget_channel);
        }
        zone.refresh_selection(&self.combinations, &self.touched);
        self.zones.insert(id, zone);

        let child = |role| Placement {
            role,
            parent: Some(id),
            inherited: navigator,
            channel: widget_channel,
            slot_index: placement.slot_index,
        };

        let mut included = Vec::new();
        for name in &definition.includes {
            included.extend(self.instantiate(name, child(ZoneRole::Included), stack));
        }
        let mut sub_zones = Vec::new();
        for name in &definition.sub_zones {
            sub_zones.push((name.clone(), self.instantiate(name, child(ZoneRole::SubZone), stack)));
        }
        let mut associated = Vec::new();
        for name in &definition.associated_zones {
            associated.push((name.clone(), self.instantiate(name, child(ZoneRole::Associated), stack)));
        }

        if let Some(zone) = self.zones.get_mut(&id) {
            zone.included = included;
            zone.sub_zones = sub_zones;
            zone.associated = associated;
        }
        id
    }

    fn add_binding(&self, zone: &mut Zone, id: ZoneId, binding: &BindingDefinition, channel: Option<usize>) {
        let widget_name = match channel {
            Some(n) => binding.widget.replace('|', &n.to_string()),
            None => binding.widget.clone(),
        };
        let Some(widget) = self.widget_id(&widget_name) else {
            warn!("{}: zone '{}' binds unknown widget '{}'", self.name, zone.name, widget_name);
            return;
        };
        let Some(combination) = binding.combination() else {
            warn!("{}: unknown modifier in {:?}", self.name, binding.modifiers);
            return;
        };
        if !self.registry.contains(&binding.action) {
            warn!("{}: unknown action '{}' on {}", self.name, binding.action, widget_name);
        }

        let mut context = ActionContext::new(self.registry.get(&binding.action), widget, id, binding.action_params());
        if let Some([minimum, maximum]) = binding.range {
            context.set_range(minimum, maximum);
        }
        if !binding.stepped_values.is_empty() {
            context.set_stepped_values(binding.stepped_values.clone());
        }
        if let Some(acceleration) = &binding.acceleration {
            context.set_accelerated_tick_values(acceleration.ticks.clone());
            context.set_accelerated_delta_values(acceleration.deltas.clone());
        }
        if let Some(delta) = binding.delta {
            context.set_delta_value(delta);
        }
        if let Some(seconds) = binding.hold_delay {
            context.set_hold_delay_amount(seconds);
        }
        context.set_value_inverted(binding.invert);
        context.set_feedback_inverted(binding.invert_feedback);
        if !binding.properties.is_empty() {
            context.set_properties(binding.properties.clone());
        }
        if let Some(colors) = binding.colors {
            context.set_colors(colors.on, colors.off);
        }

        zone.add_binding(widget, combination, context);
    }
}
