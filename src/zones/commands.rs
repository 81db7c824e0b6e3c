//! Zone-level commands, bank offsets and tree navigation
//!
//! Actions never change the zone tree while it is being searched; they queue
//! a [`ZoneCommand`] and the manager applies the queue after the dispatch.

use super::{PageContext, ZoneId, ZoneManager, ZoneRole};
use crate::navigation::{NavigationMode, Navigator};
use serde::Serialize;
use tracing::{debug, info};

/// Per-category offset addressing sends, receives and FX menus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BankCategory {
    TrackSend,
    TrackReceive,
    TrackFxMenu,
    SelectedTrackSend,
    SelectedTrackReceive,
    SelectedTrackFxMenu,
    MasterTrackFxMenu,
}

impl BankCategory {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "TrackSend" => Some(BankCategory::TrackSend),
            "TrackReceive" => Some(BankCategory::TrackReceive),
            "TrackFXMenu" => Some(BankCategory::TrackFxMenu),
            "SelectedTrackSend" => Some(BankCategory::SelectedTrackSend),
            "SelectedTrackReceive" => Some(BankCategory::SelectedTrackReceive),
            "SelectedTrackFXMenu" => Some(BankCategory::SelectedTrackFxMenu),
            "MasterTrackFXMenu" => Some(BankCategory::MasterTrackFxMenu),
            _ => None,
        }
    }
}

/// Where an `AdjustBank` request goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankTarget {
    /// Page window of a navigation mode
    Navigation(NavigationMode),
    /// Surface-local per-category offset
    Category(BankCategory),
}

impl BankTarget {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Track" | "Tracks" => Some(BankTarget::Navigation(NavigationMode::Tracks)),
            "VCA" => Some(BankTarget::Navigation(NavigationMode::Vca)),
            "Folder" => Some(BankTarget::Navigation(NavigationMode::Folder)),
            "SelectedTracks" => Some(BankTarget::Navigation(NavigationMode::SelectedTracks)),
            other => BankCategory::from_name(other).map(BankTarget::Category),
        }
    }
}

/// Non-negative per-category offsets
///
/// Only the lower bound is enforced on adjustment; the upper bound depends on
/// counts (sends of the selected track, ...) that change between ticks and is
/// checked where the offset is consumed. FX-menu offsets are additionally
/// pulled back with [`BankOffsets::clamp_to`] when FX zones go away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BankOffsets {
    pub track_send: usize,
    pub track_receive: usize,
    pub track_fx_menu: usize,
    pub selected_track_send: usize,
    pub selected_track_receive: usize,
    pub selected_track_fx_menu: usize,
    pub master_track_fx_menu: usize,
}

impl BankOffsets {
    fn slot(&mut self, category: BankCategory) -> &mut usize {
        match category {
            BankCategory::TrackSend => &mut self.track_send,
            BankCategory::TrackReceive => &mut self.track_receive,
            BankCategory::TrackFxMenu => &mut self.track_fx_menu,
            BankCategory::SelectedTrackSend => &mut self.selected_track_send,
            BankCategory::SelectedTrackReceive => &mut self.selected_track_receive,
            BankCategory::SelectedTrackFxMenu => &mut self.selected_track_fx_menu,
            BankCategory::MasterTrackFxMenu => &mut self.master_track_fx_menu,
        }
    }

    pub fn get(&self, category: BankCategory) -> usize {
        match category {
            BankCategory::TrackSend => self.track_send,
            BankCategory::TrackReceive => self.track_receive,
            BankCategory::TrackFxMenu => self.track_fx_menu,
            BankCategory::SelectedTrackSend => self.selected_track_send,
            BankCategory::SelectedTrackReceive => self.selected_track_receive,
            BankCategory::SelectedTrackFxMenu => self.selected_track_fx_menu,
            BankCategory::MasterTrackFxMenu => self.master_track_fx_menu,
        }
    }

    /// Add `amount`, clamping at zero
    pub fn adjust(&mut self, category: BankCategory, amount: i64) {
        let slot = self.slot(category);
        *slot = (*slot as i64 + amount).max(0) as usize;
    }

    /// Keep the offset on one of `count` items; returns true if it moved
    pub fn clamp_to(&mut self, category: BankCategory, count: usize) -> bool {
        let slot = self.slot(category);
        let clamped = (*slot).min(count.saturating_sub(1));
        let moved = clamped != *slot;
        *slot = clamped;
        moved
    }
}

/// Deferred change to the zone tree
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneCommand {
    GoHome,
    /// Activate the sub-zones named `name`, starting from the zone that fired
    GoSubZone { from: ZoneId, name: String, slot_index: usize },
    LeaveSubZone { from: ZoneId },
    /// Toggle an associated-zone category of the home zone
    GoAssociatedZone { name: String },
    AdjustBank { category: BankCategory, amount: i64 },
    GoFxSlot { navigator: Navigator, fx_index: usize },
    ClearFxSlot { zone: ZoneId },
    GoSelectedTrackFx,
    ToggleFocusedFxMapping,
    ToggleFocusedFxParamMapping,
}

impl ZoneManager {
    /// Apply every command queued by the last dispatch
    pub fn apply_commands(&mut self, ctx: &mut PageContext<'_>) {
        let commands = std::mem::take(&mut self.pending);
        for command in commands {
            debug!("{}: applying {:?}", self.name, command);
            match command {
                ZoneCommand::GoHome => self.go_home(),
                ZoneCommand::GoSubZone { from, name, slot_index } => self.go_sub_zone(from, &name, slot_index),
                ZoneCommand::LeaveSubZone { from } => self.leave_sub_zone(from),
                ZoneCommand::GoAssociatedZone { name } => self.go_associated_zone(&name),
                ZoneCommand::AdjustBank { category, amount } => self.adjust_bank(category, amount),
                ZoneCommand::GoFxSlot { navigator, fx_index } => self.go_fx_slot(ctx, navigator, fx_index),
                ZoneCommand::ClearFxSlot { zone } => self.clear_fx_slot(zone, &*ctx.host, &*ctx.navigation),
                ZoneCommand::GoSelectedTrackFx => self.go_selected_track_fx(ctx),
                ZoneCommand::ToggleFocusedFxMapping => self.toggle_focused_fx_mapping(),
                ZoneCommand::ToggleFocusedFxParamMapping => self.toggle_focused_fx_param_mapping(),
            }
        }
    }

    pub fn has_pending_commands(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queue a command as if an action had issued it
    pub fn queue(&mut self, command: ZoneCommand) {
        self.pending.push(command);
    }

    pub fn adjust_bank(&mut self, category: BankCategory, amount: i64) {
        self.bank_offsets.adjust(category, amount);
        debug!("{}: {:?} offset → {}", self.name, category, self.bank_offsets.get(category));
    }

    /// Return to the home zone alone: associated and sub-zones off, FX slots gone
    pub fn go_home(&mut self) {
        let Some(home) = self.home else {
            return;
        };

        for id in std::mem::take(&mut self.fx_slot_zones) {
            self.remove_subtree(id);
        }
        for id in std::mem::take(&mut self.selected_track_fx_zones) {
            self.remove_subtree(id);
        }

        let transient: Vec<ZoneId> = self
            .zones
            .iter()
            .filter(|(_, z)| matches!(z.role, ZoneRole::SubZone | ZoneRole::Associated))
            .map(|(id, _)| *id)
            .collect();
        for id in transient {
            self.deactivate(id);
        }

        self.activate(home);
        info!("🏠 {}: home", self.name);
    }

    /// Activate the sub-zones registered under `name`
    ///
    /// A sub-zone receiving the request deactivates itself and hands it to its
    /// enclosing zone. A zone without such a sub-zone passes the request up to
    /// its parent. Unknown names are a silent no-op.
    pub fn go_sub_zone(&mut self, from: ZoneId, name: &str, slot_index: usize) {
        let Some(zone) = self.zones.get(&from) else {
            return;
        };

        if let Some(enclosing) = zone.enclosing {
            self.deactivate(from);
            self.go_sub_zone(enclosing, name, slot_index);
            return;
        }

        if let Some(targets) = zone.sub_zones_named(name).map(|ids| ids.to_vec()) {
            for id in targets {
                if let Some(sub) = self.zones.get_mut(&id) {
                    sub.slot_index = slot_index;
                }
                self.activate(id);
            }
            debug!("{}: sub-zone '{}' active", self.name, name);
            return;
        }

        match zone.parent {
            Some(parent) => self.go_sub_zone(parent, name, slot_index),
            None => debug!("{}: no sub-zone named '{}'", self.name, name),
        }
    }

    /// Deactivate the sub-zone containing `from`, if any
    pub fn leave_sub_zone(&mut self, from: ZoneId) {
        let mut current = Some(from);
        while let Some(id) = current {
            let Some(zone) = self.zones.get(&id) else {
                return;
            };
            if zone.enclosing.is_some() {
                self.deactivate(id);
                return;
            }
            current = zone.parent;
        }
    }

    /// Toggle an associated-zone category of the home zone
    ///
    /// Activating a category deactivates the other categories; activating an
    /// already active one returns to the home zone's own bindings.
    pub fn go_associated_zone(&mut self, name: &str) {
        let Some(home) = self.home.and_then(|id| self.zones.get(&id)) else {
            return;
        };
        let Some(targets) = home.associated_named(name).map(|ids| ids.to_vec()) else {
            debug!("{}: no associated zone '{}'", self.name, name);
            return;
        };
        let others: Vec<ZoneId> = home
            .associated
            .iter()
            .filter(|(n, _)| n != name)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();

        if self.is_associated_zone_active(name) {
            for id in targets {
                self.deactivate(id);
            }
            info!("🏠 {}: '{}' off", self.name, name);
            return;
        }

        for id in others {
            self.deactivate(id);
        }
        for id in targets {
            self.activate(id);
        }
        info!("🔀 {}: '{}' on", self.name, name);
    }

    /// Whether any zone registered under the associated category `name` is active
    ///
    /// Several zones may list the same category; the category is active as
    /// soon as one of them is.
    pub fn is_associated_zone_active(&self, name: &str) -> bool {
        self.zones
            .values()
            .filter_map(|z| z.associated_named(name))
            .flatten()
            .any(|id| self.zones.get(id).is_some_and(|z| z.active))
    }

    /// Home is active and nothing overrides it
    pub fn is_main_zone_only_active(&self) -> bool {
        let home_active = self
            .home
            .and_then(|id| self.zones.get(&id))
            .is_some_and(|z| z.active);
        let overridden = self
            .zones
            .values()
            .any(|z| z.active && matches!(z.role, ZoneRole::Associated | ZoneRole::FxSlot));
        home_active && !overridden
    }
}
