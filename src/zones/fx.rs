//! FX zone lifecycle: FX slots, selected-track FX, focused FX
//!
//! FX zones are instantiated from definitions carrying an `fx:` name and
//! remember the track they were mapped to. They are validated every tick and
//! torn down once their navigator resolves elsewhere or the FX moved.

use super::builder::Placement;
use super::{BankCategory, PageContext, ZoneId, ZoneManager, ZoneRole};
use crate::host::{FocusedFx, HostApi, TrackId};
use crate::navigation::{Navigator, TrackNavigationManager};
use tracing::{debug, info};

/// Definition instantiated while focused-FX-param mapping is enabled
pub const FOCUSED_FX_PARAM_ZONE: &str = "FocusedFXParam";

impl ZoneManager {
    /// Instantiate an FX template as a root zone and activate it
    fn instantiate_fx_zone(
        &mut self,
        template: &str,
        role: ZoneRole,
        navigator: Navigator,
        fx_index: usize,
        track: Option<TrackId>,
    ) -> Option<ZoneId> {
        let placement = Placement {
            role,
            parent: None,
            inherited: navigator,
            channel: None,
            slot_index: fx_index,
        };
        let mut stack = Vec::new();
        let id = self.instantiate(template, placement, &mut stack).into_iter().next()?;
        if let Some(zone) = self.zones.get_mut(&id) {
            zone.fx_track = track;
        }
        self.activate(id);
        Some(id)
    }

    fn template_for(&self, host: &dyn HostApi, track: TrackId, fx_index: usize) -> Option<String> {
        let fx_name = host.fx_name(track, fx_index)?;
        self.fx_templates.get(&fx_name).cloned()
    }

    /// Map FX `fx_index` of the navigator's track onto an FX-slot zone
    pub fn go_fx_slot(&mut self, ctx: &mut PageContext<'_>, navigator: Navigator, fx_index: usize) {
        let Some(track) = navigator.resolve(&*ctx.navigation, &*ctx.host) else {
            debug!("{}: no track for {}", self.name, navigator.label());
            return;
        };
        let Some(fx_name) = ctx.host.fx_name(track, fx_index) else {
            debug!("{}: {} has no FX {}", self.name, track, fx_index);
            return;
        };
        self.ensure_zone_available(&fx_name, navigator, track, fx_index);
        // Mapped against this selection
        self.last_selection = ctx.host.selected_tracks();
    }

    /// Make sure an FX-slot zone for (fx, navigator, index) exists and is first in line
    ///
    /// Returns true when a zone had to be created.
    pub fn ensure_zone_available(&mut self, fx_name: &str, navigator: Navigator, track: TrackId, fx_index: usize) -> bool {
        let Some(template) = self.fx_templates.get(fx_name).cloned() else {
            debug!("{}: no zone for FX '{}'", self.name, fx_name);
            return false;
        };

        let existing = self.fx_slot_zones.iter().position(|id| {
            self.zones.get(id).is_some_and(|z| {
                z.definition == template
                    && z.navigator == navigator
                    && z.slot_index == fx_index
                    && z.fx_track == Some(track)
            })
        });
        if let Some(position) = existing {
            let id = self.fx_slot_zones.remove(position);
            self.fx_slot_zones.insert(0, id);
            self.activate(id);
            return false;
        }

        match self.instantiate_fx_zone(&template, ZoneRole::FxSlot, navigator, fx_index, Some(track)) {
            Some(id) => {
                self.fx_slot_zones.insert(0, id);
                info!("🎚️  {}: FX slot '{}' #{} on {}", self.name, fx_name, fx_index + 1, track);
                true
            }
            None => false,
        }
    }

    /// Remove the FX zone tree containing `zone`
    ///
    /// FX-menu offsets and menu widgets are refreshed afterwards.
    pub fn clear_fx_slot(&mut self, zone: ZoneId, host: &dyn HostApi, navigation: &TrackNavigationManager) {
        let root = self.root_of(zone);
        let is_fx_root = self
            .fx_slot_zones
            .iter()
            .chain(&self.selected_track_fx_zones)
            .chain(&self.focused_fx_zones)
            .chain(&self.focused_fx_param_zones)
            .any(|id| *id == root);
        if !is_fx_root {
            debug!("{}: {:?} is not part of an FX zone", self.name, zone);
            return;
        }
        let name = self.zones.get(&root).map(|z| z.name.clone()).unwrap_or_default();

        self.fx_slot_zones.retain(|id| *id != root);
        self.selected_track_fx_zones.retain(|id| *id != root);
        self.focused_fx_zones.retain(|id| *id != root);
        self.focused_fx_param_zones.retain(|id| *id != root);
        self.remove_subtree(root);
        debug!("{}: cleared FX zone '{}'", self.name, name);

        self.refresh_fx_menus(host, navigation);
    }

    /// Pull FX-menu offsets back onto a reachable FX and repaint the menus
    ///
    /// Each FX-menu offset is clamped to the FX count its navigator reaches
    /// now; the track menu uses the largest count over the channel strips.
    /// Widgets of home's `*FXMenu` associated zones drop any pending squelch
    /// so the next feedback pass redraws them.
    fn refresh_fx_menus(&mut self, host: &dyn HostApi, navigation: &TrackNavigationManager) {
        let fx_count = |navigator: Navigator| navigator.resolve(navigation, host).map_or(0, |track| host.fx_count(track));
        let track_fx = self
            .zones
            .values()
            .filter(|z| matches!(z.navigator, Navigator::Track { .. }))
            .map(|z| fx_count(z.navigator))
            .max()
            .unwrap_or(0);

        for (category, count) in [
            (BankCategory::TrackFxMenu, track_fx),
            (BankCategory::SelectedTrackFxMenu, fx_count(Navigator::Selected)),
            (BankCategory::MasterTrackFxMenu, fx_count(Navigator::Master)),
        ] {
            if self.bank_offsets.clamp_to(category, count) {
                debug!("{}: {:?} offset → {}", self.name, category, self.bank_offsets.get(category));
            }
        }

        let Some(home) = self.home.and_then(|id| self.zones.get(&id)) else {
            return;
        };
        let mut menus: Vec<ZoneId> = home
            .associated
            .iter()
            .filter(|(name, _)| name.contains("FXMenu"))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        while let Some(id) = menus.pop() {
            let Some(zone) = self.zones.get(&id) else {
                continue;
            };
            menus.extend(zone.children());
            for widget in zone.widgets() {
                if let Some(w) = self.widgets.get_mut(widget.0) {
                    w.reset_squelch();
                }
            }
        }
    }

    fn clear_zone_list(&mut self, ids: Vec<ZoneId>) {
        for id in ids {
            self.remove_subtree(id);
        }
    }

    /// Per-tick FX housekeeping, run before input is drained
    pub fn refresh_fx_state(&mut self, host: &dyn HostApi, navigation: &TrackNavigationManager) {
        self.on_selection_changed(host, navigation);
        self.validate_fx_zones(host, navigation);
        self.check_focused_fx_state(host);
    }

    /// Drop FX zones whose navigator no longer lands on the FX they were built for
    pub fn validate_fx_zones(&mut self, host: &dyn HostApi, navigation: &TrackNavigationManager) {
        let stale: Vec<ZoneId> = self
            .fx_slot_zones
            .iter()
            .chain(&self.selected_track_fx_zones)
            .copied()
            .filter(|id| {
                let Some(zone) = self.zones.get(id) else {
                    return true;
                };
                let track = zone.navigator.resolve(navigation, host);
                let template = track.and_then(|t| self.template_for(host, t, zone.slot_index));
                track != zone.fx_track || template.as_deref() != Some(zone.definition.as_str())
            })
            .collect();

        for id in stale {
            debug!("{}: FX zone {:?} is stale", self.name, id);
            self.clear_fx_slot(id, host, navigation);
        }
    }

    /// Map every FX of the single selected track
    pub fn go_selected_track_fx(&mut self, ctx: &mut PageContext<'_>) {
        let old = std::mem::take(&mut self.selected_track_fx_zones);
        self.clear_zone_list(old);

        let selected = ctx.host.selected_tracks();
        self.last_selection = selected.clone();
        let [track] = selected.as_slice() else {
            debug!("{}: {} tracks selected, no selected-track FX", self.name, selected.len());
            return;
        };

        for fx_index in 0..ctx.host.fx_count(*track) {
            let Some(template) = self.template_for(&*ctx.host, *track, fx_index) else {
                continue;
            };
            if let Some(id) =
                self.instantiate_fx_zone(&template, ZoneRole::SelectedTrackFx, Navigator::Selected, fx_index, Some(*track))
            {
                self.selected_track_fx_zones.push(id);
            }
        }
        info!(
            "🎚️  {}: {} selected-track FX zones on {}",
            self.name,
            self.selected_track_fx_zones.len(),
            track
        );
    }

    /// Tear down FX-slot and selected-track FX zones when the host selection changed
    ///
    /// Returns true when the selection differs from the previous tick.
    pub fn on_selection_changed(&mut self, host: &dyn HostApi, navigation: &TrackNavigationManager) -> bool {
        let selection = host.selected_tracks();
        if selection == self.last_selection {
            return false;
        }
        self.last_selection = selection;

        if !self.fx_slot_zones.is_empty() || !self.selected_track_fx_zones.is_empty() {
            let slots = std::mem::take(&mut self.fx_slot_zones);
            let selected = std::mem::take(&mut self.selected_track_fx_zones);
            self.clear_zone_list(slots);
            self.clear_zone_list(selected);
            self.refresh_fx_menus(host, navigation);
            debug!("{}: selection changed, FX zones cleared", self.name);
        }
        true
    }

    /// Poll the host's focused FX and remap when its state changed
    pub fn check_focused_fx_state(&mut self, host: &dyn HostApi) {
        if !self.focused_fx_mapping {
            return;
        }

        let Some(focused) = host.focused_fx() else {
            if !self.focused_fx_zones.is_empty() {
                self.clear_focused_fx();
            }
            return;
        };

        let recorded = self
            .focused_fx_dictionary
            .get(&focused.track)
            .and_then(|fx| fx.get(&focused.fx_index))
            .copied();
        let key = (focused.track, focused.fx_index);
        let moved = focused.is_track_fx_focused() && self.focused_fx_key != Some(key);
        if recorded == Some(focused.state) && !moved {
            return;
        }

        self.focused_fx_dictionary
            .entry(focused.track)
            .or_default()
            .insert(focused.fx_index, focused.state);

        if focused.is_track_fx_focused() {
            self.go_focused_fx(host, focused);
        } else {
            self.clear_focused_fx();
        }
    }

    fn go_focused_fx(&mut self, host: &dyn HostApi, focused: FocusedFx) {
        self.clear_focused_fx();
        self.focused_fx_key = Some((focused.track, focused.fx_index));

        let Some(template) = self.template_for(host, focused.track, focused.fx_index) else {
            debug!("{}: focused FX {} on {} has no zone", self.name, focused.fx_index, focused.track);
            return;
        };
        if let Some(id) = self.instantiate_fx_zone(
            &template,
            ZoneRole::FocusedFx,
            Navigator::FocusedFx,
            focused.fx_index,
            Some(focused.track),
        ) {
            self.focused_fx_zones.push(id);
            info!("🎯 {}: focused FX '{}' on {}", self.name, template, focused.track);
        }
    }

    fn clear_focused_fx(&mut self) {
        let zones = std::mem::take(&mut self.focused_fx_zones);
        self.clear_zone_list(zones);
        self.focused_fx_key = None;
    }

    pub fn toggle_focused_fx_mapping(&mut self) {
        self.focused_fx_mapping = !self.focused_fx_mapping;
        if !self.focused_fx_mapping {
            self.clear_focused_fx();
            self.focused_fx_dictionary.clear();
        }
        info!("{}: focused FX mapping {}", self.name, on_off(self.focused_fx_mapping));
    }

    pub fn toggle_focused_fx_param_mapping(&mut self) {
        self.focused_fx_param_mapping = !self.focused_fx_param_mapping;
        let zones = std::mem::take(&mut self.focused_fx_param_zones);
        self.clear_zone_list(zones);

        if self.focused_fx_param_mapping {
            if let Some(id) =
                self.instantiate_fx_zone(FOCUSED_FX_PARAM_ZONE, ZoneRole::FocusedFxParam, Navigator::FocusedFx, 0, None)
            {
                self.focused_fx_param_zones.push(id);
            }
        }
        info!("{}: focused FX param mapping {}", self.name, on_off(self.focused_fx_param_mapping));
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
