//! Track, FX and transport actions

use super::{Action, ActionEnv, ActionRegistry, ActionSite};
use crate::host::{TrackId, TrackParam, TransportCommand};
use crate::navigation::{Navigator, TouchKind};
use crate::widget::FeedbackValue;
use crate::zones::BankCategory;
use std::sync::Arc;
use tracing::debug;

fn is_press(value: f64) -> bool {
    value != 0.0
}

fn flag(on: bool) -> FeedbackValue {
    FeedbackValue::Number(if on { 1.0 } else { 0.0 })
}

/// Continuous track parameter (volume, pan, ...), optionally touch sensitive
struct TrackParamAction {
    name: &'static str,
    param: TrackParam,
    touch: Option<TouchKind>,
}

impl Action for TrackParamAction {
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if let Some(track) = env.track(site) {
            env.host.set_track_param(track, self.param, value);
        }
    }

    fn touch(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if let Some(kind) = self.touch {
            env.navigation.set_touched(site.navigator, kind, is_press(value));
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        Some(FeedbackValue::Number(env.host.track_param(track, self.param)))
    }
}

/// On/off track parameter toggled by a press
struct TrackToggleAction {
    name: &'static str,
    param: TrackParam,
}

impl Action for TrackToggleAction {
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        if let Some(track) = env.track(site) {
            let on = env.host.track_param(track, self.param) > 0.5;
            env.host.set_track_param(track, self.param, if on { 0.0 } else { 1.0 });
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        Some(flag(env.host.track_param(track, self.param) > 0.5))
    }
}

fn is_selected(env: &ActionEnv<'_>, track: TrackId) -> bool {
    env.host.selected_tracks().contains(&track)
}

struct TrackSelect;

impl Action for TrackSelect {
    fn name(&self) -> &'static str {
        "TrackSelect"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        if let Some(track) = env.track(site) {
            let selected = is_selected(env, track);
            env.host.set_selected(track, !selected);
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        Some(flag(is_selected(env, track)))
    }
}

struct TrackUniqueSelect;

impl Action for TrackUniqueSelect {
    fn name(&self) -> &'static str {
        "TrackUniqueSelect"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        if let Some(track) = env.track(site) {
            env.host.unique_select(track);
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        Some(flag(is_selected(env, track)))
    }
}

struct TrackNameDisplay;

impl Action for TrackNameDisplay {
    fn name(&self) -> &'static str {
        "TrackNameDisplay"
    }

    fn do_action(&self, _site: &ActionSite<'_>, _env: &mut ActionEnv<'_>, _value: f64) {}

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        let name = if track == env.host.master_track() {
            "MASTER".to_string()
        } else {
            env.host.track_info(track)?.name
        };
        Some(FeedbackValue::Text(name))
    }
}

struct TrackVolumeDisplay;

impl Action for TrackVolumeDisplay {
    fn name(&self) -> &'static str {
        "TrackVolumeDisplay"
    }

    fn do_action(&self, _site: &ActionSite<'_>, _env: &mut ActionEnv<'_>, _value: f64) {}

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        let volume = env.host.track_param(track, TrackParam::Volume);
        Some(FeedbackValue::Text(format!("{:.0}%", volume * 100.0)))
    }
}

/// Send or receive level; the index is the binding's param plus the bank offset
struct RoutingVolume {
    name: &'static str,
    receive: bool,
}

impl RoutingVolume {
    fn category(&self, navigator: Navigator) -> BankCategory {
        match (navigator, self.receive) {
            (Navigator::Selected | Navigator::FocusedFx, false) => BankCategory::SelectedTrackSend,
            (Navigator::Selected | Navigator::FocusedFx, true) => BankCategory::SelectedTrackReceive,
            (_, false) => BankCategory::TrackSend,
            (_, true) => BankCategory::TrackReceive,
        }
    }

    /// Resolved (track, routing index), `None` when out of range
    fn target(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<(TrackId, usize)> {
        let track = env.track(site)?;
        let index = site.params.index().unwrap_or(0) + env.bank_offsets.get(self.category(site.navigator));
        let count = if self.receive {
            env.host.receive_count(track)
        } else {
            env.host.send_count(track)
        };
        (index < count).then_some((track, index))
    }
}

impl Action for RoutingVolume {
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        let Some((track, index)) = self.target(site, env) else {
            return;
        };
        if self.receive {
            env.host.set_receive_volume(track, index, value);
        } else {
            env.host.set_send_volume(track, index, value);
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let (track, index) = self.target(site, env)?;
        let volume = if self.receive {
            env.host.receive_volume(track, index)
        } else {
            env.host.send_volume(track, index)
        };
        volume.map(FeedbackValue::Number)
    }
}

/// FX parameter of the zone's FX slot
struct FxParam;

impl FxParam {
    fn target(site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<(TrackId, usize, usize)> {
        let track = env.track(site)?;
        let param = site.params.index()?;
        (site.slot_index < env.host.fx_count(track)).then_some((track, site.slot_index, param))
    }
}

impl Action for FxParam {
    fn name(&self) -> &'static str {
        "FXParam"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if let Some((track, fx, param)) = Self::target(site, env) {
            env.host.set_fx_param(track, fx, param, value);
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let (track, fx, param) = Self::target(site, env)?;
        env.host.fx_param(track, fx, param).map(FeedbackValue::Number)
    }
}

struct FxParamNameDisplay;

impl Action for FxParamNameDisplay {
    fn name(&self) -> &'static str {
        "FXParamNameDisplay"
    }

    fn do_action(&self, _site: &ActionSite<'_>, _env: &mut ActionEnv<'_>, _value: f64) {}

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let (track, fx, param) = FxParam::target(site, env)?;
        env.host.fx_param_name(track, fx, param).map(FeedbackValue::Text)
    }
}

/// Last touched FX parameter, wherever it is
struct FocusedFxParam;

impl Action for FocusedFxParam {
    fn name(&self) -> &'static str {
        "FocusedFXParam"
    }

    fn do_action(&self, _site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        match env.host.last_touched_fx_param() {
            Some((track, fx, param)) if env.host.is_valid(track) => {
                env.host.set_fx_param(track, fx, param, value);
            }
            _ => debug!("FocusedFXParam: no touched parameter"),
        }
    }

    fn current_value(&self, _site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let (track, fx, param) = env.host.last_touched_fx_param()?;
        if !env.host.is_valid(track) {
            return None;
        }
        env.host.fx_param(track, fx, param).map(FeedbackValue::Number)
    }
}

struct Transport {
    name: &'static str,
    command: TransportCommand,
}

impl Action for Transport {
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_action(&self, _site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if is_press(value) {
            env.host.transport_command(self.command);
        }
    }

    fn current_value(&self, _site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let state = env.host.transport();
        Some(flag(match self.command {
            TransportCommand::Play => state.playing,
            TransportCommand::Stop => !state.playing && !state.recording,
            TransportCommand::Record => state.recording,
        }))
    }
}

/// Register the track, FX and transport actions
pub(super) fn register_track_actions(registry: &mut ActionRegistry) {
    let params = [
        ("TrackVolume", TrackParam::Volume, TouchKind::Volume),
        ("TrackPan", TrackParam::Pan, TouchKind::Pan),
        ("TrackPanWidth", TrackParam::PanWidth, TouchKind::PanWidth),
        ("TrackPanLeft", TrackParam::PanLeft, TouchKind::PanLeft),
        ("TrackPanRight", TrackParam::PanRight, TouchKind::PanRight),
    ];
    for (name, param, touch) in params {
        registry.register(Arc::new(TrackParamAction {
            name,
            param,
            touch: Some(touch),
        }));
    }

    for (name, param) in [
        ("TrackMute", TrackParam::Mute),
        ("TrackSolo", TrackParam::Solo),
        ("TrackRecordArm", TrackParam::RecordArm),
    ] {
        registry.register(Arc::new(TrackToggleAction { name, param }));
    }

    registry.register(Arc::new(TrackSelect));
    registry.register(Arc::new(TrackUniqueSelect));
    registry.register(Arc::new(TrackNameDisplay));
    registry.register(Arc::new(TrackVolumeDisplay));
    registry.register(Arc::new(RoutingVolume {
        name: "TrackSendVolume",
        receive: false,
    }));
    registry.register(Arc::new(RoutingVolume {
        name: "TrackReceiveVolume",
        receive: true,
    }));
    registry.register(Arc::new(FxParam));
    registry.register(Arc::new(FxParamNameDisplay));
    registry.register(Arc::new(FocusedFxParam));

    for (name, command) in [
        ("Play", TransportCommand::Play),
        ("Stop", TransportCommand::Stop),
        ("Record", TransportCommand::Record),
    ] {
        registry.register(Arc::new(Transport { name, command }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionParams;
    use crate::host::{HostApi, SimulatedHost};
    use crate::modifiers::ModifierManager;
    use crate::navigation::TrackNavigationManager;
    use crate::widget::WidgetId;
    use crate::zones::{BankOffsets, ZoneCommand, ZoneId};
    use std::time::Instant;

    struct Fixture {
        host: SimulatedHost,
        navigation: TrackNavigationManager,
        modifiers: ModifierManager,
        offsets: BankOffsets,
        commands: Vec<ZoneCommand>,
        registry: ActionRegistry,
    }

    impl Fixture {
        fn new(tracks: usize) -> (Self, Vec<TrackId>) {
            let mut host = SimulatedHost::new();
            let ids = host.add_tracks(tracks);
            let mut navigation = TrackNavigationManager::new(8);
            navigation.rebuild(&host);
            let fixture = Self {
                host,
                navigation,
                modifiers: ModifierManager::default(),
                offsets: BankOffsets::default(),
                commands: Vec::new(),
                registry: ActionRegistry::new(),
            };
            (fixture, ids)
        }

        fn fire(&mut self, action: &str, navigator: Navigator, params: ActionParams, value: f64) {
            let action = self.registry.get(action);
            let site = ActionSite {
                zone: ZoneId(0),
                navigator,
                slot_index: 0,
                widget: WidgetId(0),
                params: &params,
            };
            let mut env = ActionEnv {
                host: &mut self.host,
                navigation: &mut self.navigation,
                modifiers: &mut self.modifiers,
                bank_offsets: &self.offsets,
                commands: &mut self.commands,
                now: Instant::now(),
            };
            action.do_action(&site, &mut env, value);
        }

        fn read(&mut self, action: &str, navigator: Navigator, params: ActionParams) -> Option<FeedbackValue> {
            let action = self.registry.get(action);
            let site = ActionSite {
                zone: ZoneId(0),
                navigator,
                slot_index: 0,
                widget: WidgetId(0),
                params: &params,
            };
            let env = ActionEnv {
                host: &mut self.host,
                navigation: &mut self.navigation,
                modifiers: &mut self.modifiers,
                bank_offsets: &self.offsets,
                commands: &mut self.commands,
                now: Instant::now(),
            };
            action.current_value(&site, &env)
        }
    }

    const CH1: Navigator = Navigator::Track { channel: 0 };

    #[test]
    fn test_volume_follows_channel() {
        let (mut fx, ids) = Fixture::new(4);
        fx.fire("TrackVolume", Navigator::Track { channel: 2 }, ActionParams::None, 0.4);
        assert!((fx.host.track_param(ids[2], TrackParam::Volume) - 0.4).abs() < 1e-9);
        assert_eq!(
            fx.read("TrackVolume", Navigator::Track { channel: 2 }, ActionParams::None),
            Some(FeedbackValue::Number(0.4))
        );
    }

    #[test]
    fn test_empty_channel_is_silent() {
        let (mut fx, _) = Fixture::new(2);
        let empty = Navigator::Track { channel: 5 };
        fx.fire("TrackVolume", empty, ActionParams::None, 0.4);
        assert_eq!(fx.read("TrackVolume", empty, ActionParams::None), None);
    }

    #[test]
    fn test_mute_toggles_on_press_only() {
        let (mut fx, ids) = Fixture::new(1);
        fx.fire("TrackMute", CH1, ActionParams::None, 1.0);
        fx.fire("TrackMute", CH1, ActionParams::None, 0.0);
        assert_eq!(fx.host.track_param(ids[0], TrackParam::Mute), 1.0);
        fx.fire("TrackMute", CH1, ActionParams::None, 1.0);
        assert_eq!(fx.host.track_param(ids[0], TrackParam::Mute), 0.0);
    }

    #[test]
    fn test_unique_select() {
        let (mut fx, ids) = Fixture::new(3);
        fx.host.set_selected(ids[0], true);
        fx.fire("TrackUniqueSelect", Navigator::Track { channel: 1 }, ActionParams::None, 1.0);
        assert_eq!(fx.host.selected_tracks(), vec![ids[1]]);
        assert_eq!(
            fx.read("TrackSelect", Navigator::Selected, ActionParams::None),
            Some(FeedbackValue::Number(1.0))
        );
    }

    #[test]
    fn test_name_display() {
        let (mut fx, _) = Fixture::new(2);
        assert_eq!(
            fx.read("TrackNameDisplay", Navigator::Track { channel: 1 }, ActionParams::None),
            Some(FeedbackValue::Text("Track 2".into()))
        );
        assert_eq!(
            fx.read("TrackNameDisplay", Navigator::Master, ActionParams::None),
            Some(FeedbackValue::Text("MASTER".into()))
        );
    }

    #[test]
    fn test_send_index_uses_bank_offset() {
        let (mut fx, ids) = Fixture::new(1);
        if let Some(track) = fx.host.track_mut(ids[0]) {
            track.sends = vec![0.1, 0.2, 0.3];
        }
        fx.offsets.adjust(BankCategory::TrackSend, 1);

        assert_eq!(
            fx.read("TrackSendVolume", CH1, ActionParams::Index(1)),
            Some(FeedbackValue::Number(0.3))
        );
        // Past the last send: nothing addressed
        assert_eq!(fx.read("TrackSendVolume", CH1, ActionParams::Index(2)), None);
        fx.fire("TrackSendVolume", CH1, ActionParams::Index(2), 0.9);
        assert_eq!(fx.host.send_volume(ids[0], 2), Some(0.3));
    }

    #[test]
    fn test_fx_param() {
        let (mut fx, ids) = Fixture::new(1);
        fx.host.add_fx(ids[0], "ReaEQ", &["Gain", "Freq"]);
        fx.fire("FXParam", CH1, ActionParams::Index(1), 0.25);
        assert_eq!(fx.host.fx_param(ids[0], 0, 1), Some(0.25));
        assert_eq!(
            fx.read("FXParamNameDisplay", CH1, ActionParams::Index(1)),
            Some(FeedbackValue::Text("Freq".into()))
        );
    }

    #[test]
    fn test_focused_fx_param_uses_last_touched() {
        let (mut fx, ids) = Fixture::new(1);
        fx.host.add_fx(ids[0], "ReaComp", &["Thresh", "Ratio"]);
        fx.fire("FocusedFXParam", Navigator::Master, ActionParams::None, 0.5);
        assert_eq!(fx.read("FocusedFXParam", Navigator::Master, ActionParams::None), None);

        fx.host.set_last_touched_fx_param(Some((ids[0], 0, 0)));
        fx.fire("FocusedFXParam", Navigator::Master, ActionParams::None, 0.5);
        assert_eq!(fx.host.fx_param(ids[0], 0, 0), Some(0.5));
    }

    #[test]
    fn test_transport() {
        let (mut fx, _) = Fixture::new(0);
        fx.fire("Play", Navigator::Master, ActionParams::None, 1.0);
        assert!(fx.host.transport().playing);
        assert_eq!(fx.read("Stop", Navigator::Master, ActionParams::None), Some(FeedbackValue::Number(0.0)));
        fx.fire("Stop", Navigator::Master, ActionParams::None, 1.0);
        assert!(!fx.host.transport().playing);
    }

    #[test]
    fn test_touch_sets_navigator_flag() {
        let (mut fx, _) = Fixture::new(1);
        let action = fx.registry.get("TrackPan");
        let params = ActionParams::None;
        let site = ActionSite {
            zone: ZoneId(0),
            navigator: CH1,
            slot_index: 0,
            widget: WidgetId(0),
            params: &params,
        };
        let mut env = ActionEnv {
            host: &mut fx.host,
            navigation: &mut fx.navigation,
            modifiers: &mut fx.modifiers,
            bank_offsets: &fx.offsets,
            commands: &mut fx.commands,
            now: Instant::now(),
        };
        action.touch(&site, &mut env, 1.0);
        assert!(fx.navigation.touch_state(CH1).pan);
        assert!(!fx.navigation.touch_state(CH1).volume);
    }
}
