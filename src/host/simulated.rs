//! In-memory host - logs every change for testing and debugging
//!
//! This is useful for:
//! - Exercising zone files without a running DAW
//! - Driving the engine from the REPL
//! - Deterministic tests

use super::{
    FocusedFx, GroupMask, HostApi, TrackId, TrackInfo, TrackParam, TransportCommand,
    TransportState,
};
use crate::config::HostSeed;
use tracing::debug;

/// A simulated FX instance
#[derive(Debug, Clone, Default)]
pub struct SimFx {
    pub name: String,
    /// (parameter name, normalised value)
    pub params: Vec<(String, f64)>,
}

/// A simulated track
#[derive(Debug, Clone)]
pub struct SimTrack {
    pub id: TrackId,
    pub info: TrackInfo,
    pub selected: bool,
    params: [f64; 8],
    pub sends: Vec<f64>,
    pub receives: Vec<f64>,
    pub fx: Vec<SimFx>,
}

impl SimTrack {
    fn new(id: TrackId, name: &str) -> Self {
        Self {
            id,
            info: TrackInfo {
                name: name.to_string(),
                ..TrackInfo::default()
            },
            selected: false,
            // Volume at unity (~0 dB), centred pan, full width, hard L/R dual pan
            params: [0.716, 0.5, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            sends: Vec::new(),
            receives: Vec::new(),
            fx: Vec::new(),
        }
    }

    pub fn param(&self, param: TrackParam) -> f64 {
        self.params[param.index()]
    }
}

/// In-memory [`HostApi`] implementation
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    tracks: Vec<SimTrack>,
    master: SimTrack,
    next_id: u64,
    focused_fx: Option<FocusedFx>,
    last_touched: Option<(TrackId, usize, usize)>,
    transport: TransportState,
}

impl SimulatedHost {
    /// Create an empty host (master track only)
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            master: SimTrack::new(TrackId(0), "MASTER"),
            next_id: 1,
            focused_fx: None,
            last_touched: None,
            transport: TransportState::default(),
        }
    }

    /// Build a host from the `host:` section of a page config
    pub fn from_seed(seed: &HostSeed) -> Self {
        let mut host = Self::new();
        for track_seed in &seed.tracks {
            let id = host.add_track(&track_seed.name);
            if let Some(track) = host.track_mut(id) {
                track.info.folder_depth = track_seed.folder_depth;
                track.info.vca_master = GroupMask::new(track_seed.vca_master[0], track_seed.vca_master[1]);
                track.info.vca_slave = GroupMask::new(track_seed.vca_slave[0], track_seed.vca_slave[1]);
                track.selected = track_seed.selected;
                track.sends = vec![0.716; track_seed.sends];
                track.receives = vec![0.716; track_seed.receives];
                track.fx = track_seed
                    .fx
                    .iter()
                    .map(|fx| SimFx {
                        name: fx.name.clone(),
                        params: fx.params.iter().map(|p| (p.clone(), 0.0)).collect(),
                    })
                    .collect();
            }
        }
        debug!("Simulated host seeded with {} tracks", host.tracks.len());
        host
    }

    /// Append a track and return its handle
    pub fn add_track(&mut self, name: &str) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        self.tracks.push(SimTrack::new(id, name));
        id
    }

    /// Append `count` tracks named "Track N"
    pub fn add_tracks(&mut self, count: usize) -> Vec<TrackId> {
        (0..count)
            .map(|_| {
                let n = self.tracks.len() + 1;
                self.add_track(&format!("Track {}", n))
            })
            .collect()
    }

    pub fn remove_track(&mut self, track: TrackId) {
        self.tracks.retain(|t| t.id != track);
    }

    pub fn track_mut(&mut self, track: TrackId) -> Option<&mut SimTrack> {
        if track == self.master.id {
            return Some(&mut self.master);
        }
        self.tracks.iter_mut().find(|t| t.id == track)
    }

    fn track_ref(&self, track: TrackId) -> Option<&SimTrack> {
        if track == self.master.id {
            return Some(&self.master);
        }
        self.tracks.iter().find(|t| t.id == track)
    }

    /// Attach an FX with the given parameter names
    pub fn add_fx(&mut self, track: TrackId, name: &str, params: &[&str]) {
        if let Some(t) = self.track_mut(track) {
            t.fx.push(SimFx {
                name: name.to_string(),
                params: params.iter().map(|p| (p.to_string(), 0.0)).collect(),
            });
        }
    }

    pub fn set_focused_fx(&mut self, focused: Option<FocusedFx>) {
        self.focused_fx = focused;
    }

    pub fn set_last_touched_fx_param(&mut self, touched: Option<(TrackId, usize, usize)>) {
        self.last_touched = touched;
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostApi for SimulatedHost {
    fn tracks(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id).collect()
    }

    fn master_track(&self) -> TrackId {
        self.master.id
    }

    fn is_valid(&self, track: TrackId) -> bool {
        self.track_ref(track).is_some()
    }

    fn track_info(&self, track: TrackId) -> Option<TrackInfo> {
        self.track_ref(track).map(|t| t.info.clone())
    }

    fn selected_tracks(&self) -> Vec<TrackId> {
        self.tracks.iter().filter(|t| t.selected).map(|t| t.id).collect()
    }

    fn set_selected(&mut self, track: TrackId, selected: bool) {
        if let Some(t) = self.track_mut(track) {
            t.selected = selected;
            debug!("🎚️  {} selected={}", track, selected);
        }
    }

    fn track_param(&self, track: TrackId, param: TrackParam) -> f64 {
        self.track_ref(track).map(|t| t.param(param)).unwrap_or(0.0)
    }

    fn set_track_param(&mut self, track: TrackId, param: TrackParam, value: f64) {
        if let Some(t) = self.track_mut(track) {
            t.params[param.index()] = value.clamp(0.0, 1.0);
            debug!("🎚️  {} {:?}={:.3}", track, param, value);
        }
    }

    fn send_count(&self, track: TrackId) -> usize {
        self.track_ref(track).map(|t| t.sends.len()).unwrap_or(0)
    }

    fn send_volume(&self, track: TrackId, send: usize) -> Option<f64> {
        self.track_ref(track)?.sends.get(send).copied()
    }

    fn set_send_volume(&mut self, track: TrackId, send: usize, value: f64) {
        if let Some(slot) = self.track_mut(track).and_then(|t| t.sends.get_mut(send)) {
            *slot = value.clamp(0.0, 1.0);
            debug!("🎚️  {} send {}={:.3}", track, send, value);
        }
    }

    fn receive_count(&self, track: TrackId) -> usize {
        self.track_ref(track).map(|t| t.receives.len()).unwrap_or(0)
    }

    fn receive_volume(&self, track: TrackId, receive: usize) -> Option<f64> {
        self.track_ref(track)?.receives.get(receive).copied()
    }

    fn set_receive_volume(&mut self, track: TrackId, receive: usize, value: f64) {
        if let Some(slot) = self.track_mut(track).and_then(|t| t.receives.get_mut(receive)) {
            *slot = value.clamp(0.0, 1.0);
            debug!("🎚️  {} receive {}={:.3}", track, receive, value);
        }
    }

    fn fx_count(&self, track: TrackId) -> usize {
        self.track_ref(track).map(|t| t.fx.len()).unwrap_or(0)
    }

    fn fx_name(&self, track: TrackId, fx: usize) -> Option<String> {
        self.track_ref(track)?.fx.get(fx).map(|f| f.name.clone())
    }

    fn fx_param(&self, track: TrackId, fx: usize, param: usize) -> Option<f64> {
        self.track_ref(track)?.fx.get(fx)?.params.get(param).map(|(_, v)| *v)
    }

    fn fx_param_name(&self, track: TrackId, fx: usize, param: usize) -> Option<String> {
        self.track_ref(track)?
            .fx
            .get(fx)?
            .params
            .get(param)
            .map(|(n, _)| n.clone())
    }

    fn set_fx_param(&mut self, track: TrackId, fx: usize, param: usize, value: f64) {
        let slot = self
            .track_mut(track)
            .and_then(|t| t.fx.get_mut(fx))
            .and_then(|f| f.params.get_mut(param));
        if let Some((name, v)) = slot {
            *v = value.clamp(0.0, 1.0);
            debug!("🎛️  {} fx {} '{}'={:.3}", track, fx, name, value);
        }
    }

    fn focused_fx(&self) -> Option<FocusedFx> {
        self.focused_fx
    }

    fn last_touched_fx_param(&self) -> Option<(TrackId, usize, usize)> {
        self.last_touched
    }

    fn transport(&self) -> TransportState {
        self.transport
    }

    fn transport_command(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::Play => self.transport.playing = true,
            TransportCommand::Stop => {
                self.transport.playing = false;
                self.transport.recording = false;
            }
            TransportCommand::Record => self.transport.recording = !self.transport.recording,
        }
        debug!("▶️  Transport {:?} → {:?}", command, self.transport);
    }
}
