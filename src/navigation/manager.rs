//! Bank offsets, VCA/folder spill and selected-tracks addressing
//!
//! The manager owns four addressing modes, each with its own candidate list
//! and offset into it:
//!
//! ```text
//! Tracks          every track in mixer order
//! Vca             top-level VCA leads, or [lead] + its followers when spilled
//! Folder          top-level folder parents, or [parent] + its children when spilled
//! SelectedTracks  the host selection
//! ```
//!
//! Candidate lists are rebuilt once per tick (`rebuild`) before any channel
//! is resolved. Every offset satisfies
//! `0 <= offset <= max(0, candidates - channel_count)` after every change.

use super::{Navigator, SpillStack, TouchKind, TouchState};
use crate::host::{HostApi, TrackId, TrackInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Addressing mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationMode {
    #[default]
    Tracks,
    Vca,
    Folder,
    SelectedTracks,
}

impl NavigationMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "track" | "tracks" => Some(NavigationMode::Tracks),
            "vca" => Some(NavigationMode::Vca),
            "folder" => Some(NavigationMode::Folder),
            "selectedtracks" | "selected" => Some(NavigationMode::SelectedTracks),
            _ => None,
        }
    }
}

/// Apply `amount` to `offset`, keeping the window inside `count` candidates
///
/// No-op when the whole list already fits the window.
pub fn clamp_offset(offset: usize, amount: i64, count: usize, window: usize) -> usize {
    if count <= window {
        return offset.min(count.saturating_sub(window));
    }
    let max = (count - window) as i64;
    (offset as i64 + amount).clamp(0, max) as usize
}

/// Serializable view of the navigation state
#[derive(Debug, Clone, Serialize)]
pub struct NavigationSnapshot {
    pub mode: NavigationMode,
    pub channel_count: usize,
    pub track_offset: usize,
    pub vca_offset: usize,
    pub folder_offset: usize,
    pub selected_tracks_offset: usize,
    pub vca_lead: Option<TrackId>,
    pub folder_parent: Option<TrackId>,
    pub scroll_link: bool,
    pub track_count: usize,
}

/// Owner of banking and spill policy for one page
#[derive(Debug, Clone)]
pub struct TrackNavigationManager {
    channel_count: usize,
    mode: NavigationMode,

    track_offset: usize,
    vca_offset: usize,
    folder_offset: usize,
    selected_tracks_offset: usize,

    /// Candidate lists, rebuilt every tick
    tracks: Vec<TrackId>,
    vca_tracks: Vec<TrackId>,
    folder_tracks: Vec<TrackId>,
    selected_tracks: Vec<TrackId>,

    vca_spill: SpillStack,
    folder_spill: SpillStack,

    scroll_link: bool,
    /// Visual column the selected track is brought to when scroll-linking
    scroll_link_target: usize,

    /// Touch flags per navigator
    touch: HashMap<Navigator, TouchState>,
}

impl TrackNavigationManager {
    /// Create a manager with the given window size
    pub fn new(channel_count: usize) -> Self {
        Self {
            channel_count,
            mode: NavigationMode::Tracks,
            track_offset: 0,
            vca_offset: 0,
            folder_offset: 0,
            selected_tracks_offset: 0,
            tracks: Vec::new(),
            vca_tracks: Vec::new(),
            folder_tracks: Vec::new(),
            selected_tracks: Vec::new(),
            vca_spill: SpillStack::new(),
            folder_spill: SpillStack::new(),
            scroll_link: false,
            scroll_link_target: 0,
            touch: HashMap::new(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn set_channel_count(&mut self, channel_count: usize) {
        self.channel_count = channel_count;
        self.clamp_all();
    }

    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: NavigationMode) {
        if self.mode != mode {
            info!("Navigation mode: {:?} → {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Toggle between `mode` and plain track mode
    pub fn toggle_mode(&mut self, mode: NavigationMode) {
        if self.mode == mode {
            self.set_mode(NavigationMode::Tracks);
        } else {
            self.set_mode(mode);
        }
    }

    pub fn configure_scroll_link(&mut self, enabled: bool, target_channel: usize) {
        self.scroll_link = enabled;
        self.scroll_link_target = target_channel;
    }

    pub fn toggle_scroll_link(&mut self) {
        self.scroll_link = !self.scroll_link;
        debug!("Scroll link: {}", self.scroll_link);
    }

    pub fn is_scroll_link_enabled(&self) -> bool {
        self.scroll_link
    }

    fn candidates(&self, mode: NavigationMode) -> &[TrackId] {
        match mode {
            NavigationMode::Tracks => &self.tracks,
            NavigationMode::Vca => &self.vca_tracks,
            NavigationMode::Folder => &self.folder_tracks,
            NavigationMode::SelectedTracks => &self.selected_tracks,
        }
    }

    pub fn offset(&self, mode: NavigationMode) -> usize {
        match mode {
            NavigationMode::Tracks => self.track_offset,
            NavigationMode::Vca => self.vca_offset,
            NavigationMode::Folder => self.folder_offset,
            NavigationMode::SelectedTracks => self.selected_tracks_offset,
        }
    }

    fn offset_mut(&mut self, mode: NavigationMode) -> &mut usize {
        match mode {
            NavigationMode::Tracks => &mut self.track_offset,
            NavigationMode::Vca => &mut self.vca_offset,
            NavigationMode::Folder => &mut self.folder_offset,
            NavigationMode::SelectedTracks => &mut self.selected_tracks_offset,
        }
    }

    /// Resolve a page-wide channel to a track in the current mode
    pub fn track_for_channel(&self, channel: usize, host: &dyn HostApi) -> Option<TrackId> {
        let index = channel + self.offset(self.mode);
        self.candidates(self.mode)
            .get(index)
            .copied()
            .filter(|t| host.is_valid(*t))
    }

    /// Adjust the offset of a specific mode
    pub fn adjust_offset(&mut self, mode: NavigationMode, amount: i64) {
        let count = self.candidates(mode).len();
        let window = self.channel_count;
        let offset = self.offset_mut(mode);
        let before = *offset;
        *offset = clamp_offset(before, amount, count, window);
        if *offset != before {
            debug!("{:?} bank: {} → {} ({} candidates)", mode, before, *offset, count);
        }
    }

    /// Adjust the offset of the current mode
    pub fn adjust_bank(&mut self, amount: i64) {
        self.adjust_offset(self.mode, amount);
    }

    pub fn adjust_track_bank(&mut self, amount: i64) {
        self.adjust_offset(NavigationMode::Tracks, amount);
    }

    pub fn adjust_vca_bank(&mut self, amount: i64) {
        self.adjust_offset(NavigationMode::Vca, amount);
    }

    pub fn adjust_folder_bank(&mut self, amount: i64) {
        self.adjust_offset(NavigationMode::Folder, amount);
    }

    pub fn adjust_selected_tracks_bank(&mut self, amount: i64) {
        self.adjust_offset(NavigationMode::SelectedTracks, amount);
    }

    fn clamp_all(&mut self) {
        for mode in [
            NavigationMode::Tracks,
            NavigationMode::Vca,
            NavigationMode::Folder,
            NavigationMode::SelectedTracks,
        ] {
            self.adjust_offset(mode, 0);
        }
    }

    pub fn vca_lead(&self) -> Option<TrackId> {
        self.vca_spill.lead()
    }

    pub fn folder_parent(&self) -> Option<TrackId> {
        self.folder_spill.lead()
    }

    /// Spill (or un-spill) a VCA lead
    pub fn toggle_vca_spill(&mut self, track: TrackId, host: &dyn HostApi) {
        self.vca_spill.toggle(track);
        self.vca_offset = 0;
        info!("VCA spill lead: {:?}", self.vca_spill.lead());
        let infos = Self::collect_infos(&self.tracks, host);
        self.rebuild_vca_spill(&infos);
    }

    /// Spill (or un-spill) a folder parent
    pub fn toggle_folder_spill(&mut self, track: TrackId, host: &dyn HostApi) {
        self.folder_spill.toggle(track);
        self.folder_offset = 0;
        info!("Folder spill parent: {:?}", self.folder_spill.lead());
        let infos = Self::collect_infos(&self.tracks, host);
        self.rebuild_folder_tracks(&infos);
    }

    fn collect_infos(tracks: &[TrackId], host: &dyn HostApi) -> Vec<(TrackId, TrackInfo)> {
        tracks
            .iter()
            .filter_map(|t| host.track_info(*t).map(|info| (*t, info)))
            .collect()
    }

    /// Recompute every candidate list from the host (once per tick)
    pub fn rebuild(&mut self, host: &dyn HostApi) {
        self.tracks = host.tracks();
        let infos = Self::collect_infos(&self.tracks, host);

        // Stale leads/parents are popped before the lists are rebuilt
        let vca_changed = self.vca_spill.retain_valid(|t| {
            infos
                .iter()
                .any(|(id, info)| *id == t && !info.vca_master.is_empty())
        });
        if vca_changed {
            self.vca_offset = 0;
        }
        let folder_changed = self.folder_spill.retain_valid(|t| {
            infos
                .iter()
                .any(|(id, info)| *id == t && info.folder_depth > 0)
        });
        if folder_changed {
            self.folder_offset = 0;
        }

        self.rebuild_vca_spill(&infos);
        self.rebuild_folder_tracks(&infos);
        self.selected_tracks = host.selected_tracks();
        self.clamp_all();
    }

    fn rebuild_vca_spill(&mut self, infos: &[(TrackId, TrackInfo)]) {
        let lead_mask = self.vca_spill.lead().and_then(|lead| {
            infos
                .iter()
                .find(|(id, _)| *id == lead)
                .map(|(_, info)| (lead, info.vca_master))
        });

        self.vca_tracks = match lead_mask {
            Some((lead, mask)) => std::iter::once(lead)
                .chain(
                    infos
                        .iter()
                        .filter(|(id, info)| *id != lead && info.vca_slave.intersects(&mask))
                        .map(|(id, _)| *id),
                )
                .collect(),
            None => infos
                .iter()
                .filter(|(_, info)| !info.vca_master.is_empty() && info.vca_slave.is_empty())
                .map(|(id, _)| *id)
                .collect(),
        };
    }

    fn rebuild_folder_tracks(&mut self, infos: &[(TrackId, TrackInfo)]) {
        // Nesting level of each track, derived from cumulative folder depth
        let mut level = 0i32;
        let levels: Vec<i32> = infos
            .iter()
            .map(|(_, info)| {
                let current = level;
                level = (level + info.folder_depth).max(0);
                current
            })
            .collect();

        let parent = self
            .folder_spill
            .lead()
            .and_then(|p| infos.iter().position(|(id, _)| *id == p));

        self.folder_tracks = match parent {
            Some(pos) => {
                let parent_level = levels[pos];
                let mut children = vec![infos[pos].0];
                for (idx, (id, _)) in infos.iter().enumerate().skip(pos + 1) {
                    if levels[idx] <= parent_level {
                        break;
                    }
                    if levels[idx] == parent_level + 1 {
                        children.push(*id);
                    }
                }
                children
            }
            None => infos
                .iter()
                .zip(&levels)
                .filter(|((_, info), level)| **level == 0 && info.folder_depth > 0)
                .map(|((id, _), _)| *id)
                .collect(),
        };
    }

    /// Bring the selected track into the visible window (plain track mode)
    pub fn force_scroll_link(&mut self, host: &dyn HostApi) {
        if !self.scroll_link || self.mode != NavigationMode::Tracks {
            return;
        }

        let Some(selected) = host.selected_tracks().first().copied() else {
            return;
        };
        let Some(index) = self.tracks.iter().position(|t| *t == selected) else {
            return;
        };

        let window = self.channel_count;
        if index >= self.track_offset && index < self.track_offset + window {
            return;
        }

        let target = index.saturating_sub(self.scroll_link_target);
        self.track_offset = clamp_offset(0, target as i64, self.tracks.len(), window);
        debug!("Scroll link → track offset {}", self.track_offset);
    }

    pub fn touch_state(&self, navigator: Navigator) -> TouchState {
        self.touch.get(&navigator).copied().unwrap_or_default()
    }

    pub fn set_touched(&mut self, navigator: Navigator, kind: TouchKind, touched: bool) {
        self.touch.entry(navigator).or_default().set(kind, touched);
    }

    /// Number of candidates in a mode (as of the last rebuild)
    pub fn candidate_count(&self, mode: NavigationMode) -> usize {
        self.candidates(mode).len()
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            mode: self.mode,
            channel_count: self.channel_count,
            track_offset: self.track_offset,
            vca_offset: self.vca_offset,
            folder_offset: self.folder_offset,
            selected_tracks_offset: self.selected_tracks_offset,
            vca_lead: self.vca_spill.lead(),
            folder_parent: self.folder_spill.lead(),
            scroll_link: self.scroll_link,
            track_count: self.tracks.len(),
        }
    }

    /// Carry offsets, mode and spill state over to a freshly built manager
    pub fn inherit_from(&mut self, previous: &TrackNavigationManager) {
        self.mode = previous.mode;
        self.track_offset = previous.track_offset;
        self.vca_offset = previous.vca_offset;
        self.folder_offset = previous.folder_offset;
        self.selected_tracks_offset = previous.selected_tracks_offset;
        self.vca_spill = previous.vca_spill.clone();
        self.folder_spill = previous.folder_spill.clone();
    }
}
