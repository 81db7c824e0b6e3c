//! Host automation API
//!
//! The engine never talks to a DAW directly. Track enumeration, group
//! membership, FX parameters, selection, focus and transport all go through
//! [`HostApi`], which an integration implements on top of the real host.
//! [`SimulatedHost`] is an in-memory implementation used by the binary and
//! the test-suite.

pub mod simulated;

use serde::{Deserialize, Serialize};

pub use simulated::{SimFx, SimTrack, SimulatedHost};

/// Stable host-side track handle
///
/// Handles may go stale between ticks (track deleted); always check
/// [`HostApi::is_valid`] before using one obtained in an earlier tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// 64-bit group membership: 32-bit base mask plus 32-bit "high" extension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMask {
    pub low: u32,
    pub high: u32,
}

impl GroupMask {
    pub fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    pub fn is_empty(&self) -> bool {
        self.low == 0 && self.high == 0
    }

    /// Bit-for-bit overlap on either half
    pub fn intersects(&self, other: &GroupMask) -> bool {
        (self.low & other.low) != 0 || (self.high & other.high) != 0
    }
}

/// Per-track metadata needed for addressing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    /// Folder depth change: 1 opens a folder, 0 is a normal track, -n closes n levels
    pub folder_depth: i32,
    /// VCA groups this track leads
    pub vca_master: GroupMask,
    /// VCA groups this track follows
    pub vca_slave: GroupMask,
}

/// Focused FX state bit: a track FX window has focus
pub const FX_FOCUS_TRACK: u32 = 1;
/// Focused FX state bit: an item/take FX window has focus
pub const FX_FOCUS_ITEM: u32 = 2;
/// Focused FX state bit: the window lost focus but is still open
pub const FX_FOCUS_LOST: u32 = 4;

/// Result of polling the host's focused-FX accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusedFx {
    /// Bitmask of `FX_FOCUS_*` flags
    pub state: u32,
    pub track: TrackId,
    pub fx_index: usize,
}

impl FocusedFx {
    /// Whether a track FX currently holds focus
    pub fn is_track_fx_focused(&self) -> bool {
        self.state & FX_FOCUS_TRACK != 0 && self.state & FX_FOCUS_LOST == 0
    }
}

/// Normalised (0.0-1.0) per-track parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackParam {
    Volume,
    Pan,
    PanWidth,
    PanLeft,
    PanRight,
    Mute,
    Solo,
    RecordArm,
}

impl TrackParam {
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Transport state snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportState {
    pub playing: bool,
    pub recording: bool,
}

/// Transport commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Stop,
    Record,
}

/// Host automation trait - all DAW integrations implement this
///
/// Only `&mut self` methods change host state; everything else is a query.
pub trait HostApi {
    /// Tracks in mixer order (master excluded)
    fn tracks(&self) -> Vec<TrackId>;

    fn master_track(&self) -> TrackId;

    /// Whether a previously obtained handle still designates a live track
    fn is_valid(&self, track: TrackId) -> bool;

    fn track_info(&self, track: TrackId) -> Option<TrackInfo>;

    fn selected_tracks(&self) -> Vec<TrackId>;

    fn set_selected(&mut self, track: TrackId, selected: bool);

    /// Select `track` and deselect everything else
    fn unique_select(&mut self, track: TrackId) {
        for other in self.selected_tracks() {
            if other != track {
                self.set_selected(other, false);
            }
        }
        self.set_selected(track, true);
    }

    fn track_param(&self, track: TrackId, param: TrackParam) -> f64;

    fn set_track_param(&mut self, track: TrackId, param: TrackParam, value: f64);

    fn send_count(&self, track: TrackId) -> usize;

    fn send_volume(&self, track: TrackId, send: usize) -> Option<f64>;

    fn set_send_volume(&mut self, track: TrackId, send: usize, value: f64);

    fn receive_count(&self, track: TrackId) -> usize;

    fn receive_volume(&self, track: TrackId, receive: usize) -> Option<f64>;

    fn set_receive_volume(&mut self, track: TrackId, receive: usize, value: f64);

    fn fx_count(&self, track: TrackId) -> usize;

    fn fx_name(&self, track: TrackId, fx: usize) -> Option<String>;

    fn fx_param(&self, track: TrackId, fx: usize, param: usize) -> Option<f64>;

    fn fx_param_name(&self, track: TrackId, fx: usize, param: usize) -> Option<String>;

    fn set_fx_param(&mut self, track: TrackId, fx: usize, param: usize, value: f64);

    /// Poll the focused FX window (None when no FX window was ever focused)
    fn focused_fx(&self) -> Option<FocusedFx>;

    /// Last touched FX parameter as `(track, fx, param)`
    fn last_touched_fx_param(&self) -> Option<(TrackId, usize, usize)>;

    fn transport(&self) -> TransportState;

    fn transport_command(&mut self, command: TransportCommand);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_mask_matches_bit_for_bit() {
        let lead = GroupMask::new(0b0100, 0);
        assert!(lead.intersects(&GroupMask::new(0b0110, 0)));
        assert!(!lead.intersects(&GroupMask::new(0b1000, 0)));

        // High half is matched independently of the low half
        let high_lead = GroupMask::new(0, 1 << 3);
        assert!(high_lead.intersects(&GroupMask::new(0, 1 << 3)));
        assert!(!high_lead.intersects(&GroupMask::new(1 << 3, 0)));
    }

    #[test]
    fn test_focused_fx_state() {
        let track = TrackId(1);
        let focused = FocusedFx { state: FX_FOCUS_TRACK, track, fx_index: 0 };
        assert!(focused.is_track_fx_focused());

        let lost = FocusedFx { state: FX_FOCUS_TRACK | FX_FOCUS_LOST, track, fx_index: 0 };
        assert!(!lost.is_track_fx_focused());

        let item = FocusedFx { state: FX_FOCUS_ITEM, track, fx_index: 0 };
        assert!(!item.is_track_fx_focused());
    }
}
