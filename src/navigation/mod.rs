//! Track navigation - channel strip to track resolution
//!
//! A [`Navigator`] answers "which track does this zone address right now?".
//! Resolution is recomputed on every call because selection, bank offsets and
//! focus may change between ticks. The variants are a closed set known to the
//! zone loader, so they are an enum rather than trait objects.

mod manager;
mod spill;

pub use manager::{clamp_offset, NavigationMode, NavigationSnapshot, TrackNavigationManager};
pub use spill::SpillStack;

use crate::host::{HostApi, TrackId};
use serde::{Deserialize, Serialize};

/// Track resolution rule carried by every zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Navigator {
    /// Channel `n` (0-based, page-wide) of the current bank window
    Track { channel: usize },
    /// The host's master track
    Master,
    /// The single selected track (none when zero or several are selected)
    Selected,
    /// The track owning the focused FX window
    FocusedFx,
}

impl Navigator {
    /// Resolve to a live track handle
    ///
    /// `None` is a normal outcome (ambiguous selection, empty bank slot, stale
    /// handle) and callers treat it as a silent no-op.
    pub fn resolve(&self, navigation: &TrackNavigationManager, host: &dyn HostApi) -> Option<TrackId> {
        match self {
            Navigator::Track { channel } => navigation.track_for_channel(*channel, host),
            Navigator::Master => Some(host.master_track()),
            Navigator::Selected => {
                let selected = host.selected_tracks();
                match selected.as_slice() {
                    [only] if host.is_valid(*only) => Some(*only),
                    _ => None,
                }
            }
            Navigator::FocusedFx => host
                .focused_fx()
                .filter(|f| f.is_track_fx_focused())
                .map(|f| f.track)
                .filter(|t| host.is_valid(*t)),
        }
    }

    /// Short label for logs and the zone tree printout
    pub fn label(&self) -> String {
        match self {
            Navigator::Track { channel } => format!("Track[{}]", channel + 1),
            Navigator::Master => "Master".to_string(),
            Navigator::Selected => "Selected".to_string(),
            Navigator::FocusedFx => "FocusedFX".to_string(),
        }
    }
}

/// Which touch flag a control drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchKind {
    Volume,
    Pan,
    PanWidth,
    PanLeft,
    PanRight,
}

/// Five independent touch flags set from the host's touch callback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchState {
    pub volume: bool,
    pub pan: bool,
    pub pan_width: bool,
    pub pan_left: bool,
    pub pan_right: bool,
}

impl TouchState {
    pub fn get(&self, kind: TouchKind) -> bool {
        match kind {
            TouchKind::Volume => self.volume,
            TouchKind::Pan => self.pan,
            TouchKind::PanWidth => self.pan_width,
            TouchKind::PanLeft => self.pan_left,
            TouchKind::PanRight => self.pan_right,
        }
    }

    pub fn set(&mut self, kind: TouchKind, touched: bool) {
        match kind {
            TouchKind::Volume => self.volume = touched,
            TouchKind::Pan => self.pan = touched,
            TouchKind::PanWidth => self.pan_width = touched,
            TouchKind::PanLeft => self.pan_left = touched,
            TouchKind::PanRight => self.pan_right = touched,
        }
    }

    pub fn any(&self) -> bool {
        self.volume || self.pan || self.pan_width || self.pan_left || self.pan_right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FocusedFx, SimulatedHost, FX_FOCUS_LOST, FX_FOCUS_TRACK};

    #[test]
    fn test_selected_navigator_requires_single_selection() {
        let mut host = SimulatedHost::new();
        let ids = host.add_tracks(3);
        let nav = TrackNavigationManager::new(8);

        assert_eq!(Navigator::Selected.resolve(&nav, &host), None);

        host.set_selected(ids[1], true);
        assert_eq!(Navigator::Selected.resolve(&nav, &host), Some(ids[1]));

        host.set_selected(ids[2], true);
        assert_eq!(Navigator::Selected.resolve(&nav, &host), None);
    }

    #[test]
    fn test_master_navigator() {
        let host = SimulatedHost::new();
        let nav = TrackNavigationManager::new(8);
        assert_eq!(Navigator::Master.resolve(&nav, &host), Some(host.master_track()));
    }

    #[test]
    fn test_focused_fx_navigator() {
        let mut host = SimulatedHost::new();
        let ids = host.add_tracks(2);
        let nav = TrackNavigationManager::new(8);

        assert_eq!(Navigator::FocusedFx.resolve(&nav, &host), None);

        host.set_focused_fx(Some(FocusedFx { state: FX_FOCUS_TRACK, track: ids[1], fx_index: 0 }));
        assert_eq!(Navigator::FocusedFx.resolve(&nav, &host), Some(ids[1]));

        host.set_focused_fx(Some(FocusedFx {
            state: FX_FOCUS_TRACK | FX_FOCUS_LOST,
            track: ids[1],
            fx_index: 0,
        }));
        assert_eq!(Navigator::FocusedFx.resolve(&nav, &host), None);
    }

    #[test]
    fn test_track_navigator_follows_bank() {
        let mut host = SimulatedHost::new();
        let ids = host.add_tracks(16);
        let mut nav = TrackNavigationManager::new(8);
        nav.rebuild(&host);

        let channel = Navigator::Track { channel: 2 };
        assert_eq!(channel.resolve(&nav, &host), Some(ids[2]));

        nav.adjust_track_bank(8);
        assert_eq!(channel.resolve(&nav, &host), Some(ids[10]));
    }

    #[test]
    fn test_touch_flags_are_independent() {
        let mut touch = TouchState::default();
        touch.set(TouchKind::Pan, true);
        assert!(touch.get(TouchKind::Pan));
        assert!(!touch.get(TouchKind::Volume));
        assert!(touch.any());
        touch.set(TouchKind::Pan, false);
        assert!(!touch.any());
    }
}
