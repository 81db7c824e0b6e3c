//! Surface Zones - zone, modifier and track-navigation engine
//!
//! Binds the widgets of one or more control surfaces to host mixer actions.
//! Which action a widget drives is resolved on every input from the active
//! zone tree, the engaged modifier latches and the navigator of the zone
//! (bank window, VCA/folder spill, selection, focused FX).
//!
//! The engine is single-threaded: a [`page::Page`] owns every piece of state
//! and advances one tick at a time.

pub mod action;
pub mod cli;
pub mod config;
pub mod host;
pub mod modifiers;
pub mod navigation;
pub mod page;
pub mod widget;
pub mod zones;

pub use action::{Action, ActionContext, ActionRegistry};
pub use config::{ConfigError, PageConfig};
pub use host::{HostApi, SimulatedHost, TrackId};
pub use modifiers::{Modifier, ModifierManager};
pub use navigation::{Navigator, TrackNavigationManager};
pub use page::{InputEvent, InputKind, Page};
pub use zones::{Dispatch, ZoneManager};
