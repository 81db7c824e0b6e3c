//! Actions - what a widget does when it fires
//!
//! An [`Action`] is a stateless operation looked up by name in the
//! [`ActionRegistry`]. Per-binding state (ranges, stepped values,
//! acceleration, hold delay) lives in the [`ActionContext`] that wraps it.
//!
//! Actions reach the outside world only through [`ActionEnv`]: the host, the
//! page's navigation and modifier managers, the surface's bank offsets, and a
//! command queue for zone-tree changes that must not happen mid-dispatch.

mod context;
mod control;
mod track;

pub use context::ActionContext;

use crate::host::{HostApi, TrackId};
use crate::modifiers::{Modifier, ModifierManager};
use crate::navigation::{Navigator, TrackNavigationManager};
use crate::widget::{FeedbackValue, WidgetId};
use crate::zones::{BankOffsets, ZoneCommand, ZoneId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Parameter payload of a binding
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActionParams {
    #[default]
    None,
    /// Numeric parameter (FX param index, bank amount, ...)
    Index(i64),
    /// String parameter (zone name, mode name, ...)
    Text(String),
    /// Free-form token list
    Tokens(Vec<String>),
}

impl ActionParams {
    /// Non-negative numeric parameter
    pub fn index(&self) -> Option<usize> {
        match self {
            ActionParams::Index(i) if *i >= 0 => Some(*i as usize),
            ActionParams::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Signed numeric parameter
    pub fn amount(&self) -> Option<i64> {
        match self {
            ActionParams::Index(i) => Some(*i),
            ActionParams::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ActionParams::Text(s) => Some(s),
            ActionParams::Tokens(tokens) => tokens.first().map(|s| s.as_str()),
            _ => None,
        }
    }

    pub fn tokens(&self) -> &[String] {
        match self {
            ActionParams::Tokens(tokens) => tokens,
            _ => &[],
        }
    }
}

/// Where an action is executing: its zone, navigator, slot and parameters
#[derive(Debug, Clone, Copy)]
pub struct ActionSite<'a> {
    pub zone: ZoneId,
    pub navigator: Navigator,
    pub slot_index: usize,
    pub widget: WidgetId,
    pub params: &'a ActionParams,
}

/// Everything an action may read or change
pub struct ActionEnv<'a> {
    pub host: &'a mut dyn HostApi,
    pub navigation: &'a mut TrackNavigationManager,
    pub modifiers: &'a mut ModifierManager,
    pub bank_offsets: &'a BankOffsets,
    /// Zone-tree changes, applied by the zone manager after dispatch
    pub commands: &'a mut Vec<ZoneCommand>,
    pub now: Instant,
}

impl ActionEnv<'_> {
    /// Resolve the site's navigator to a live track
    pub fn track(&self, site: &ActionSite<'_>) -> Option<TrackId> {
        site.navigator.resolve(&*self.navigation, &*self.host)
    }
}

/// Action trait - every bindable operation implements this
///
/// Actions are shared between all bindings using them, so they hold no
/// per-binding state.
pub trait Action: Send + Sync {
    /// Registry name (e.g. "TrackVolume")
    fn name(&self) -> &'static str;

    /// Absolute value entry point
    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64);

    /// Touch entry point
    ///
    /// Default implementation: no-op (most controls are not touch sensitive)
    fn touch(&self, _site: &ActionSite<'_>, _env: &mut ActionEnv<'_>, _value: f64) {}

    /// Current value for feedback, `None` when nothing is addressed
    ///
    /// Default implementation: no feedback
    fn current_value(&self, _site: &ActionSite<'_>, _env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        None
    }
}

/// Fallback for unknown action names: never does anything
pub struct NoAction;

impl Action for NoAction {
    fn name(&self) -> &'static str {
        "NoAction"
    }

    fn do_action(&self, _site: &ActionSite<'_>, _env: &mut ActionEnv<'_>, _value: f64) {}
}

/// Action registry - maps names to shared action implementations
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
    no_action: Arc<dyn Action>,
}

impl ActionRegistry {
    /// Create an empty registry (only the NoAction fallback)
    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
            no_action: Arc::new(NoAction),
        }
    }

    /// Create a registry with every built-in action
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(NoAction));
        track::register_track_actions(&mut registry);
        control::register_control_actions(&mut registry);
        for modifier in Modifier::all() {
            registry.register(Arc::new(control::ModifierAction(*modifier)));
        }
        registry
    }

    /// Add or replace an action
    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    /// Look up an action; unknown names resolve to NoAction
    pub fn get(&self, name: &str) -> Arc<dyn Action> {
        match self.actions.get(name) {
            Some(action) => action.clone(),
            None => {
                debug!("Unknown action '{}', binding as NoAction", name);
                self.no_action.clone()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_action_is_no_action() {
        let registry = ActionRegistry::new();
        let action = registry.get("DoesNotExist");
        assert_eq!(action.name(), "NoAction");
        assert!(!registry.contains("DoesNotExist"));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ActionRegistry::new();
        for name in [
            "TrackVolume",
            "TrackPan",
            "FXParam",
            "Shift",
            "Scrub",
            "GoSubZone",
            "GoAssociatedZone",
            "ToggleVCASpill",
            "Bank",
        ] {
            assert!(registry.contains(name), "missing {}", name);
            assert_eq!(registry.get(name).name(), name);
        }
    }

    #[test]
    fn test_params_accessors() {
        assert_eq!(ActionParams::Index(3).index(), Some(3));
        assert_eq!(ActionParams::Index(-8).index(), None);
        assert_eq!(ActionParams::Index(-8).amount(), Some(-8));
        assert_eq!(ActionParams::Text("12".into()).index(), Some(12));
        assert_eq!(ActionParams::Text("Send".into()).text(), Some("Send"));
        let tokens = ActionParams::Tokens(vec!["TrackSend".into(), "1".into()]);
        assert_eq!(tokens.tokens().len(), 2);
        assert_eq!(tokens.text(), Some("TrackSend"));
        assert_eq!(ActionParams::None.index(), None);
    }
}
