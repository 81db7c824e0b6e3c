//! Modifier, navigation and zone actions
//!
//! Navigation actions act on the page's `TrackNavigationManager` directly.
//! Zone actions only queue a [`ZoneCommand`]; the zone manager applies the
//! queue once the current dispatch has returned.

use super::{Action, ActionEnv, ActionRegistry, ActionSite};
use crate::modifiers::Modifier;
use crate::navigation::{NavigationMode, Navigator};
use crate::widget::FeedbackValue;
use crate::zones::{BankCategory, BankTarget, ZoneCommand};
use std::sync::Arc;
use tracing::{debug, warn};

fn is_press(value: f64) -> bool {
    value != 0.0
}

fn flag(on: bool) -> FeedbackValue {
    FeedbackValue::Number(if on { 1.0 } else { 0.0 })
}

/// One of the ten modifier latches (press/release with tap-latch)
pub struct ModifierAction(pub Modifier);

impl Action for ModifierAction {
    fn name(&self) -> &'static str {
        self.0.as_str()
    }

    fn do_action(&self, _site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        env.modifiers.press(self.0, is_press(value), env.now);
    }

    fn current_value(&self, _site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        Some(flag(env.modifiers.is_engaged(self.0)))
    }
}

/// Scroll the current navigation mode by `params` channels
struct TrackBank;

impl Action for TrackBank {
    fn name(&self) -> &'static str {
        "TrackBank"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        let amount = site.params.amount().unwrap_or(0);
        env.navigation.adjust_bank(amount);
    }
}

/// `Bank <category> <amount>`: navigation categories move the page window,
/// the others adjust the surface's per-category offsets
struct Bank;

impl Action for Bank {
    fn name(&self) -> &'static str {
        "Bank"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        let tokens = site.params.tokens();
        let (Some(category), Some(amount)) = (
            tokens.first(),
            tokens.get(1).and_then(|t| t.trim().parse::<i64>().ok()),
        ) else {
            warn!("Bank expects '<category> <amount>', got {:?}", site.params);
            return;
        };

        match BankTarget::from_name(category) {
            Some(BankTarget::Navigation(mode)) => env.navigation.adjust_offset(mode, amount),
            Some(BankTarget::Category(category)) => {
                env.commands.push(ZoneCommand::AdjustBank { category, amount });
            }
            None => warn!("Unknown bank category '{}'", category),
        }
    }
}

/// Switch to (or back from) a navigation mode
struct NavigationModeAction;

impl NavigationModeAction {
    fn mode(site: &ActionSite<'_>) -> Option<NavigationMode> {
        site.params.text().and_then(NavigationMode::from_name)
    }
}

impl Action for NavigationModeAction {
    fn name(&self) -> &'static str {
        "NavigationMode"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        match Self::mode(site) {
            Some(mode) => env.navigation.toggle_mode(mode),
            None => warn!("NavigationMode: unknown mode {:?}", site.params),
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        Self::mode(site).map(|mode| flag(env.navigation.mode() == mode))
    }
}

struct ToggleVcaSpill;

impl Action for ToggleVcaSpill {
    fn name(&self) -> &'static str {
        "ToggleVCASpill"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        if let Some(track) = env.track(site) {
            env.navigation.toggle_vca_spill(track, &*env.host);
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        Some(flag(env.navigation.vca_lead() == Some(track)))
    }
}

struct ToggleFolderSpill;

impl Action for ToggleFolderSpill {
    fn name(&self) -> &'static str {
        "ToggleFolderSpill"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        if let Some(track) = env.track(site) {
            env.navigation.toggle_folder_spill(track, &*env.host);
        }
    }

    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        Some(flag(env.navigation.folder_parent() == Some(track)))
    }
}

struct ToggleScrollLink;

impl Action for ToggleScrollLink {
    fn name(&self) -> &'static str {
        "ToggleScrollLink"
    }

    fn do_action(&self, _site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if is_press(value) {
            env.navigation.toggle_scroll_link();
        }
    }

    fn current_value(&self, _site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        Some(flag(env.navigation.is_scroll_link_enabled()))
    }
}

/// Press-only action whose whole effect is one queued zone command
struct QueueCommand {
    name: &'static str,
    build: fn(&ActionSite<'_>) -> Option<ZoneCommand>,
}

impl Action for QueueCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        match (self.build)(site) {
            Some(command) => {
                debug!("{} queued {:?}", self.name, command);
                env.commands.push(command);
            }
            None => warn!("{}: missing parameter", self.name),
        }
    }
}

/// Open the FX at `params + FX menu offset` on the zone's track
struct GoFxSlot;

impl GoFxSlot {
    fn category(navigator: Navigator) -> BankCategory {
        match navigator {
            Navigator::Selected | Navigator::FocusedFx => BankCategory::SelectedTrackFxMenu,
            Navigator::Master => BankCategory::MasterTrackFxMenu,
            Navigator::Track { .. } => BankCategory::TrackFxMenu,
        }
    }

    fn fx_index(site: &ActionSite<'_>, env: &ActionEnv<'_>) -> usize {
        site.params.index().unwrap_or(0) + env.bank_offsets.get(Self::category(site.navigator))
    }
}

impl Action for GoFxSlot {
    fn name(&self) -> &'static str {
        "GoFXSlot"
    }

    fn do_action(&self, site: &ActionSite<'_>, env: &mut ActionEnv<'_>, value: f64) {
        if !is_press(value) {
            return;
        }
        let fx_index = Self::fx_index(site, env);
        env.commands.push(ZoneCommand::GoFxSlot {
            navigator: site.navigator,
            fx_index,
        });
    }

    /// Name of the FX this button would open
    fn current_value(&self, site: &ActionSite<'_>, env: &ActionEnv<'_>) -> Option<FeedbackValue> {
        let track = env.track(site)?;
        env.host
            .fx_name(track, Self::fx_index(site, env))
            .map(FeedbackValue::Text)
    }
}

/// Register navigation and zone actions (modifiers are registered separately)
pub(super) fn register_control_actions(registry: &mut ActionRegistry) {
    registry.register(Arc::new(TrackBank));
    registry.register(Arc::new(Bank));
    registry.register(Arc::new(NavigationModeAction));
    registry.register(Arc::new(ToggleVcaSpill));
    registry.register(Arc::new(ToggleFolderSpill));
    registry.register(Arc::new(ToggleScrollLink));
    registry.register(Arc::new(GoFxSlot));

    let queued: [(&'static str, fn(&ActionSite<'_>) -> Option<ZoneCommand>); 8] = [
        ("GoHome", |_| Some(ZoneCommand::GoHome)),
        ("GoSubZone", |site| {
            site.params.text().map(|name| ZoneCommand::GoSubZone {
                from: site.zone,
                name: name.to_string(),
                slot_index: site.slot_index,
            })
        }),
        ("LeaveSubZone", |site| Some(ZoneCommand::LeaveSubZone { from: site.zone })),
        ("GoAssociatedZone", |site| {
            site.params
                .text()
                .map(|name| ZoneCommand::GoAssociatedZone { name: name.to_string() })
        }),
        ("ClearFXSlot", |site| Some(ZoneCommand::ClearFxSlot { zone: site.zone })),
        ("GoSelectedTrackFX", |_| Some(ZoneCommand::GoSelectedTrackFx)),
        ("ToggleEnableFocusedFXMapping", |_| Some(ZoneCommand::ToggleFocusedFxMapping)),
        ("ToggleEnableFocusedFXParamMapping", |_| {
            Some(ZoneCommand::ToggleFocusedFxParamMapping)
        }),
    ];
    for (name, build) in queued {
        registry.register(Arc::new(QueueCommand { name, build }));
    }
}
