//! Input dispatch and feedback refresh

use super::{PageContext, Zone, ZoneId, ZoneManager};
use crate::action::ActionEnv;
use crate::widget::{Widget, WidgetId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Outcome of offering an input to a zone tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Consumed,
    NotConsumed,
}

impl Dispatch {
    pub fn is_consumed(self) -> bool {
        self == Dispatch::Consumed
    }
}

/// Normalised input offered to the zones
#[derive(Debug, Clone, Copy)]
enum Input {
    Absolute(f64),
    Relative { delta: f64, acceleration: Option<usize> },
    Touch(f64),
}

/// Depth-first search: sub-zones, associated zones, included zones, then own
/// bindings. Only active zones take part.
fn dispatch_zone(
    zones: &mut HashMap<ZoneId, Zone>,
    id: ZoneId,
    widget: WidgetId,
    input: Input,
    env: &mut ActionEnv<'_>,
) -> Dispatch {
    let children = match zones.get(&id) {
        Some(zone) if zone.active => zone.children(),
        _ => return Dispatch::NotConsumed,
    };

    for child in children {
        if dispatch_zone(zones, child, widget, input, env).is_consumed() {
            return Dispatch::Consumed;
        }
    }

    let Some(zone) = zones.get_mut(&id) else {
        return Dispatch::NotConsumed;
    };
    if !zone.owns_widget(widget) {
        return Dispatch::NotConsumed;
    }

    let navigator = zone.navigator;
    let slot_index = zone.slot_index;
    let name = zone.name.clone();
    match zone.current_contexts_mut(widget) {
        Some(contexts) => {
            for context in contexts.iter_mut() {
                trace!("{} → {} {:?}", name, context.action_name(), input);
                match input {
                    Input::Absolute(value) => context.do_action(navigator, slot_index, env, value),
                    Input::Relative {
                        delta,
                        acceleration: Some(index),
                    } => context.do_accelerated_relative_action(navigator, slot_index, env, index, delta),
                    Input::Relative {
                        delta,
                        acceleration: None,
                    } => context.do_relative_action(navigator, slot_index, env, delta),
                    Input::Touch(value) => context.do_touch(navigator, slot_index, env, value),
                }
            }
        }
        None => debug!("{}: no binding for the active modifiers", name),
    }
    Dispatch::Consumed
}

/// Feedback walk: same order as dispatch, but every active zone contributes
/// for widgets nobody has claimed yet this tick
fn update_zone(
    zones: &mut HashMap<ZoneId, Zone>,
    id: ZoneId,
    widgets: &mut [Widget],
    used: &mut HashSet<WidgetId>,
    env: &ActionEnv<'_>,
) {
    let children = match zones.get(&id) {
        Some(zone) if zone.active => zone.children(),
        _ => return,
    };
    for child in children {
        update_zone(zones, child, widgets, used, env);
    }

    let Some(zone) = zones.get_mut(&id) else {
        return;
    };
    let navigator = zone.navigator;
    let slot_index = zone.slot_index;
    let mut owned: Vec<WidgetId> = zone.widgets().collect();
    owned.sort_unstable();

    for widget_id in owned {
        if used.contains(&widget_id) {
            continue;
        }
        let Some(widget) = widgets.get_mut(widget_id.0) else {
            continue;
        };
        if widget.is_squelched(env.now) {
            used.insert(widget_id);
            continue;
        }
        if let Some(context) = zone.current_contexts_mut(widget_id).and_then(|c| c.first_mut()) {
            context.request_update(navigator, slot_index, env, widget);
            used.insert(widget_id);
        }
    }
}

fn run_deferred_zone(zones: &mut HashMap<ZoneId, Zone>, id: ZoneId, env: &mut ActionEnv<'_>) {
    let children = match zones.get(&id) {
        Some(zone) if zone.active => zone.children(),
        _ => return,
    };
    for child in children {
        run_deferred_zone(zones, child, env);
    }
    if let Some(zone) = zones.get_mut(&id) {
        let navigator = zone.navigator;
        let slot_index = zone.slot_index;
        for context in zone.all_contexts_mut() {
            context.run_deferred_actions(navigator, slot_index, env);
        }
    }
}

impl ZoneManager {
    fn dispatch(&mut self, ctx: &mut PageContext<'_>, widget: WidgetId, input: Input) -> Dispatch {
        let roots = self.roots();
        let ZoneManager {
            zones,
            bank_offsets,
            pending,
            ..
        } = self;
        let mut env = ActionEnv {
            host: &mut *ctx.host,
            navigation: &mut *ctx.navigation,
            modifiers: &mut *ctx.modifiers,
            bank_offsets,
            commands: pending,
            now: ctx.now,
        };

        for root in roots {
            if dispatch_zone(zones, root, widget, input, &mut env).is_consumed() {
                return Dispatch::Consumed;
            }
        }
        Dispatch::NotConsumed
    }

    fn mark_input(&mut self, widget: WidgetId, ctx: &PageContext<'_>) {
        if let Some(w) = self.widgets.get_mut(widget.0) {
            w.mark_input(ctx.now);
        }
    }

    /// Absolute input (fader position, button press/release)
    pub fn do_action(&mut self, ctx: &mut PageContext<'_>, widget: WidgetId, value: f64) -> Dispatch {
        self.mark_input(widget, ctx);
        self.dispatch(ctx, widget, Input::Absolute(value))
    }

    /// Signed relative input
    pub fn do_relative_action(&mut self, ctx: &mut PageContext<'_>, widget: WidgetId, delta: f64) -> Dispatch {
        self.mark_input(widget, ctx);
        self.dispatch(
            ctx,
            widget,
            Input::Relative {
                delta,
                acceleration: None,
            },
        )
    }

    /// Relative input with an acceleration index
    pub fn do_accelerated_relative_action(
        &mut self,
        ctx: &mut PageContext<'_>,
        widget: WidgetId,
        acceleration_index: usize,
        delta: f64,
    ) -> Dispatch {
        self.mark_input(widget, ctx);
        self.dispatch(
            ctx,
            widget,
            Input::Relative {
                delta,
                acceleration: Some(acceleration_index),
            },
        )
    }

    /// Raw encoder value, decoded with the widget's acceleration table
    pub fn do_relative_raw(&mut self, ctx: &mut PageContext<'_>, widget: WidgetId, raw: u8) -> Dispatch {
        let decoded = self.widgets.get(widget.0).and_then(|w| w.decode_relative(raw));
        match decoded {
            Some((delta, index)) => self.do_accelerated_relative_action(ctx, widget, index, delta),
            None => {
                debug!("{}: raw value {} is not a relative step", self.name, raw);
                Dispatch::NotConsumed
            }
        }
    }

    /// Touch input; updates touch-qualified binding selection first
    pub fn do_touch(&mut self, ctx: &mut PageContext<'_>, widget: WidgetId, value: f64) -> Dispatch {
        self.set_widget_touched(widget, value != 0.0);
        self.dispatch(ctx, widget, Input::Touch(value))
    }

    /// Push current values to every widget; unclaimed widgets are cleared
    pub fn request_update(&mut self, ctx: &mut PageContext<'_>) {
        let roots = self.roots();
        let ZoneManager {
            zones,
            widgets,
            bank_offsets,
            pending,
            ..
        } = self;
        let env = ActionEnv {
            host: &mut *ctx.host,
            navigation: &mut *ctx.navigation,
            modifiers: &mut *ctx.modifiers,
            bank_offsets,
            commands: pending,
            now: ctx.now,
        };

        let mut used = HashSet::new();
        for root in roots {
            update_zone(zones, root, widgets, &mut used, &env);
        }

        for (idx, widget) in widgets.iter_mut().enumerate() {
            if !used.contains(&WidgetId(idx)) {
                widget.clear();
            }
        }
    }

    /// Give held bindings a chance to fire
    pub fn run_deferred_actions(&mut self, ctx: &mut PageContext<'_>) {
        let roots = self.roots();
        let ZoneManager {
            zones,
            bank_offsets,
            pending,
            ..
        } = self;
        let mut env = ActionEnv {
            host: &mut *ctx.host,
            navigation: &mut *ctx.navigation,
            modifiers: &mut *ctx.modifiers,
            bank_offsets,
            commands: pending,
            now: ctx.now,
        };
        for root in roots {
            run_deferred_zone(zones, root, &mut env);
        }
    }
}
