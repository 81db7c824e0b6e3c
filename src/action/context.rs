//! Per-binding execution semantics
//!
//! An `ActionContext` binds one action to one widget inside one zone and
//! shapes the values flowing through it:
//!
//! - **Range**: values are clamped into `[range_minimum, range_maximum]`
//! - **Stepped values**: button presses cycle through a table, encoders step
//!   through it gated by acceleration ticks
//! - **Acceleration**: `accelerated_tick_values[i]` raw ticks per step at
//!   acceleration index `i` (default `[10]`)
//! - **Hold delay**: a quick tap applies on release, a longer hold is
//!   deferred to `run_deferred_actions`
//! - **Inversion**: independent `1 - x` on input and on feedback

use super::{Action, ActionEnv, ActionParams, ActionSite};
use crate::navigation::Navigator;
use crate::widget::{FeedbackValue, Properties, Rgb, Widget, WidgetId};
use crate::zones::ZoneId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Default raw ticks per step
const DEFAULT_TICKS_PER_STEP: u32 = 10;

/// A press whose outcome depends on how long it is held
#[derive(Debug, Clone, Copy)]
struct PendingHold {
    started: Instant,
    value: f64,
    /// Released after the hold delay; waiting for `run_deferred_actions`
    released: bool,
}

/// One configured binding
pub struct ActionContext {
    action: Arc<dyn Action>,
    widget: WidgetId,
    zone: ZoneId,
    params: ActionParams,
    properties: Properties,

    range_minimum: f64,
    range_maximum: f64,

    stepped_values: Vec<f64>,
    stepped_values_index: usize,
    accumulated_inc_ticks: u32,
    accumulated_dec_ticks: u32,
    accelerated_tick_values: Vec<u32>,
    accelerated_delta_values: Vec<f64>,
    /// Fixed relative step; 0 means "use the raw delta"
    delta_value: f64,

    is_value_inverted: bool,
    is_feedback_inverted: bool,

    hold_delay: Option<Duration>,
    pending_hold: Option<PendingHold>,

    /// (on, off) colours for button feedback
    colors: Option<(Rgb, Rgb)>,
}

impl ActionContext {
    pub fn new(action: Arc<dyn Action>, widget: WidgetId, zone: ZoneId, params: ActionParams) -> Self {
        Self {
            action,
            widget,
            zone,
            params,
            properties: Properties::new(),
            range_minimum: 0.0,
            range_maximum: 1.0,
            stepped_values: Vec::new(),
            stepped_values_index: 0,
            accumulated_inc_ticks: 0,
            accumulated_dec_ticks: 0,
            accelerated_tick_values: vec![DEFAULT_TICKS_PER_STEP],
            accelerated_delta_values: Vec::new(),
            delta_value: 0.0,
            is_value_inverted: false,
            is_feedback_inverted: false,
            hold_delay: None,
            pending_hold: None,
            colors: None,
        }
    }

    pub fn action_name(&self) -> &'static str {
        self.action.name()
    }

    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn params(&self) -> &ActionParams {
        &self.params
    }

    pub fn set_properties(&mut self, properties: Properties) {
        self.properties = properties;
    }

    /// Set the range; bounds are ordered so that minimum <= maximum
    pub fn set_range(&mut self, minimum: f64, maximum: f64) {
        self.range_minimum = minimum.min(maximum);
        self.range_maximum = minimum.max(maximum);
    }

    pub fn range(&self) -> (f64, f64) {
        (self.range_minimum, self.range_maximum)
    }

    /// Set the stepped values table (kept non-decreasing)
    pub fn set_stepped_values(&mut self, mut values: Vec<f64>) {
        values.sort_by(|a, b| a.total_cmp(b));
        self.stepped_values = values;
        self.stepped_values_index = 0;
    }

    pub fn stepped_values(&self) -> &[f64] {
        &self.stepped_values
    }

    pub fn stepped_values_index(&self) -> usize {
        self.stepped_values_index
    }

    /// Ticks-per-step table; an empty table falls back to `[10]`
    pub fn set_accelerated_tick_values(&mut self, values: Vec<u32>) {
        self.accelerated_tick_values = if values.is_empty() {
            vec![DEFAULT_TICKS_PER_STEP]
        } else {
            values.into_iter().map(|v| v.max(1)).collect()
        };
    }

    pub fn accelerated_tick_values(&self) -> &[u32] {
        &self.accelerated_tick_values
    }

    pub fn set_accelerated_delta_values(&mut self, values: Vec<f64>) {
        self.accelerated_delta_values = values;
    }

    pub fn set_delta_value(&mut self, delta: f64) {
        self.delta_value = delta.abs();
    }

    pub fn set_value_inverted(&mut self, inverted: bool) {
        self.is_value_inverted = inverted;
    }

    pub fn set_feedback_inverted(&mut self, inverted: bool) {
        self.is_feedback_inverted = inverted;
    }

    /// Hold delay in seconds (0 disables)
    pub fn set_hold_delay_amount(&mut self, seconds: f64) {
        let millis = (seconds * 1000.0).round();
        self.hold_delay = if millis > 0.0 {
            Some(Duration::from_millis(millis as u64))
        } else {
            None
        };
        self.pending_hold = None;
    }

    pub fn hold_delay(&self) -> Option<Duration> {
        self.hold_delay
    }

    pub fn set_colors(&mut self, on: Rgb, off: Rgb) {
        self.colors = Some((on, off));
    }

    fn site(&self, navigator: Navigator, slot_index: usize) -> ActionSite<'_> {
        ActionSite {
            zone: self.zone,
            navigator,
            slot_index,
            widget: self.widget,
            params: &self.params,
        }
    }

    /// Select the stepped value nearest to `value` (first index wins ties)
    pub fn set_stepped_value_index(&mut self, value: f64) {
        let mut best: Option<(usize, f64)> = None;
        for (idx, step) in self.stepped_values.iter().enumerate() {
            let distance = (step - value).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((idx, distance));
            }
        }
        if let Some((idx, _)) = best {
            self.stepped_values_index = idx;
        }
    }

    /// Clamp into the range and hand the value to the action
    pub fn do_range_bound_action(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &mut ActionEnv<'_>,
        value: f64,
    ) {
        let value = value.clamp(self.range_minimum, self.range_maximum);
        trace!("{} ← {:.4}", self.action.name(), value);
        let site = self.site(navigator, slot_index);
        self.action.do_action(&site, env, value);
    }

    /// Absolute input (fader position, button press/release)
    pub fn do_action(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &mut ActionEnv<'_>,
        value: f64,
    ) {
        let pressed = value != 0.0;
        let value = if self.is_value_inverted { 1.0 - value } else { value };

        if let Some(delay) = self.hold_delay {
            if pressed {
                self.pending_hold = Some(PendingHold {
                    started: env.now,
                    value,
                    released: false,
                });
            } else if let Some(pending) = self.pending_hold.as_mut() {
                if env.now.saturating_duration_since(pending.started) < delay {
                    // Tap: apply right away
                    let value = pending.value;
                    self.pending_hold = None;
                    self.do_range_bound_action(navigator, slot_index, env, value);
                } else {
                    pending.released = true;
                    self.run_deferred_actions(navigator, slot_index, env);
                }
            }
            return;
        }

        if !self.stepped_values.is_empty() {
            // Presses cycle through the table, releases are ignored
            if pressed {
                self.stepped_values_index = (self.stepped_values_index + 1) % self.stepped_values.len();
                let step = self.stepped_values[self.stepped_values_index];
                self.do_range_bound_action(navigator, slot_index, env, step);
            }
            return;
        }

        self.do_range_bound_action(navigator, slot_index, env, value);
    }

    /// Relative input without acceleration information
    pub fn do_relative_action(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &mut ActionEnv<'_>,
        delta: f64,
    ) {
        self.do_accelerated_relative_action(navigator, slot_index, env, 0, delta);
    }

    /// Relative input with an acceleration index
    pub fn do_accelerated_relative_action(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &mut ActionEnv<'_>,
        acceleration_index: usize,
        delta: f64,
    ) {
        let delta = if self.is_value_inverted { -delta } else { delta };

        if !self.stepped_values.is_empty() {
            self.do_accelerated_stepped_value_action(navigator, slot_index, env, acceleration_index, delta);
        } else if !self.accelerated_delta_values.is_empty() {
            self.do_accelerated_delta_value_action(navigator, slot_index, env, acceleration_index, delta);
        } else {
            let step = if self.delta_value != 0.0 {
                self.delta_value * delta.signum()
            } else {
                delta
            };
            let current = self.current_number(navigator, slot_index, env);
            self.do_range_bound_action(navigator, slot_index, env, current + step);
        }
    }

    fn current_number(&self, navigator: Navigator, slot_index: usize, env: &ActionEnv<'_>) -> f64 {
        match self.action.current_value(&self.site(navigator, slot_index), env) {
            Some(FeedbackValue::Number(v)) => v,
            _ => 0.0,
        }
    }

    fn ticks_for(&self, acceleration_index: usize) -> u32 {
        let last = self.accelerated_tick_values.len() - 1;
        self.accelerated_tick_values[acceleration_index.min(last)]
    }

    /// Count a tick in the direction of `value`; true when a step is due
    fn accumulate_tick(&mut self, acceleration_index: usize, value: f64) -> bool {
        let threshold = self.ticks_for(acceleration_index);
        if value > 0.0 {
            self.accumulated_inc_ticks += 1;
            self.accumulated_dec_ticks = self.accumulated_dec_ticks.saturating_sub(1);
            if self.accumulated_inc_ticks >= threshold {
                self.accumulated_inc_ticks = 0;
                self.accumulated_dec_ticks = 0;
                return true;
            }
        } else if value < 0.0 {
            self.accumulated_dec_ticks += 1;
            self.accumulated_inc_ticks = self.accumulated_inc_ticks.saturating_sub(1);
            if self.accumulated_dec_ticks >= threshold {
                self.accumulated_inc_ticks = 0;
                self.accumulated_dec_ticks = 0;
                return true;
            }
        }
        false
    }

    /// Step through `stepped_values`, one step per accumulated threshold
    pub fn do_accelerated_stepped_value_action(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &mut ActionEnv<'_>,
        acceleration_index: usize,
        value: f64,
    ) {
        if self.stepped_values.is_empty() || !self.accumulate_tick(acceleration_index, value) {
            return;
        }

        let last = self.stepped_values.len() - 1;
        self.stepped_values_index = if value > 0.0 {
            (self.stepped_values_index + 1).min(last)
        } else {
            self.stepped_values_index.saturating_sub(1)
        };
        let step = self.stepped_values[self.stepped_values_index];
        self.do_range_bound_action(navigator, slot_index, env, step);
    }

    /// Apply `accelerated_delta_values[i]`, gated like the stepped variant
    pub fn do_accelerated_delta_value_action(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &mut ActionEnv<'_>,
        acceleration_index: usize,
        value: f64,
    ) {
        if self.accelerated_delta_values.is_empty() || !self.accumulate_tick(acceleration_index, value) {
            return;
        }

        let last = self.accelerated_delta_values.len() - 1;
        let delta = self.accelerated_delta_values[acceleration_index.min(last)] * value.signum();
        let current = self.current_number(navigator, slot_index, env);
        self.do_range_bound_action(navigator, slot_index, env, current + delta);
    }

    /// Touch input; a touch release settles any held value
    pub fn do_touch(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &mut ActionEnv<'_>,
        value: f64,
    ) {
        let site = self.site(navigator, slot_index);
        self.action.touch(&site, env, value);
        if value == 0.0 {
            if let Some(pending) = self.pending_hold.as_mut() {
                pending.released = true;
            }
            self.run_deferred_actions(navigator, slot_index, env);
        }
    }

    /// Apply a held value once its control has been released
    pub fn run_deferred_actions(&mut self, navigator: Navigator, slot_index: usize, env: &mut ActionEnv<'_>) {
        let (Some(delay), Some(pending)) = (self.hold_delay, self.pending_hold) else {
            return;
        };
        if pending.released && pending.started + delay <= env.now {
            self.pending_hold = None;
            trace!("{} held, applying {:.3}", self.action.name(), pending.value);
            self.do_range_bound_action(navigator, slot_index, env, pending.value);
        }
    }

    pub fn has_pending_hold(&self) -> bool {
        self.pending_hold.is_some()
    }

    /// Push the action's current value through `widget`
    pub fn request_update(
        &mut self,
        navigator: Navigator,
        slot_index: usize,
        env: &ActionEnv<'_>,
        widget: &mut Widget,
    ) {
        let value = self
            .action
            .current_value(&self.site(navigator, slot_index), env);

        match value {
            Some(FeedbackValue::Number(v)) => {
                if !self.stepped_values.is_empty() {
                    self.set_stepped_value_index(v);
                }
                let v = if self.is_feedback_inverted { 1.0 - v } else { v };
                widget.update_value(&self.properties, &FeedbackValue::Number(v));
                if let Some((on, off)) = self.colors {
                    widget.update_color(if v > 0.5 { on } else { off });
                }
            }
            Some(text @ FeedbackValue::Text(_)) => widget.update_value(&self.properties, &text),
            None => widget.clear(),
        }
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("action", &self.action.name())
            .field("widget", &self.widget)
            .field("zone", &self.zone)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostApi, SimulatedHost, TrackParam};
    use crate::modifiers::ModifierManager;
    use crate::navigation::TrackNavigationManager;
    use crate::widget::RecordingSink;
    use crate::zones::{BankOffsets, ZoneCommand};
    use std::sync::Mutex;

    /// Records every value it receives; feedback returns the last one
    struct Spy(Mutex<Vec<f64>>);

    impl Spy {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Vec::new())))
        }

        fn values(&self) -> Vec<f64> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Action for Spy {
        fn name(&self) -> &'static str {
            "Spy"
        }

        fn do_action(&self, _site: &ActionSite<'_>, _env: &mut ActionEnv<'_>, value: f64) {
            self.0.lock().unwrap().push(value);
        }

        fn current_value(&self, _site: &ActionSite<'_>, _env: &ActionEnv<'_>) -> Option<FeedbackValue> {
            Some(FeedbackValue::Number(self.0.lock().unwrap().last().copied().unwrap_or(0.0)))
        }
    }

    struct Fixture {
        host: SimulatedHost,
        navigation: TrackNavigationManager,
        modifiers: ModifierManager,
        offsets: BankOffsets,
        commands: Vec<ZoneCommand>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                host: SimulatedHost::new(),
                navigation: TrackNavigationManager::new(8),
                modifiers: ModifierManager::default(),
                offsets: BankOffsets::default(),
                commands: Vec::new(),
            }
        }

        fn env(&mut self, now: Instant) -> ActionEnv<'_> {
            ActionEnv {
                host: &mut self.host,
                navigation: &mut self.navigation,
                modifiers: &mut self.modifiers,
                bank_offsets: &self.offsets,
                commands: &mut self.commands,
                now,
            }
        }
    }

    const NAV: Navigator = Navigator::Master;

    fn spy_context() -> (ActionContext, Arc<Spy>) {
        let spy = Spy::new();
        let ctx = ActionContext::new(spy.clone(), WidgetId(0), ZoneId(0), ActionParams::None);
        (ctx, spy)
    }

    #[test]
    fn test_range_clamps() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_range(0.2, 0.8);

        let mut env = fx.env(Instant::now());
        ctx.do_action(NAV, 0, &mut env, 1.0);
        ctx.do_action(NAV, 0, &mut env, 0.0);
        ctx.do_action(NAV, 0, &mut env, 0.5);
        assert_eq!(spy.values(), vec![0.8, 0.2, 0.5]);
    }

    #[test]
    fn test_range_bounds_are_ordered() {
        let (mut ctx, _) = spy_context();
        ctx.set_range(0.9, 0.1);
        assert_eq!(ctx.range(), (0.1, 0.9));
    }

    #[test]
    fn test_stepped_value_nearest_match() {
        let (mut ctx, _) = spy_context();
        ctx.set_stepped_values(vec![0.0, 0.5, 1.0]);

        ctx.set_stepped_value_index(0.6);
        assert_eq!(ctx.stepped_values_index(), 1);
        ctx.set_stepped_value_index(0.76);
        assert_eq!(ctx.stepped_values_index(), 2);
        // Exactly between 0.0 and 0.5: first closest wins
        ctx.set_stepped_value_index(0.25);
        assert_eq!(ctx.stepped_values_index(), 0);
    }

    #[test]
    fn test_stepped_values_sorted() {
        let (mut ctx, _) = spy_context();
        ctx.set_stepped_values(vec![1.0, 0.0, 0.5]);
        assert_eq!(ctx.stepped_values(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_button_press_cycles_steps() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_stepped_values(vec![0.0, 0.5, 1.0]);

        let mut env = fx.env(Instant::now());
        for _ in 0..4 {
            ctx.do_action(NAV, 0, &mut env, 1.0);
            ctx.do_action(NAV, 0, &mut env, 0.0);
        }
        assert_eq!(spy.values(), vec![0.5, 1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_accelerated_stepping() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_stepped_values(vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        ctx.set_accelerated_tick_values(vec![3, 1]);

        let mut env = fx.env(Instant::now());
        // Index 0: three ticks per step
        for _ in 0..6 {
            ctx.do_accelerated_relative_action(NAV, 0, &mut env, 0, 1.0);
        }
        assert_eq!(spy.values(), vec![0.25, 0.5]);

        // Index beyond the table clamps to the last entry (1 tick per step)
        for _ in 0..5 {
            ctx.do_accelerated_relative_action(NAV, 0, &mut env, 7, 1.0);
        }
        assert_eq!(spy.values(), vec![0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(ctx.stepped_values_index(), 4);

        ctx.do_accelerated_relative_action(NAV, 0, &mut env, 1, -1.0);
        assert_eq!(spy.values().last().copied(), Some(0.75));
    }

    #[test]
    fn test_default_tick_table() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_stepped_values(vec![0.0, 1.0]);
        assert_eq!(ctx.accelerated_tick_values(), &[10]);
        ctx.set_accelerated_tick_values(Vec::new());
        assert_eq!(ctx.accelerated_tick_values(), &[10]);

        let mut env = fx.env(Instant::now());
        for _ in 0..9 {
            ctx.do_relative_action(NAV, 0, &mut env, 1.0);
        }
        assert!(spy.values().is_empty());
        ctx.do_relative_action(NAV, 0, &mut env, 1.0);
        assert_eq!(spy.values(), vec![1.0]);
    }

    #[test]
    fn test_accelerated_delta() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_accelerated_tick_values(vec![1]);
        ctx.set_accelerated_delta_values(vec![0.01, 0.1]);

        let mut env = fx.env(Instant::now());
        ctx.do_accelerated_relative_action(NAV, 0, &mut env, 0, 1.0);
        ctx.do_accelerated_relative_action(NAV, 0, &mut env, 1, 1.0);
        ctx.do_accelerated_relative_action(NAV, 0, &mut env, 5, -1.0);
        let values = spy.values();
        assert!((values[0] - 0.01).abs() < 1e-9);
        assert!((values[1] - 0.11).abs() < 1e-9);
        assert!((values[2] - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_plain_relative_uses_delta_value() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_delta_value(0.05);

        let mut env = fx.env(Instant::now());
        ctx.do_relative_action(NAV, 0, &mut env, 3.0);
        ctx.do_relative_action(NAV, 0, &mut env, -1.0);
        let values = spy.values();
        assert!((values[0] - 0.05).abs() < 1e-9);
        assert!(values[1].abs() < 1e-9);
    }

    #[test]
    fn test_value_inversion() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_value_inverted(true);

        let mut env = fx.env(Instant::now());
        ctx.do_action(NAV, 0, &mut env, 0.25);
        assert_eq!(spy.values(), vec![0.75]);
    }

    #[test]
    fn test_feedback_inversion_is_independent() {
        let mut fx = Fixture::new();
        let master = fx.host.master_track();
        fx.host.set_track_param(master, TrackParam::Volume, 0.2);

        let registry = crate::action::ActionRegistry::new();
        let mut ctx = ActionContext::new(registry.get("TrackVolume"), WidgetId(0), ZoneId(0), ActionParams::None);
        ctx.set_feedback_inverted(true);

        let mut widget = Widget::new("Fader9");
        let (sink, log) = RecordingSink::new();
        widget.add_sink(Box::new(sink));

        let env = fx.env(Instant::now());
        ctx.request_update(NAV, 0, &env, &mut widget);
        assert!((log.last_number().unwrap() - 0.8).abs() < 1e-9);

        // Input is not inverted
        let mut env = fx.env(Instant::now());
        ctx.do_action(NAV, 0, &mut env, 0.3);
        assert!((fx.host.track_param(master, TrackParam::Volume) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_hold_delay_tap_applies_on_release() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_hold_delay_amount(0.5);
        assert_eq!(ctx.hold_delay(), Some(Duration::from_millis(500)));

        let t0 = Instant::now();
        ctx.do_action(NAV, 0, &mut fx.env(t0), 1.0);
        assert!(spy.values().is_empty());
        assert!(ctx.has_pending_hold());

        ctx.do_action(NAV, 0, &mut fx.env(t0 + Duration::from_millis(100)), 0.0);
        assert_eq!(spy.values(), vec![1.0]);
        assert!(!ctx.has_pending_hold());
    }

    #[test]
    fn test_hold_delay_defers_until_released() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_hold_delay_amount(0.5);

        let t0 = Instant::now();
        ctx.do_action(NAV, 0, &mut fx.env(t0), 0.8);

        // Still held past the delay: nothing yet
        ctx.run_deferred_actions(NAV, 0, &mut fx.env(t0 + Duration::from_millis(700)));
        assert!(spy.values().is_empty());

        ctx.do_action(NAV, 0, &mut fx.env(t0 + Duration::from_millis(900)), 0.0);
        assert_eq!(spy.values(), vec![0.8]);

        // Applied once
        ctx.run_deferred_actions(NAV, 0, &mut fx.env(t0 + Duration::from_secs(2)));
        assert_eq!(spy.values(), vec![0.8]);
    }

    #[test]
    fn test_touch_release_settles_held_value() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_hold_delay_amount(0.2);

        let t0 = Instant::now();
        ctx.do_action(NAV, 0, &mut fx.env(t0), 1.0);
        ctx.do_touch(NAV, 0, &mut fx.env(t0 + Duration::from_millis(300)), 0.0);
        assert_eq!(spy.values(), vec![1.0]);
    }

    #[test]
    fn test_feedback_syncs_stepped_index() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        ctx.set_stepped_values(vec![0.0, 0.5, 1.0]);
        spy.0.lock().unwrap().push(0.9);

        let mut widget = Widget::new("Button1");
        let env = fx.env(Instant::now());
        ctx.request_update(NAV, 0, &env, &mut widget);
        assert_eq!(ctx.stepped_values_index(), 2);
    }

    #[test]
    fn test_colors_follow_value() {
        let mut fx = Fixture::new();
        let (mut ctx, spy) = spy_context();
        let on = Rgb::new(255, 0, 0);
        let off = Rgb::new(0, 0, 32);
        ctx.set_colors(on, off);

        let mut widget = Widget::new("Mute1");
        let (sink, log) = RecordingSink::new();
        widget.add_sink(Box::new(sink));

        spy.0.lock().unwrap().push(1.0);
        ctx.request_update(NAV, 0, &fx.env(Instant::now()), &mut widget);
        assert_eq!(log.last_color(), Some(on));

        spy.0.lock().unwrap().push(0.0);
        ctx.request_update(NAV, 0, &fx.env(Instant::now()), &mut widget);
        assert_eq!(log.last_color(), Some(off));
    }
}
