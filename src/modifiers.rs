//! Modifier latches and active modifier combinations
//!
//! Ten boolean latches multiplex which binding a widget triggers. Every latch
//! carries a power-of-two weight, and the engaged weights are expanded into
//! all of their subsets so that bindings registered for `Shift`,
//! `Shift+Option`, ... can be looked up by a single integer key.
//!
//! ## Exclusivity
//!
//! `Marker`, `Nudge`, `Zoom` and `Scrub` are mutually exclusive: engaging one
//! of them clears the other three first.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Weight reserved for touch-qualified bindings (sits below every latch)
pub const TOUCH: u32 = 1;

/// Default tap-to-latch window
pub const DEFAULT_LATCH_TIME_MS: u64 = 100;

/// Named modifier latch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Shift,
    Option,
    Control,
    Alt,
    Flip,
    Global,
    Marker,
    Nudge,
    Zoom,
    Scrub,
}

impl Modifier {
    /// All latches, in weight order
    pub fn all() -> &'static [Modifier] {
        &[
            Modifier::Shift,
            Modifier::Option,
            Modifier::Control,
            Modifier::Alt,
            Modifier::Flip,
            Modifier::Global,
            Modifier::Marker,
            Modifier::Nudge,
            Modifier::Zoom,
            Modifier::Scrub,
        ]
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Combination weight (Shift = 4, Option = 8, ... Scrub = 2048)
    pub fn weight(self) -> u32 {
        4 << self.index()
    }

    /// Whether this latch belongs to the Marker/Nudge/Zoom/Scrub group
    pub fn is_exclusive(self) -> bool {
        matches!(
            self,
            Modifier::Marker | Modifier::Nudge | Modifier::Zoom | Modifier::Scrub
        )
    }

    /// Parse from a name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Shift => "Shift",
            Modifier::Option => "Option",
            Modifier::Control => "Control",
            Modifier::Alt => "Alt",
            Modifier::Flip => "Flip",
            Modifier::Global => "Global",
            Modifier::Marker => "Marker",
            Modifier::Nudge => "Nudge",
            Modifier::Zoom => "Zoom",
            Modifier::Scrub => "Scrub",
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compute the combination key for a list of modifier names
///
/// `Touch` is accepted alongside the ten latches. Returns `None` on the first
/// unknown name.
pub fn combination_from_names<'a, I>(names: I) -> Option<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().try_fold(0u32, |acc, name| {
        if name.eq_ignore_ascii_case("touch") {
            Some(acc | TOUCH)
        } else {
            Modifier::from_name(name).map(|m| acc | m.weight())
        }
    })
}

/// Tracks latch state and the derived set of active combinations
#[derive(Debug, Clone)]
pub struct ModifierManager {
    engaged: [bool; 10],
    /// Press timestamps used by the tap-to-latch logic
    pressed_at: [Option<Instant>; 10],
    /// Set by a press of an already latched modifier; its release clears the latch
    unlatching: [bool; 10],
    latch_time: Duration,
    modifier_value: u32,
    /// Every subset of engaged weights, descending, `0` last
    active_combinations: Vec<u32>,
    /// Bumped on every recalculation so owners can refresh binding selection
    generation: u64,
}

impl ModifierManager {
    /// Create a manager with all latches released
    pub fn new(latch_time: Duration) -> Self {
        let mut manager = Self {
            engaged: [false; 10],
            pressed_at: [None; 10],
            unlatching: [false; 10],
            latch_time,
            modifier_value: 0,
            active_combinations: vec![0],
            generation: 0,
        };
        manager.recalculate();
        manager
    }

    /// Set or clear one latch
    pub fn set_latch(&mut self, modifier: Modifier, engaged: bool) {
        if engaged && modifier.is_exclusive() {
            for other in Modifier::all().iter().filter(|m| m.is_exclusive()) {
                if *other != modifier {
                    self.engaged[other.index()] = false;
                    self.pressed_at[other.index()] = None;
                    self.unlatching[other.index()] = false;
                }
            }
        }

        self.engaged[modifier.index()] = engaged;
        if !engaged {
            self.pressed_at[modifier.index()] = None;
            self.unlatching[modifier.index()] = false;
        }
        self.recalculate();
    }

    /// Handle a physical press/release of a modifier button
    ///
    /// A press engages the latch and starts timing it. On release the latch is
    /// dropped only if it was held longer than the latch window; a quick tap
    /// leaves it engaged. Pressing an engaged latch keeps it on while held and
    /// drops it on release, however long the press lasted.
    pub fn press(&mut self, modifier: Modifier, pressed: bool, now: Instant) {
        let idx = modifier.index();

        if pressed {
            self.unlatching[idx] = self.engaged[idx];
            if !self.engaged[idx] {
                self.set_latch(modifier, true);
            }
            self.pressed_at[idx] = Some(now);
            return;
        }

        let held_long = self.pressed_at[idx]
            .map(|at| now.saturating_duration_since(at) > self.latch_time)
            .unwrap_or(true);

        if held_long || std::mem::take(&mut self.unlatching[idx]) {
            self.set_latch(modifier, false);
        }
    }

    /// Release every latch
    pub fn clear_all(&mut self) {
        self.engaged = [false; 10];
        self.pressed_at = [None; 10];
        self.unlatching = [false; 10];
        self.recalculate();
    }

    /// Rebuild the modifier value and the combination power set
    pub fn recalculate(&mut self) {
        let weights: Vec<u32> = Modifier::all()
            .iter()
            .filter(|m| self.engaged[m.index()])
            .map(|m| m.weight())
            .collect();

        self.modifier_value = weights.iter().sum();

        let mut combinations: Vec<u32> = (0u32..(1u32 << weights.len()))
            .map(|mask| {
                weights
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| mask & (1 << bit) != 0)
                    .map(|(_, w)| *w)
                    .sum()
            })
            .collect();
        combinations.sort_unstable_by(|a, b| b.cmp(a));

        self.active_combinations = combinations;
        self.generation += 1;

        debug!(
            "Modifiers recalculated: value={} combinations={}",
            self.modifier_value,
            self.active_combinations.len()
        );
    }

    pub fn is_engaged(&self, modifier: Modifier) -> bool {
        self.engaged[modifier.index()]
    }

    /// Sum of the weights of every engaged latch
    pub fn modifier_value(&self) -> u32 {
        self.modifier_value
    }

    /// Active combinations, most specific first, `0` (no modifier) last
    pub fn active_combinations(&self) -> &[u32] {
        &self.active_combinations
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Names of the engaged latches
    pub fn engaged_names(&self) -> Vec<&'static str> {
        Modifier::all()
            .iter()
            .filter(|m| self.engaged[m.index()])
            .map(|m| m.as_str())
            .collect()
    }
}

impl Default for ModifierManager {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_LATCH_TIME_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_weights_are_powers_of_two() {
        assert_eq!(Modifier::Shift.weight(), 4);
        assert_eq!(Modifier::Option.weight(), 8);
        assert_eq!(Modifier::Control.weight(), 16);
        assert_eq!(Modifier::Scrub.weight(), 2048);
        for m in Modifier::all() {
            assert!(m.weight().is_power_of_two());
            assert!(m.weight() > TOUCH);
        }
    }

    #[test]
    fn test_no_modifier_combination() {
        let manager = ModifierManager::default();
        assert_eq!(manager.active_combinations(), &[0]);
        assert_eq!(manager.modifier_value(), 0);
    }

    #[test]
    fn test_combinations_descending_with_zero_last() {
        let mut manager = ModifierManager::default();
        manager.set_latch(Modifier::Shift, true);
        manager.set_latch(Modifier::Option, true);

        assert_eq!(manager.active_combinations(), &[12, 8, 4, 0]);
        assert_eq!(manager.modifier_value(), 12);
    }

    #[test]
    fn test_exclusive_group() {
        let mut manager = ModifierManager::default();
        manager.set_latch(Modifier::Marker, true);
        manager.set_latch(Modifier::Nudge, true);

        assert!(!manager.is_engaged(Modifier::Marker));
        assert!(manager.is_engaged(Modifier::Nudge));

        manager.set_latch(Modifier::Shift, true);
        manager.set_latch(Modifier::Scrub, true);
        assert!(!manager.is_engaged(Modifier::Nudge));
        assert!(manager.is_engaged(Modifier::Scrub));
        // Non-exclusive latches are untouched
        assert!(manager.is_engaged(Modifier::Shift));
    }

    #[test]
    fn test_every_exclusive_pair() {
        let group: Vec<Modifier> = Modifier::all()
            .iter()
            .copied()
            .filter(|m| m.is_exclusive())
            .collect();
        assert_eq!(group.len(), 4);

        for first in &group {
            for second in group.iter().filter(|m| *m != first) {
                let mut manager = ModifierManager::default();
                manager.set_latch(*first, true);
                manager.set_latch(*second, true);
                assert!(!manager.is_engaged(*first));
                assert!(manager.is_engaged(*second));
            }
        }
    }

    #[test]
    fn test_tap_latches_and_hold_is_momentary() {
        let mut manager = ModifierManager::new(Duration::from_millis(100));
        let t0 = Instant::now();

        // Quick tap: stays latched
        manager.press(Modifier::Shift, true, t0);
        manager.press(Modifier::Shift, false, t0 + Duration::from_millis(20));
        assert!(manager.is_engaged(Modifier::Shift));

        // Next press/release cycle clears it
        manager.press(Modifier::Shift, true, t0 + Duration::from_millis(500));
        manager.press(Modifier::Shift, false, t0 + Duration::from_millis(520));
        assert!(!manager.is_engaged(Modifier::Shift));

        // Long hold: momentary
        manager.press(Modifier::Option, true, t0);
        assert!(manager.is_engaged(Modifier::Option));
        manager.press(Modifier::Option, false, t0 + Duration::from_millis(300));
        assert!(!manager.is_engaged(Modifier::Option));
    }

    #[test]
    fn test_repress_of_latched_modifier_is_timed_from_the_repress() {
        let mut manager = ModifierManager::new(Duration::from_millis(100));
        let t0 = Instant::now();

        manager.press(Modifier::Shift, true, t0);
        manager.press(Modifier::Shift, false, t0 + Duration::from_millis(20));
        assert!(manager.is_engaged(Modifier::Shift));

        // Second tap inside the first press's window still unlatches
        manager.press(Modifier::Shift, true, t0 + Duration::from_millis(60));
        assert!(manager.is_engaged(Modifier::Shift));
        manager.press(Modifier::Shift, false, t0 + Duration::from_millis(80));
        assert!(!manager.is_engaged(Modifier::Shift));

        // Latch again, then hold the unlatching press: engaged while held
        let t1 = t0 + Duration::from_millis(1000);
        manager.press(Modifier::Shift, true, t1);
        manager.press(Modifier::Shift, false, t1 + Duration::from_millis(10));
        manager.press(Modifier::Shift, true, t1 + Duration::from_millis(500));
        assert!(manager.is_engaged(Modifier::Shift));
        manager.press(Modifier::Shift, false, t1 + Duration::from_millis(900));
        assert!(!manager.is_engaged(Modifier::Shift));

        // A fresh tap afterwards latches again
        let t2 = t1 + Duration::from_millis(2000);
        manager.press(Modifier::Shift, true, t2);
        manager.press(Modifier::Shift, false, t2 + Duration::from_millis(50));
        assert!(manager.is_engaged(Modifier::Shift));
    }

    #[test]
    fn test_generation_bumps_on_change() {
        let mut manager = ModifierManager::default();
        let before = manager.generation();
        manager.set_latch(Modifier::Alt, true);
        assert!(manager.generation() > before);
    }

    #[test]
    fn test_combination_from_names() {
        assert_eq!(combination_from_names(["Shift", "Option"]), Some(12));
        assert_eq!(combination_from_names(["touch", "shift"]), Some(5));
        assert_eq!(combination_from_names(std::iter::empty()), Some(0));
        assert_eq!(combination_from_names(["Hyper"]), None);
    }

    proptest! {
        #[test]
        fn prop_power_set(mask in 0u32..1024) {
            let mut manager = ModifierManager::default();
            // Keep at most one exclusive latch so the chosen subset survives
            let exclusive_bits = mask & 0b11_1100_0000;
            let allowed = if exclusive_bits.count_ones() > 1 {
                (mask & 0b00_0011_1111) | (1 << exclusive_bits.trailing_zeros())
            } else {
                mask
            };

            let mut expected_value = 0;
            for (bit, m) in Modifier::all().iter().enumerate() {
                if allowed & (1 << bit) != 0 {
                    manager.set_latch(*m, true);
                    expected_value += m.weight();
                }
            }

            let engaged = allowed.count_ones();
            prop_assert_eq!(manager.active_combinations().len(), 1usize << engaged);
            prop_assert_eq!(manager.modifier_value(), expected_value);
            prop_assert_eq!(*manager.active_combinations().last().unwrap(), 0);
            prop_assert_eq!(manager.active_combinations()[0], expected_value);
        }
    }
}
