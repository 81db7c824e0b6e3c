//! Widgets - named input/output endpoints of a surface
//!
//! A widget is created when the surface template is loaded and lives as long
//! as the surface. Zones reference widgets by [`WidgetId`] only.

pub mod feedback;
mod squelch;

pub use feedback::{
    FeedbackEvent, FeedbackLog, FeedbackSink, FeedbackValue, LogSink, Properties, RecordingSink,
    Rgb,
};
pub use squelch::{FeedbackSquelch, DEFAULT_SQUELCH_MS};

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Index of a widget within its surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub usize);

/// Raw relative-encoder values mapped to acceleration indices
///
/// `increment[i]` is the raw value that means "one tick up at acceleration
/// index i"; `decrement` likewise for down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderAcceleration {
    #[serde(default)]
    pub increment: Vec<u8>,
    #[serde(default)]
    pub decrement: Vec<u8>,
}

impl EncoderAcceleration {
    /// Map a raw encoder value to `(±1.0, acceleration index)`
    pub fn decode(&self, raw: u8) -> Option<(f64, usize)> {
        if let Some(idx) = self.increment.iter().position(|v| *v == raw) {
            return Some((1.0, idx));
        }
        self.decrement
            .iter()
            .position(|v| *v == raw)
            .map(|idx| (-1.0, idx))
    }
}

/// Channel number from the trailing digits of a widget name ("Fader3" → 3)
pub fn channel_from_name(name: &str) -> Option<usize> {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    name[digits_start..].parse().ok()
}

/// A named control
pub struct Widget {
    name: String,
    channel: Option<usize>,
    sinks: Vec<Box<dyn FeedbackSink>>,
    acceleration: Option<EncoderAcceleration>,
    squelch: FeedbackSquelch,
}

impl Widget {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            channel: channel_from_name(&name),
            name,
            sinks: Vec::new(),
            acceleration: None,
            squelch: FeedbackSquelch::disabled(),
        }
    }

    pub fn with_acceleration(mut self, acceleration: EncoderAcceleration) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    pub fn with_squelch(mut self, squelch: FeedbackSquelch) -> Self {
        self.squelch = squelch;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel number derived from the name (1-based, as written)
    pub fn channel(&self) -> Option<usize> {
        self.channel
    }

    pub fn add_sink(&mut self, sink: Box<dyn FeedbackSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Decode a raw relative value with this widget's acceleration table
    ///
    /// Without a table, the common two's-complement-ish encoder convention
    /// applies: 1..=63 up, 65..=127 down, index 0.
    pub fn decode_relative(&self, raw: u8) -> Option<(f64, usize)> {
        match &self.acceleration {
            Some(table) => table.decode(raw),
            None => match raw {
                1..=63 => Some((1.0, 0)),
                65..=127 => Some((-1.0, 0)),
                _ => None,
            },
        }
    }

    /// Record an incoming user input
    pub fn mark_input(&mut self, now: Instant) {
        self.squelch.mark_input(now);
    }

    pub fn is_squelched(&self, now: Instant) -> bool {
        self.squelch.is_squelched(now)
    }

    pub fn last_input(&self) -> Option<Instant> {
        self.squelch.last_input()
    }

    /// Let the next feedback refresh through even right after an input
    pub fn reset_squelch(&mut self) {
        self.squelch.reset();
    }

    /// Forward a value to every sink
    pub fn update_value(&mut self, properties: &Properties, value: &FeedbackValue) {
        for sink in &mut self.sinks {
            sink.set_value(properties, value);
        }
    }

    pub fn update_color(&mut self, color: Rgb) {
        for sink in &mut self.sinks {
            sink.set_color(color);
        }
    }

    /// Force every sink to its neutral state
    pub fn clear(&mut self) {
        for sink in &mut self.sinks {
            sink.clear();
        }
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.name)
            .field("channel", &self.channel)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_channel_from_name() {
        assert_eq!(channel_from_name("Fader3"), Some(3));
        assert_eq!(channel_from_name("Rotary12"), Some(12));
        assert_eq!(channel_from_name("Play"), None);
        assert_eq!(channel_from_name("F1Button"), None);
        assert_eq!(channel_from_name("7"), Some(7));
    }

    #[test]
    fn test_decode_relative_default() {
        let widget = Widget::new("Rotary1");
        assert_eq!(widget.decode_relative(1), Some((1.0, 0)));
        assert_eq!(widget.decode_relative(65), Some((-1.0, 0)));
        assert_eq!(widget.decode_relative(0), None);
    }

    #[test]
    fn test_decode_relative_with_table() {
        let widget = Widget::new("Jog").with_acceleration(EncoderAcceleration {
            increment: vec![1, 2, 4],
            decrement: vec![65, 66, 68],
        });
        assert_eq!(widget.decode_relative(4), Some((1.0, 2)));
        assert_eq!(widget.decode_relative(66), Some((-1.0, 1)));
        assert_eq!(widget.decode_relative(3), None);
    }

    #[test]
    fn test_update_fans_out_to_sinks() {
        let mut widget = Widget::new("Fader1");
        let (a, log_a) = RecordingSink::new();
        let (b, log_b) = RecordingSink::new();
        widget.add_sink(Box::new(a));
        widget.add_sink(Box::new(b));

        widget.update_value(&Properties::new(), &FeedbackValue::Number(0.25));
        widget.clear();

        assert_eq!(log_a.last_number(), Some(0.25));
        assert_eq!(log_b.last_number(), Some(0.25));
        assert_eq!(log_a.cleared_count(), 1);
        assert_eq!(log_b.cleared_count(), 1);
    }

    #[test]
    fn test_input_squelches_feedback() {
        let mut widget = Widget::new("Fader1")
            .with_squelch(FeedbackSquelch::new(Duration::from_millis(250)));
        let t0 = Instant::now();
        widget.mark_input(t0);
        assert!(widget.is_squelched(t0 + Duration::from_millis(100)));
        assert!(!widget.is_squelched(t0 + Duration::from_millis(300)));
        assert_eq!(widget.last_input(), Some(t0));
    }

    #[test]
    fn test_plain_widget_is_never_squelched() {
        let mut widget = Widget::new("Mute1");
        let t0 = Instant::now();
        widget.mark_input(t0);
        assert!(!widget.is_squelched(t0));
        assert_eq!(widget.last_input(), Some(t0));
    }
}
