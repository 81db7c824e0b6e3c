//! Feedback values and sinks
//!
//! A widget forwards `(properties, value)` and colour updates to every sink it
//! owns. Sinks render to a physical or virtual output; the engine only needs
//! the [`FeedbackSink`] trait.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Free-form key/value pairs attached to a binding and forwarded to sinks
pub type Properties = BTreeMap<String, String>;

/// Value pushed to a feedback sink
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackValue {
    /// Normalised control value
    Number(f64),
    /// Display text
    Text(String),
}

/// 24-bit colour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse_hex(&value).ok_or_else(|| format!("Invalid colour '{}', expected #rrggbb", value))
    }
}

impl From<Rgb> for String {
    fn from(rgb: Rgb) -> Self {
        format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
    }
}

/// Output side of a widget
pub trait FeedbackSink {
    /// Push a value with the binding's properties
    fn set_value(&mut self, properties: &Properties, value: &FeedbackValue);

    /// Push a colour (sinks without colour support ignore it)
    fn set_color(&mut self, _color: Rgb) {}

    /// Force the neutral state: zero, blank text, default colour
    fn clear(&mut self) {
        self.set_value(&Properties::new(), &FeedbackValue::Number(0.0));
        self.set_color(Rgb::default());
    }
}

/// Sink that logs changes (deduplicated against the last value sent)
pub struct LogSink {
    label: String,
    last: Option<FeedbackValue>,
    last_color: Option<Rgb>,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            last: None,
            last_color: None,
        }
    }
}

impl FeedbackSink for LogSink {
    fn set_value(&mut self, properties: &Properties, value: &FeedbackValue) {
        if self.last.as_ref() == Some(value) {
            return;
        }
        match value {
            FeedbackValue::Number(v) => debug!("💡 {} ← {:.3} {:?}", self.label, v, properties),
            FeedbackValue::Text(t) => debug!("💡 {} ← \"{}\"", self.label, t),
        }
        self.last = Some(value.clone());
    }

    fn set_color(&mut self, color: Rgb) {
        if self.last_color != Some(color) {
            debug!("🎨 {} ← {}", self.label, String::from(color));
            self.last_color = Some(color);
        }
    }

    fn clear(&mut self) {
        if self.last.is_some() || self.last_color.is_some() {
            trace!("💡 {} cleared", self.label);
        }
        self.last = None;
        self.last_color = None;
    }
}

/// Event captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackEvent {
    Value(Properties, FeedbackValue),
    Color(Rgb),
    Cleared,
}

/// Shared handle on the events recorded by a [`RecordingSink`]
#[derive(Debug, Clone, Default)]
pub struct FeedbackLog(Rc<RefCell<Vec<FeedbackEvent>>>);

impl FeedbackLog {
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.0.borrow().clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<FeedbackEvent> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn cleared_count(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, FeedbackEvent::Cleared))
            .count()
    }

    /// Last numeric value pushed
    pub fn last_number(&self) -> Option<f64> {
        self.0.borrow().iter().rev().find_map(|e| match e {
            FeedbackEvent::Value(_, FeedbackValue::Number(v)) => Some(*v),
            _ => None,
        })
    }

    /// Last text pushed
    pub fn last_text(&self) -> Option<String> {
        self.0.borrow().iter().rev().find_map(|e| match e {
            FeedbackEvent::Value(_, FeedbackValue::Text(t)) => Some(t.clone()),
            _ => None,
        })
    }

    pub fn last_color(&self) -> Option<Rgb> {
        self.0.borrow().iter().rev().find_map(|e| match e {
            FeedbackEvent::Color(c) => Some(*c),
            _ => None,
        })
    }
}

/// Sink that records everything it receives (tests, diagnostics)
#[derive(Debug, Default)]
pub struct RecordingSink {
    log: FeedbackLog,
}

impl RecordingSink {
    /// Create a sink plus a handle to read what it records
    pub fn new() -> (Self, FeedbackLog) {
        let log = FeedbackLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl FeedbackSink for RecordingSink {
    fn set_value(&mut self, properties: &Properties, value: &FeedbackValue) {
        self.log
            .0
            .borrow_mut()
            .push(FeedbackEvent::Value(properties.clone(), value.clone()));
    }

    fn set_color(&mut self, color: Rgb) {
        self.log.0.borrow_mut().push(FeedbackEvent::Color(color));
    }

    fn clear(&mut self) {
        self.log.0.borrow_mut().push(FeedbackEvent::Cleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse_hex("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse_hex("ff8000"), None);
        assert_eq!(Rgb::parse_hex("#ff80"), None);
        assert_eq!(Rgb::parse_hex("#gg0000"), None);
        assert_eq!(String::from(Rgb::new(1, 2, 3)), "#010203");
    }

    #[test]
    fn test_recording_sink() {
        let (mut sink, log) = RecordingSink::new();
        sink.set_value(&Properties::new(), &FeedbackValue::Number(0.5));
        sink.set_value(&Properties::new(), &FeedbackValue::Text("Kick".into()));
        sink.set_color(Rgb::new(255, 0, 0));
        sink.clear();

        assert_eq!(log.last_number(), Some(0.5));
        assert_eq!(log.last_text().as_deref(), Some("Kick"));
        assert_eq!(log.last_color(), Some(Rgb::new(255, 0, 0)));
        assert_eq!(log.cleared_count(), 1);
        assert_eq!(log.take().len(), 4);
        assert!(log.events().is_empty());
    }
}
