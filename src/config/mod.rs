//! Configuration management for surface pages
//!
//! Handles loading, parsing, validating and hot-reloading the YAML file that
//! describes a page: its surfaces, their widgets and zone definitions, and the
//! seed of the simulated host.

pub mod watcher;

use crate::action::ActionParams;
use crate::modifiers::{combination_from_names, DEFAULT_LATCH_TIME_MS};
use crate::widget::{EncoderAcceleration, Rgb, DEFAULT_SQUELCH_MS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

pub use watcher::PageWatcher;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Root configuration: one page
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    #[serde(default = "default_page_name")]
    pub name: String,
    #[serde(default = "default_latch_time")]
    pub latch_time_ms: u64,
    #[serde(default = "default_squelch")]
    pub feedback_squelch_ms: u64,
    #[serde(default)]
    pub scroll_link: ScrollLinkConfig,
    pub surfaces: Vec<SurfaceConfig>,
    #[serde(default)]
    pub host: HostSeed,
}

/// Keep the selected track inside the visible window
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScrollLinkConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Visual column (0-based) the selected track is brought to
    #[serde(default)]
    pub target_channel: usize,
}

/// One control surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurfaceConfig {
    pub name: String,
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,
    /// First page-wide channel this surface addresses
    #[serde(default)]
    pub channel_offset: usize,
    #[serde(default)]
    pub widgets: Vec<WidgetConfig>,
    #[serde(default)]
    pub zones: Vec<ZoneDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WidgetConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<EncoderAcceleration>,
    /// Motor-driven control: feedback is held back for `feedback_squelch_ms` after input
    #[serde(default)]
    pub motorized: bool,
}

/// Navigator named in a zone definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigatorKind {
    Track,
    Master,
    Selected,
    FocusedFx,
}

/// Parsed zone definition (instantiated by the zone manager)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ZoneDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Defaults to the parent zone's navigator (`selected` at the root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigator: Option<NavigatorKind>,
    /// Expand into `name1..nameN`, replacing `|` in widget names by the channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<usize>,
    /// FX name this definition maps (FX-slot template)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub sub_zones: Vec<String>,
    #[serde(default)]
    pub associated_zones: Vec<String>,
    #[serde(default)]
    pub bindings: Vec<BindingDefinition>,
}

/// One widget → action binding
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BindingDefinition {
    pub widget: String,
    pub action: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamsDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(default)]
    pub stepped_values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<AccelerationDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_delay: Option<f64>,
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub invert_feedback: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<ColorsDef>,
}

impl BindingDefinition {
    /// Modifier combination key, `None` if a modifier name is unknown
    pub fn combination(&self) -> Option<u32> {
        combination_from_names(self.modifiers.iter().map(|s| s.as_str()))
    }

    pub fn action_params(&self) -> ActionParams {
        self.params.as_ref().map(ActionParams::from).unwrap_or_default()
    }
}

/// Binding parameter (number, string or list)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamsDef {
    Number(i64),
    Text(String),
    List(Vec<ParamToken>),
}

/// List element (YAML lists mix names and numbers)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamToken {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ParamToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamToken::Int(i) => write!(f, "{}", i),
            ParamToken::Float(v) => write!(f, "{}", v),
            ParamToken::Text(s) => f.write_str(s),
        }
    }
}

impl From<&ParamsDef> for ActionParams {
    fn from(params: &ParamsDef) -> Self {
        match params {
            ParamsDef::Number(n) => ActionParams::Index(*n),
            ParamsDef::Text(s) => ActionParams::Text(s.clone()),
            ParamsDef::List(tokens) => ActionParams::Tokens(tokens.iter().map(|t| t.to_string()).collect()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AccelerationDef {
    /// Raw ticks per step, per acceleration index
    #[serde(default)]
    pub ticks: Vec<u32>,
    /// Delta applied per step, per acceleration index
    #[serde(default)]
    pub deltas: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ColorsDef {
    pub on: Rgb,
    pub off: Rgb,
}

/// Tracks the simulated host starts with
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HostSeed {
    #[serde(default)]
    pub tracks: Vec<TrackSeed>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackSeed {
    pub name: String,
    #[serde(default)]
    pub folder_depth: i32,
    /// VCA groups led, as [low, high] 32-bit masks
    #[serde(default)]
    pub vca_master: [u32; 2],
    /// VCA groups followed, as [low, high] 32-bit masks
    #[serde(default)]
    pub vca_slave: [u32; 2],
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub sends: usize,
    #[serde(default)]
    pub receives: usize,
    #[serde(default)]
    pub fx: Vec<FxSeed>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FxSeed {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl PageConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: PageConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.surfaces.is_empty() {
            return Err(invalid("at least one surface must be defined"));
        }

        let mut surface_names = HashSet::new();
        for surface in &self.surfaces {
            if !surface_names.insert(surface.name.as_str()) {
                return Err(invalid(format!("duplicate surface '{}'", surface.name)));
            }
            surface.validate()?;
        }
        Ok(())
    }

    /// Page-wide channel window: the furthest channel any surface reaches
    pub fn channel_window(&self) -> usize {
        self.surfaces
            .iter()
            .map(|s| s.channel_offset + s.channel_count)
            .max()
            .unwrap_or(0)
    }
}

impl SurfaceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_count == 0 {
            return Err(invalid(format!("surface '{}': channel_count must be > 0", self.name)));
        }

        let mut widgets = HashSet::new();
        for widget in &self.widgets {
            if !widgets.insert(widget.name.as_str()) {
                return Err(invalid(format!(
                    "surface '{}': duplicate widget '{}'",
                    self.name, widget.name
                )));
            }
        }

        let mut zones = HashSet::new();
        for zone in &self.zones {
            if !zones.insert(zone.name.as_str()) {
                return Err(invalid(format!(
                    "surface '{}': duplicate zone definition '{}'",
                    self.name, zone.name
                )));
            }
            for binding in &zone.bindings {
                binding
                    .validate()
                    .map_err(|e| invalid(format!("surface '{}', zone '{}': {}", self.name, zone.name, e)))?;
            }
        }
        if !zones.contains("Home") {
            return Err(invalid(format!("surface '{}': missing 'Home' zone definition", self.name)));
        }
        Ok(())
    }
}

impl BindingDefinition {
    fn validate(&self) -> Result<(), String> {
        if self.combination().is_none() {
            return Err(format!("{}: unknown modifier in {:?}", self.widget, self.modifiers));
        }
        if let Some([min, max]) = self.range {
            if min > max {
                return Err(format!("{}: range minimum {} > maximum {}", self.widget, min, max));
            }
        }
        if self.stepped_values.windows(2).any(|w| w[0] > w[1]) {
            return Err(format!("{}: stepped_values must be non-decreasing", self.widget));
        }
        if let Some(acceleration) = &self.acceleration {
            if acceleration.ticks.is_empty() && acceleration.deltas.is_empty() {
                return Err(format!("{}: empty acceleration table", self.widget));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_page_name() -> String { "Page".to_string() }
fn default_latch_time() -> u64 { DEFAULT_LATCH_TIME_MS }
fn default_squelch() -> u64 { DEFAULT_SQUELCH_MS }
fn default_channel_count() -> usize { 8 }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
surfaces:
  - name: XTouch
    widgets:
      - name: Fader1
    zones:
      - name: Home
        bindings:
          - { widget: Fader1, action: TrackVolume }
"#;

    #[test]
    fn test_defaults() {
        let config = PageConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.name, "Page");
        assert_eq!(config.latch_time_ms, 100);
        assert_eq!(config.feedback_squelch_ms, 250);
        assert!(!config.scroll_link.enabled);
        assert_eq!(config.surfaces[0].channel_count, 8);
        assert_eq!(config.channel_window(), 8);
        assert!(config.host.tracks.is_empty());
        assert!(!config.surfaces[0].widgets[0].motorized);
    }

    #[test]
    fn test_full_binding() {
        let yaml = r##"
name: Mixer
surfaces:
  - name: XTouch
    channel_count: 4
    channel_offset: 4
    widgets:
      - name: Rotary1
        acceleration: { increment: [1, 2], decrement: [65, 66] }
      - { name: Fader1, motorized: true }
    zones:
      - name: Home
        navigator: master
        bindings:
          - widget: Rotary1
            action: Bank
            modifiers: [Shift, Touch]
            params: [TrackSend, 1]
            range: [0.1, 0.9]
            stepped_values: [0.0, 0.5, 1.0]
            acceleration: { ticks: [3, 1], deltas: [0.01, 0.05] }
            delta: 0.02
            hold_delay: 0.5
            invert: true
            properties: { DisplayRow: "1" }
            colors: { on: "#ff0000", off: "#200000" }
host:
  tracks:
    - { name: Drums, folder_depth: 1, vca_master: [1, 0], fx: [{ name: ReaEQ, params: [Gain] }] }
"##;
        let config = PageConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.channel_window(), 8);

        let surface = &config.surfaces[0];
        let widget = &surface.widgets[0];
        assert_eq!(widget.acceleration.as_ref().map(|a| a.increment.clone()), Some(vec![1, 2]));
        assert!(!widget.motorized);
        assert!(surface.widgets[1].motorized);

        let zone = &surface.zones[0];
        assert_eq!(zone.navigator, Some(NavigatorKind::Master));
        let binding = &zone.bindings[0];
        assert_eq!(binding.combination(), Some(4 | 1));
        assert_eq!(
            binding.action_params(),
            ActionParams::Tokens(vec!["TrackSend".into(), "1".into()])
        );
        assert_eq!(binding.range, Some([0.1, 0.9]));
        assert_eq!(binding.hold_delay, Some(0.5));
        assert!(binding.invert);
        assert_eq!(binding.colors.map(|c| c.on), Some(Rgb::new(255, 0, 0)));
        assert_eq!(binding.properties.get("DisplayRow").map(String::as_str), Some("1"));

        assert_eq!(config.host.tracks[0].vca_master, [1, 0]);
        assert_eq!(config.host.tracks[0].fx[0].params, vec!["Gain".to_string()]);
    }

    #[test]
    fn test_params_shapes() {
        let number: ParamsDef = serde_yaml::from_str("3").unwrap();
        assert_eq!(ActionParams::from(&number), ActionParams::Index(3));
        let text: ParamsDef = serde_yaml::from_str("Alt").unwrap();
        assert_eq!(ActionParams::from(&text), ActionParams::Text("Alt".into()));
    }

    fn expect_invalid(yaml: &str, needle: &str) {
        match PageConfig::from_yaml_str(yaml) {
            Err(ConfigError::Invalid(message)) => {
                assert!(message.contains(needle), "'{}' does not mention '{}'", message, needle)
            }
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_errors() {
        expect_invalid("surfaces: []", "at least one surface");
        expect_invalid(
            "surfaces: [{ name: A, channel_count: 0, zones: [{ name: Home }] }]",
            "channel_count",
        );
        expect_invalid(
            "surfaces: [{ name: A, widgets: [{ name: F1 }, { name: F1 }], zones: [{ name: Home }] }]",
            "duplicate widget",
        );
        expect_invalid("surfaces: [{ name: A, zones: [{ name: Main }] }]", "missing 'Home'");
        expect_invalid(
            "surfaces: [{ name: A, zones: [{ name: Home }, { name: Home }] }]",
            "duplicate zone",
        );
        expect_invalid(
            "surfaces: [{ name: A, zones: [{ name: Home, bindings: [{ widget: F1, action: X, range: [1.0, 0.0] }] }] }]",
            "range",
        );
        expect_invalid(
            "surfaces: [{ name: A, zones: [{ name: Home, bindings: [{ widget: F1, action: X, stepped_values: [1.0, 0.5] }] }] }]",
            "non-decreasing",
        );
        expect_invalid(
            "surfaces: [{ name: A, zones: [{ name: Home, bindings: [{ widget: F1, action: X, acceleration: {} }] }] }]",
            "acceleration",
        );
        expect_invalid(
            "surfaces: [{ name: A, zones: [{ name: Home, bindings: [{ widget: F1, action: X, modifiers: [Hyper] }] }] }]",
            "modifier",
        );
    }

    #[test]
    fn test_yaml_error() {
        assert!(matches!(
            PageConfig::from_yaml_str("surfaces: [unclosed"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.yaml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = PageConfig::load(&path).await.unwrap();
        assert_eq!(config.surfaces[0].name, "XTouch");

        let missing = PageConfig::load(dir.path().join("nope.yaml")).await;
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
