//! Configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid color `{0}`, expected #rrggbb")]
    Color(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// sRGB color, written as `#rrggbb` in config files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);
    pub const GREEN: Rgb = Rgb::new(0.0, 1.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse "#rrggbb" (leading '#' optional)
    pub fn from_hex(s: &str) -> Result<Self, ConfigError> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ConfigError::Color(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| ConfigError::Color(s.to_string()))
        };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArConfig {
    #[serde(default)]
    pub path: PathConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub connectors: ConnectorConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Multiplier from vision-backend units to render-space meters
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
        }
    }
}

fn default_scale() -> f64 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_start_radius")]
    pub start_radius: f32,
    #[serde(default = "default_red")]
    pub start_color: Rgb,
    #[serde(default = "default_waypoint_radius")]
    pub waypoint_radius: f32,
    #[serde(default = "default_waypoint_height")]
    pub waypoint_height: f32,
    #[serde(default = "default_green")]
    pub waypoint_color: Rgb,
    #[serde(default = "default_indicator_radius")]
    pub indicator_radius: f32,
    #[serde(default = "default_indicator_height")]
    pub indicator_height: f32,
    /// Height of the indicator's centre above the marker's centre
    #[serde(default = "default_indicator_offset")]
    pub indicator_offset: f32,
    #[serde(default = "default_red")]
    pub indicator_color: Rgb,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            start_radius: default_start_radius(),
            start_color: default_red(),
            waypoint_radius: default_waypoint_radius(),
            waypoint_height: default_waypoint_height(),
            waypoint_color: default_green(),
            indicator_radius: default_indicator_radius(),
            indicator_height: default_indicator_height(),
            indicator_offset: default_indicator_offset(),
            indicator_color: default_red(),
        }
    }
}

fn default_start_radius() -> f32 {
    0.05
}

fn default_waypoint_radius() -> f32 {
    0.03
}

fn default_waypoint_height() -> f32 {
    0.05
}

fn default_indicator_radius() -> f32 {
    0.02
}

fn default_indicator_height() -> f32 {
    0.04
}

fn default_indicator_offset() -> f32 {
    0.06
}

fn default_red() -> Rgb {
    Rgb::RED
}

fn default_green() -> Rgb {
    Rgb::GREEN
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    #[serde(default = "default_thickness")]
    pub thickness: f32,
    #[serde(default = "default_white")]
    pub color: Rgb,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            thickness: default_thickness(),
            color: default_white(),
        }
    }
}

fn default_thickness() -> f32 {
    0.005
}

fn default_white() -> Rgb {
    Rgb::WHITE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Peak vertical offset in meters
    #[serde(default = "default_bob_amplitude")]
    pub bob_amplitude: f32,
    /// Angular speed in radians per second
    #[serde(default = "default_bob_speed")]
    pub bob_speed: f32,
    /// Phase added per marker along the path, in radians
    #[serde(default = "default_phase_step")]
    pub phase_step: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            bob_amplitude: default_bob_amplitude(),
            bob_speed: default_bob_speed(),
            phase_step: default_phase_step(),
        }
    }
}

fn default_bob_amplitude() -> f32 {
    0.02
}

fn default_bob_speed() -> f32 {
    2.0
}

fn default_phase_step() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session type requested from the platform
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Reference space the anchor is expressed in
    #[serde(default = "default_reference_space")]
    pub reference_space: String,
    #[serde(default = "default_required_features")]
    pub required_features: Vec<String>,
    #[serde(default = "default_optional_features")]
    pub optional_features: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            reference_space: default_reference_space(),
            required_features: default_required_features(),
            optional_features: default_optional_features(),
        }
    }
}

fn default_mode() -> String {
    "immersive-ar".to_string()
}

fn default_reference_space() -> String {
    "local".to_string()
}

fn default_required_features() -> Vec<String> {
    vec!["hit-test".to_string(), "anchors".to_string()]
}

fn default_optional_features() -> Vec<String> {
    vec!["dom-overlay".to_string()]
}

impl ArConfig {
    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ArConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would produce an invisible or degenerate scene
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.scale.is_finite() || self.path.scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "path.scale must be positive, got {}",
                self.path.scale
            )));
        }

        let sizes = [
            ("markers.start_radius", self.markers.start_radius),
            ("markers.waypoint_radius", self.markers.waypoint_radius),
            ("markers.waypoint_height", self.markers.waypoint_height),
            ("markers.indicator_radius", self.markers.indicator_radius),
            ("markers.indicator_height", self.markers.indicator_height),
            ("connectors.thickness", self.connectors.thickness),
        ];
        for (name, value) in sizes {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !self.animation.bob_amplitude.is_finite() || self.animation.bob_amplitude < 0.0 {
            return Err(ConfigError::Invalid(
                "animation.bob_amplitude must not be negative".to_string(),
            ));
        }
        if self.session.mode.is_empty() {
            return Err(ConfigError::Invalid("session.mode must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from file, falling back to defaults when it is absent
pub fn load_config(path: &Path) -> Result<ArConfig, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = ArConfig::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(ArConfig::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = ArConfig::default().to_toml()?;
    std::fs::write(path, content)?;
    Ok(())
}
