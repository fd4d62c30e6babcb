use std::{fs, io, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::f1_controller::Color;

pub const DEFAULT_CONFIG_PATH: &str = "f1-bridge.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub usb: UsbConfig,
    pub midi: MidiConfig,
    pub analog: AnalogConfig,
    pub leds: LedConfig,
    pub poll_interval_ms: u64,
    pub startup_animation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            usb: UsbConfig::default(),
            midi: MidiConfig::default(),
            analog: AnalogConfig::default(),
            leds: LedConfig::default(),
            poll_interval_ms: 2,
            startup_animation: true,
        }
    }
}

impl Config {
    /// Load `path`, falling back to the defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("{} not found, using default settings", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UsbConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
    pub read_endpoint: u8,
    pub write_endpoint: u8,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x17cc,
            product_id: 0x1120,
            interface: 0,
            read_endpoint: 0x81,
            write_endpoint: 0x01,
            read_timeout_ms: 1,
            write_timeout_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    pub client_name: String,
    /// Substring of an existing output port. Empty creates a virtual port.
    pub output_port: String,
    /// Substring of an existing input port. Empty creates a virtual port.
    pub input_port: String,
    pub channel: u8,
    pub matrix_note_base: u8,
    pub button_note_base: u8,
    pub knob_cc_base: u8,
    pub fader_cc_base: u8,
    pub wheel_cc: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: "f1-midi-bridge".into(),
            output_port: String::new(),
            input_port: String::new(),
            channel: 0,
            matrix_note_base: 36,
            button_note_base: 52,
            knob_cc_base: 1,
            fader_cc_base: 5,
            wheel_cc: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalogConfig {
    pub fader_quiescence_ms: u64,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            fader_quiescence_ms: 50,
        }
    }
}

impl AnalogConfig {
    pub fn fader_quiescence(&self) -> Duration {
        Duration::from_millis(self.fader_quiescence_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedConfig {
    pub matrix_idle_color: Color,
    pub matrix_idle_brightness: f32,
    pub highlight_color: Color,
    pub feedback_on_color: Color,
    pub feedback_off_color: Color,
    pub feedback_off_brightness: f32,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            matrix_idle_color: Color::Blue,
            matrix_idle_brightness: 0.2,
            highlight_color: Color::White,
            feedback_on_color: Color::Red,
            feedback_off_color: Color::Blue,
            feedback_off_brightness: 0.2,
        }
    }
}
