use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ExpanderError;

/// Number of quasi-bidirectional I/O lines on one chip.
pub const PIN_COUNT: u8 = 8;

/// Which transition of a pin invokes its callback.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeTrigger {
    #[default]
    None,
    Rising,
    Falling,
    Both,
}

impl EdgeTrigger {
    /// Whether a pin that just changed, and now reads `now_high`, fires.
    pub fn fires(self, now_high: bool) -> bool {
        match self {
            EdgeTrigger::None => false,
            EdgeTrigger::Rising => now_high,
            EdgeTrigger::Falling => !now_high,
            EdgeTrigger::Both => true,
        }
    }
}

/// Bit positions of the encoder lines on the expander port.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct EncoderPins {
    pub a: u8,
    pub b: u8,
    pub button: u8,
}

impl EncoderPins {
    pub fn validate(&self) -> Result<(), ExpanderError> {
        for (name, pin) in [("a", self.a), ("b", self.b), ("button", self.button)] {
            check_pin(pin).map_err(|_| {
                ExpanderError::InvalidParameter(format!("encoder pin {name}={pin} out of range 0..7"))
            })?;
        }
        if self.a == self.b {
            return Err(ExpanderError::InvalidParameter(format!(
                "encoder lines A and B share pin {}",
                self.a
            )));
        }
        Ok(())
    }

    pub(crate) fn quadrature_mask(&self) -> u8 {
        (1 << self.a) | (1 << self.b)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceRole {
    #[default]
    Plain,
    RotaryEncoder(EncoderPins),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    pub name: String,
    pub address: u8,
    #[serde(default)]
    pub initial_output: Option<u8>,
    #[serde(default)]
    pub role: DeviceRole,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    pub devices: Vec<DeviceConfig>,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ExpanderError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| ExpanderError::Config(format!("Failed to read config: {e}")))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ExpanderError> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| ExpanderError::Config(format!("Invalid config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate names, out-of-range addresses and bad encoder pin maps.
    pub fn validate(&self) -> Result<(), ExpanderError> {
        let mut names = HashSet::new();
        for device in &self.devices {
            if !names.insert(device.name.as_str()) {
                return Err(ExpanderError::Config(format!(
                    "duplicate device name {:?}",
                    device.name
                )));
            }
            check_address(device.address)
                .map_err(|e| ExpanderError::Config(format!("device {:?}: {e}", device.name)))?;
            if let DeviceRole::RotaryEncoder(pins) = &device.role {
                pins.validate()
                    .map_err(|e| ExpanderError::Config(format!("device {:?}: {e}", device.name)))?;
            }
        }
        Ok(())
    }
}

pub(crate) fn check_pin(pin: u8) -> Result<(), ExpanderError> {
    if pin >= PIN_COUNT {
        return Err(ExpanderError::InvalidParameter(format!(
            "pin {pin} out of range 0..7"
        )));
    }
    Ok(())
}

pub(crate) fn check_address(address: u8) -> Result<(), ExpanderError> {
    if address > 0x7F {
        return Err(ExpanderError::InvalidParameter(format!(
            "address {address:#04x} is not a 7-bit I2C address"
        )));
    }
    Ok(())
}
