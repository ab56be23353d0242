use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    On,
    Off,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::On => "on",
            TargetState::Off => "off",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetState {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "on" => Ok(TargetState::On),
            "off" => Ok(TargetState::Off),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid state '{}'. Must be 'on' or 'off'.",
                value
            ))),
        }
    }
}

/// Fully-resolved desired state for one light.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceTarget {
    pub entity_id: String,
    pub state: TargetState,
    pub brightness_pct: u8,
    pub rgb_color: Option<[u8; 3]>,
    pub color_temp_kelvin: Option<u32>,
    pub effect: Option<String>,
    pub transition: Option<f64>,
}

/// Per-light settings that replace the request defaults for that light.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceOverride {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TargetState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_pct: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<[u8; 3]>,
    #[serde(
        default,
        alias = "color_temperature_kelvin",
        skip_serializing_if = "Option::is_none"
    )]
    pub color_temp_kelvin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<f64>,
}

/// Batch-level defaults for one convergence call.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDefaults {
    pub state: TargetState,
    pub brightness_pct: u8,
    pub rgb_color: Option<[u8; 3]>,
    pub color_temp_kelvin: Option<u32>,
    pub effect: Option<String>,
    pub transition: Option<f64>,
}

impl Default for TargetDefaults {
    fn default() -> Self {
        Self {
            state: TargetState::On,
            brightness_pct: 100,
            rgb_color: None,
            color_temp_kelvin: None,
            effect: None,
            transition: None,
        }
    }
}
