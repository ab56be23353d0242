use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

pub const LIGHT_DOMAIN: &str = "light";

pub const STATE_ON: &str = "on";
pub const STATE_OFF: &str = "off";
pub const STATE_UNAVAILABLE: &str = "unavailable";
pub const STATE_UNKNOWN: &str = "unknown";

pub const COLOR_MODE_RGB: &str = "rgb";
pub const COLOR_MODE_HS: &str = "hs";
pub const COLOR_MODE_COLOR_TEMP: &str = "color_temp";

/// A state record as reported by Home Assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Checks for the `<domain>.<object_id>` shape of an entity id.
pub fn is_entity_id(value: &str) -> bool {
    match value.split_once('.') {
        Some((domain, object_id)) => {
            !domain.is_empty()
                && !object_id.is_empty()
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn is_light(entity_id: &str) -> bool {
    entity_id
        .strip_prefix(LIGHT_DOMAIN)
        .is_some_and(|rest| rest.starts_with('.'))
}

impl EntityState {
    pub fn new(entity_id: &str, state: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            attributes: Map::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.state.as_str(), STATE_UNAVAILABLE | STATE_UNKNOWN)
    }

    /// Member entity ids exposed by light groups and `group.*` helpers.
    pub fn members(&self) -> Vec<&str> {
        self.attributes
            .get("entity_id")
            .and_then(Value::as_array)
            .map(|members| members.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn supported_color_modes(&self) -> Vec<&str> {
        self.attributes
            .get("supported_color_modes")
            .and_then(Value::as_array)
            .map(|modes| modes.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn supports_rgb(&self) -> bool {
        self.supported_color_modes()
            .iter()
            .any(|mode| *mode == COLOR_MODE_RGB || *mode == COLOR_MODE_HS)
    }

    pub fn supports_color_temp(&self) -> bool {
        self.supported_color_modes().contains(&COLOR_MODE_COLOR_TEMP)
    }

    /// Raw 0-255 brightness. `null` and a missing attribute both read as `None`.
    pub fn brightness(&self) -> Result<Option<f64>, AppError> {
        self.number_attr("brightness")
    }

    /// Brightness as a 0-100 percentage, rounded to the nearest integer.
    /// Lights that report no brightness read as 0%.
    pub fn brightness_pct(&self) -> Result<i64, AppError> {
        let raw = self.brightness()?.unwrap_or(0.0);
        Ok((raw / 255.0 * 100.0).round() as i64)
    }

    /// `None` when the attribute is absent or is not a three-element list.
    pub fn rgb_color(&self) -> Result<Option<[f64; 3]>, AppError> {
        let Some(channels) = self.attributes.get("rgb_color").and_then(Value::as_array) else {
            return Ok(None);
        };
        if channels.len() != 3 {
            return Ok(None);
        }
        let mut rgb = [0.0; 3];
        for (slot, channel) in rgb.iter_mut().zip(channels) {
            *slot = channel.as_f64().ok_or_else(|| {
                AppError::malformed(&self.entity_id, format!("rgb_color channel {channel}"))
            })?;
        }
        Ok(Some(rgb))
    }

    pub fn color_temp_kelvin(&self) -> Result<Option<f64>, AppError> {
        match self.number_attr("color_temp_kelvin")? {
            Some(kelvin) => Ok(Some(kelvin)),
            None => self.number_attr("color_temperature_kelvin"),
        }
    }

    /// Active effect, with Home Assistant's "none" placeholders filtered out.
    pub fn effect(&self) -> Option<&str> {
        self.attributes
            .get("effect")
            .and_then(Value::as_str)
            .filter(|effect| !matches!(*effect, "none" | "None"))
    }

    fn number_attr(&self, key: &str) -> Result<Option<f64>, AppError> {
        match self.attributes.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| AppError::malformed(&self.entity_id, format!("{key} is {value}"))),
        }
    }
}
