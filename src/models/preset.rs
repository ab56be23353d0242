use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity_state::{EntityState, STATE_ON};
use super::request::ConvergeRequest;
use super::target::{DeviceOverride, TargetState};

fn new_preset_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_state() -> String {
    STATE_ON.to_string()
}

fn default_brightness() -> u8 {
    100
}

/// A named light scene, read from the `[[presets]]` configuration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetConfig {
    #[serde(default = "new_preset_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_brightness")]
    pub brightness_pct: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<[u8; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp_kelvin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default)]
    pub targets: Vec<DeviceOverride>,
    #[serde(default)]
    pub transition: f64,
    #[serde(default)]
    pub skip_verification: bool,
}

impl PresetConfig {
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut pending_sep = false;
        for c in self.name.to_lowercase().chars() {
            if c.is_whitespace() || c == '-' {
                pending_sep = true;
            } else if c.is_alphanumeric() || c == '_' {
                if pending_sep {
                    slug.push('_');
                    pending_sep = false;
                }
                slug.push(c);
            }
        }
        if pending_sep {
            slug.push('_');
        }
        slug
    }

    /// Layers this preset over a base request. Tolerances and timing stay as
    /// the base has them.
    pub fn apply_to(&self, base: ConvergeRequest) -> ConvergeRequest {
        ConvergeRequest {
            entities: self.entities.clone(),
            state: self.state.clone(),
            brightness_pct: self.brightness_pct,
            rgb_color: self.rgb_color,
            color_temp_kelvin: self.color_temp_kelvin,
            effect: self.effect.clone(),
            targets: self.targets.clone(),
            transition: self.transition,
            skip_verification: self.skip_verification,
            ..base
        }
    }

    /// Captures the current state of `entities` as a new preset. Entities
    /// without a state record get no override.
    pub fn from_current(name: &str, entities: &[String], states: &[Option<EntityState>]) -> Self {
        let any_on = states.iter().flatten().any(|s| s.state == STATE_ON);

        let targets = if any_on {
            entities
                .iter()
                .zip(states)
                .filter_map(|(entity_id, state)| {
                    state.as_ref().map(|state| capture_target(entity_id, state))
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            id: new_preset_id(),
            name: name.to_string(),
            entities: entities.to_vec(),
            state: if any_on { "on" } else { "off" }.to_string(),
            brightness_pct: default_brightness(),
            rgb_color: None,
            color_temp_kelvin: None,
            effect: None,
            targets,
            transition: 0.0,
            skip_verification: false,
        }
    }
}

fn capture_target(entity_id: &str, state: &EntityState) -> DeviceOverride {
    let mut target = DeviceOverride {
        entity_id: entity_id.to_string(),
        ..Default::default()
    };
    if state.state != STATE_ON {
        target.state = Some(TargetState::Off);
        return target;
    }

    if state.attributes.contains_key("brightness") {
        target.brightness_pct = state
            .brightness_pct()
            .ok()
            .map(|pct| pct.clamp(1, 100) as u8);
    }
    target.rgb_color = state.rgb_color().ok().flatten().map(|rgb| {
        [
            rgb[0].round().clamp(0.0, 255.0) as u8,
            rgb[1].round().clamp(0.0, 255.0) as u8,
            rgb[2].round().clamp(0.0, 255.0) as u8,
        ]
    });
    target.color_temp_kelvin = state
        .color_temp_kelvin()
        .ok()
        .flatten()
        .map(|k| k.round() as u32);
    target.effect = state.effect().map(str::to_string);
    target
}
