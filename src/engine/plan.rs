use std::collections::HashMap;

use crate::models::target::{DeviceOverride, DeviceTarget, TargetDefaults};

/// One target per light: the light's override where it sets a field, the
/// batch-level default otherwise.
pub fn build_targets(
    entity_ids: &[String],
    overrides: &HashMap<String, DeviceOverride>,
    defaults: &TargetDefaults,
) -> Vec<DeviceTarget> {
    entity_ids
        .iter()
        .map(|entity_id| {
            let Some(o) = overrides.get(entity_id) else {
                return DeviceTarget {
                    entity_id: entity_id.clone(),
                    state: defaults.state,
                    brightness_pct: defaults.brightness_pct,
                    rgb_color: defaults.rgb_color,
                    color_temp_kelvin: defaults.color_temp_kelvin,
                    effect: defaults.effect.clone(),
                    transition: defaults.transition,
                };
            };

            DeviceTarget {
                entity_id: entity_id.clone(),
                state: o.state.unwrap_or(defaults.state),
                brightness_pct: o.brightness_pct.unwrap_or(defaults.brightness_pct),
                rgb_color: o.rgb_color.or(defaults.rgb_color),
                color_temp_kelvin: o.color_temp_kelvin.or(defaults.color_temp_kelvin),
                effect: o.effect.clone().or_else(|| defaults.effect.clone()),
                transition: o.transition.or(defaults.transition),
            }
        })
        .collect()
}
