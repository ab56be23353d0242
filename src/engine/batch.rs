use std::collections::HashMap;

use crate::api::TurnOnPayload;
use crate::models::target::{DeviceTarget, TargetState};

/// Lights that share one identical turn_on payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBatch {
    pub entity_ids: Vec<String>,
    pub brightness_pct: u8,
    pub rgb_color: Option<[u8; 3]>,
    pub color_temp_kelvin: Option<u32>,
    pub effect: Option<String>,
    pub transition: Option<f64>,
}

impl DeviceBatch {
    /// RGB takes precedence over color temperature in the command.
    pub fn payload(&self) -> TurnOnPayload {
        TurnOnPayload {
            brightness_pct: self.brightness_pct,
            rgb_color: self.rgb_color,
            color_temp_kelvin: if self.rgb_color.is_some() {
                None
            } else {
                self.color_temp_kelvin
            },
            effect: self.effect.clone(),
            transition: self.transition.filter(|t| *t > 0.0),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct BatchKey {
    brightness_pct: u8,
    rgb_color: Option<[u8; 3]>,
    color_temp_kelvin: Option<u32>,
    effect: Option<String>,
    transition: Option<u64>,
}

/// Commands for one round: a single turn_off for every light that should be
/// off, and one turn_on per distinct settings key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandPlan {
    pub off: Vec<String>,
    pub on: Vec<DeviceBatch>,
}

impl CommandPlan {
    pub fn dispatch_count(&self) -> usize {
        self.on.len() + usize::from(!self.off.is_empty())
    }
}

/// Group targets by (brightness, rgb, kelvin, effect), plus the transition
/// when it is going to be sent. Batches come out in first-seen order.
pub fn group_by_settings<'a, I>(targets: I, with_transition: bool) -> Vec<DeviceBatch>
where
    I: IntoIterator<Item = &'a DeviceTarget>,
{
    let mut batches: Vec<DeviceBatch> = Vec::new();
    let mut index: HashMap<BatchKey, usize> = HashMap::new();

    for target in targets {
        let transition = if with_transition {
            target.transition.filter(|t| *t > 0.0)
        } else {
            None
        };
        let key = BatchKey {
            brightness_pct: target.brightness_pct,
            rgb_color: target.rgb_color,
            color_temp_kelvin: target.color_temp_kelvin,
            effect: target.effect.clone(),
            transition: transition.map(f64::to_bits),
        };

        match index.get(&key) {
            Some(&i) => batches[i].entity_ids.push(target.entity_id.clone()),
            None => {
                index.insert(key, batches.len());
                batches.push(DeviceBatch {
                    entity_ids: vec![target.entity_id.clone()],
                    brightness_pct: target.brightness_pct,
                    rgb_color: target.rgb_color,
                    color_temp_kelvin: target.color_temp_kelvin,
                    effect: target.effect.clone(),
                    transition,
                });
            }
        }
    }

    batches
}

pub fn plan_commands(targets: &[DeviceTarget], with_transition: bool) -> CommandPlan {
    let off = targets
        .iter()
        .filter(|t| t.state == TargetState::Off)
        .map(|t| t.entity_id.clone())
        .collect();
    let on = group_by_settings(
        targets.iter().filter(|t| t.state == TargetState::On),
        with_transition,
    );
    CommandPlan { off, on }
}
