use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::policy::{RetryPolicy, ToleranceConfig};
use super::target::{DeviceOverride, TargetDefaults, TargetState};
use crate::error::AppError;

/// Everything one convergence call needs. Field names match the
/// `ensure_state` service data of the Home Assistant integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergeRequest {
    pub entities: Vec<String>,
    pub state: String,
    pub brightness_pct: u8,
    pub rgb_color: Option<[u8; 3]>,
    pub color_temp_kelvin: Option<u32>,
    pub effect: Option<String>,
    pub targets: Vec<DeviceOverride>,
    pub brightness_tolerance: u8,
    pub rgb_tolerance: u8,
    pub kelvin_tolerance: u32,
    pub transition: f64,
    pub delay_after_send: f64,
    pub max_retries: u32,
    pub max_runtime_seconds: f64,
    pub use_exponential_backoff: bool,
    pub max_backoff_seconds: f64,
    pub skip_verification: bool,
    pub log_success: bool,
}

impl Default for ConvergeRequest {
    fn default() -> Self {
        let tolerances = ToleranceConfig::default();
        let policy = RetryPolicy::default();
        Self {
            entities: Vec::new(),
            state: TargetState::On.to_string(),
            brightness_pct: 100,
            rgb_color: None,
            color_temp_kelvin: None,
            effect: None,
            targets: Vec::new(),
            brightness_tolerance: tolerances.brightness_pct,
            rgb_tolerance: tolerances.rgb,
            kelvin_tolerance: tolerances.kelvin,
            transition: 0.0,
            delay_after_send: policy.delay_after_send,
            max_retries: policy.max_retries,
            max_runtime_seconds: policy.max_runtime_seconds,
            use_exponential_backoff: policy.use_exponential_backoff,
            max_backoff_seconds: policy.max_backoff_seconds,
            skip_verification: false,
            log_success: false,
        }
    }
}

impl ConvergeRequest {
    pub fn new(entities: &[&str]) -> Self {
        Self {
            entities: entities.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn tolerances(&self) -> ToleranceConfig {
        ToleranceConfig {
            brightness_pct: self.brightness_tolerance,
            rgb: self.rgb_tolerance,
            kelvin: self.kelvin_tolerance,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay_after_send: self.delay_after_send,
            max_runtime_seconds: self.max_runtime_seconds,
            use_exponential_backoff: self.use_exponential_backoff,
            max_backoff_seconds: self.max_backoff_seconds,
        }
    }

    pub fn defaults(&self, state: TargetState) -> TargetDefaults {
        TargetDefaults {
            state,
            brightness_pct: self.brightness_pct,
            rgb_color: self.rgb_color,
            color_temp_kelvin: self.color_temp_kelvin,
            effect: self.effect.clone().filter(|e| !e.is_empty()),
            transition: Some(self.transition).filter(|t| *t > 0.0),
        }
    }

    /// Overrides keyed by entity id; a later entry for the same light wins.
    pub fn overrides(&self) -> HashMap<String, DeviceOverride> {
        self.targets
            .iter()
            .filter(|t| !t.entity_id.is_empty())
            .map(|t| (t.entity_id.clone(), t.clone()))
            .collect()
    }

    /// Numeric range checks. Entity list and state string are checked by the
    /// controller itself so that their messages come first.
    pub fn validate(&self) -> Result<(), AppError> {
        check_brightness("brightness_pct", self.brightness_pct)?;
        for target in &self.targets {
            if let Some(brightness) = target.brightness_pct {
                check_brightness(&format!("brightness_pct for {}", target.entity_id), brightness)?;
            }
        }
        if self.max_retries < 1 {
            return Err(AppError::InvalidInput(
                "max_retries must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("delay_after_send", self.delay_after_send),
            ("max_runtime_seconds", self.max_runtime_seconds),
            ("max_backoff_seconds", self.max_backoff_seconds),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "{} must be a finite number greater than 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn check_brightness(name: &str, value: u8) -> Result<(), AppError> {
    if (1..=100).contains(&value) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "{} must be between 1 and 100, got {}",
            name, value
        )))
    }
}
