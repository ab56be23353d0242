use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::engine::LightController;
use crate::error::AppError;
use crate::listeners::Listeners;
use crate::models::preset::PresetConfig;
use crate::models::request::ConvergeRequest;
use crate::models::result::OperationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetStatus {
    #[default]
    Idle,
    Activating,
    Success,
    Failed,
}

impl PresetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetStatus::Idle => "idle",
            PresetStatus::Activating => "activating",
            PresetStatus::Success => "success",
            PresetStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PresetRuntime {
    pub status: PresetStatus,
    pub last_activated: Option<DateTime<Utc>>,
    pub last_result: Option<OperationResult>,
}

/// Emitted on every status change.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetEvent {
    pub preset_id: String,
    pub status: PresetStatus,
}

pub struct PresetRegistry {
    presets: Vec<PresetConfig>,
    runtime: Mutex<HashMap<String, PresetRuntime>>,
    listeners: Listeners<PresetEvent>,
}

impl PresetRegistry {
    pub fn new(presets: Vec<PresetConfig>) -> Self {
        Self {
            presets,
            runtime: Mutex::new(HashMap::new()),
            listeners: Listeners::new(),
        }
    }

    pub fn presets(&self) -> &[PresetConfig] {
        &self.presets
    }

    pub fn listeners(&self) -> &Listeners<PresetEvent> {
        &self.listeners
    }

    /// Lookup by id, then case-insensitive name, then slug.
    pub fn find(&self, key: &str) -> Result<&PresetConfig, AppError> {
        let key = key.trim();
        let lowered = key.to_lowercase();
        self.presets
            .iter()
            .find(|p| p.id == key)
            .or_else(|| self.presets.iter().find(|p| p.name.to_lowercase() == lowered))
            .or_else(|| self.presets.iter().find(|p| p.slug() == lowered))
            .ok_or_else(|| AppError::PresetNotFound(key.to_string()))
    }

    pub fn status(&self, preset_id: &str) -> PresetRuntime {
        self.runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(preset_id)
            .cloned()
            .unwrap_or_default()
    }

    fn set_status(&self, preset_id: &str, status: PresetStatus, result: Option<OperationResult>) {
        {
            let mut runtime = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
            let entry = runtime.entry(preset_id.to_string()).or_default();
            entry.status = status;
            if result.is_some() {
                entry.last_result = result;
            }
            if matches!(status, PresetStatus::Success | PresetStatus::Failed) {
                entry.last_activated = Some(Utc::now());
            }
        }
        self.listeners.notify(&PresetEvent {
            preset_id: preset_id.to_string(),
            status,
        });
    }

    /// Converge the preset's lights, taking tolerances and timing from `base`.
    pub async fn activate(
        &self,
        controller: &LightController,
        key: &str,
        base: ConvergeRequest,
    ) -> Result<OperationResult, AppError> {
        let preset = self.find(key)?;
        info!("Activating preset: {}", preset.name);
        self.set_status(&preset.id, PresetStatus::Activating, None);

        let result = controller.ensure_state(&preset.apply_to(base)).await;

        let status = if result.success {
            PresetStatus::Success
        } else {
            PresetStatus::Failed
        };
        self.set_status(&preset.id, status, Some(result.clone()));
        Ok(result)
    }
}
