use std::sync::Arc;

use clap::Subcommand;
use futures::future::join_all;
use serde_json::json;
use tabled::Tabled;

use crate::api::StateOracle;
use crate::auth::credentials::get_credentials;
use crate::cli::output::{print_json, print_result, print_table};
use crate::config::{OutputMode, RuntimeConfig};
use crate::engine::LightController;
use crate::error::AppError;
use crate::models::preset::PresetConfig;
use crate::presets::PresetRegistry;

#[derive(Subcommand)]
pub enum PresetCommand {
    /// List configured presets
    List,

    /// Converge a preset's lights
    Activate {
        /// Preset ID, name or slug
        preset: String,
    },

    /// Print a preset built from the lights' current state
    Capture {
        /// Name for the new preset
        name: String,
        /// Entity IDs to capture
        #[arg(required = true)]
        entities: Vec<String>,
    },
}

#[derive(Tabled)]
struct PresetRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "SLUG")]
    slug: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "BRIGHTNESS")]
    brightness: String,
    #[tabled(rename = "LIGHTS")]
    lights: usize,
    #[tabled(rename = "OVERRIDES")]
    overrides: usize,
}

impl From<&PresetConfig> for PresetRow {
    fn from(preset: &PresetConfig) -> Self {
        Self {
            name: preset.name.clone(),
            slug: preset.slug(),
            state: preset.state.clone(),
            brightness: format!("{}%", preset.brightness_pct),
            lights: preset.entities.len(),
            overrides: preset.targets.len(),
        }
    }
}

pub async fn handle(cmd: &PresetCommand, config: &RuntimeConfig) -> Result<i32, AppError> {
    match cmd {
        PresetCommand::List => handle_list(config).map(|()| 0),
        PresetCommand::Activate { preset } => handle_activate(preset, config).await,
        PresetCommand::Capture { name, entities } => {
            handle_capture(name, entities, config).await.map(|()| 0)
        }
    }
}

fn handle_list(config: &RuntimeConfig) -> Result<(), AppError> {
    let presets = &config.settings.presets;

    if config.output_mode == OutputMode::Table {
        let rows: Vec<PresetRow> = presets.iter().map(PresetRow::from).collect();
        print_table(&rows);
    } else {
        let json_presets: Vec<serde_json::Value> = presets
            .iter()
            .map(|p| {
                let mut value = serde_json::to_value(p).unwrap_or_default();
                value["slug"] = json!(p.slug());
                value
            })
            .collect();
        print_json(&json!(json_presets));
    }

    Ok(())
}

async fn handle_activate(key: &str, config: &RuntimeConfig) -> Result<i32, AppError> {
    let registry = PresetRegistry::new(config.settings.presets.clone());
    // Fail on an unknown preset before asking for credentials.
    let preset_id = registry.find(key)?.id.clone();

    let client = get_credentials(&config.settings.hass)?.client()?;
    let controller = LightController::new(Arc::new(client));
    let base = config.settings.defaults.base_request();

    let result = registry.activate(&controller, &preset_id, base).await?;
    print_result(&result, &config.output_mode);
    Ok(result.result_code.exit_code())
}

async fn handle_capture(name: &str, entities: &[String], config: &RuntimeConfig) -> Result<(), AppError> {
    let client = get_credentials(&config.settings.hass)?.client()?;

    let states = join_all(entities.iter().map(|id| client.get_state(id))).await;
    let states = states.into_iter().collect::<Result<Vec<_>, AppError>>()?;

    let preset = PresetConfig::from_current(name, entities, &states);
    print_json(&serde_json::to_value(&preset)?);
    Ok(())
}
