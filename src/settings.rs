use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::preset::PresetConfig;
use crate::models::request::ConvergeRequest;

pub const ENV_PREFIX: &str = "LIGHTCONV";

fn default_token_env() -> String {
    "HASS_TOKEN".to_string()
}

#[derive(Clone, Deserialize, Debug)]
pub struct HassSettings {
    pub url: Option<String>,
    /// Name of the environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for HassSettings {
    fn default() -> Self {
        Self {
            url: None,
            token_env: default_token_env(),
        }
    }
}

/// Site-wide fallbacks for `ensure` parameters not given on the command line.
#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DefaultsSettings {
    pub brightness_pct: Option<u8>,
    pub transition: Option<f64>,
    pub brightness_tolerance: Option<u8>,
    pub rgb_tolerance: Option<u8>,
    pub kelvin_tolerance: Option<u32>,
    pub delay_after_send: Option<f64>,
    pub max_retries: Option<u32>,
    pub max_runtime_seconds: Option<f64>,
    pub use_exponential_backoff: Option<bool>,
    pub max_backoff_seconds: Option<f64>,
    pub log_success: Option<bool>,
}

impl DefaultsSettings {
    /// A request with built-in defaults, overlaid with whatever is configured.
    pub fn base_request(&self) -> ConvergeRequest {
        let builtin = ConvergeRequest::default();
        ConvergeRequest {
            brightness_pct: self.brightness_pct.unwrap_or(builtin.brightness_pct),
            transition: self.transition.unwrap_or(builtin.transition),
            brightness_tolerance: self
                .brightness_tolerance
                .unwrap_or(builtin.brightness_tolerance),
            rgb_tolerance: self.rgb_tolerance.unwrap_or(builtin.rgb_tolerance),
            kelvin_tolerance: self.kelvin_tolerance.unwrap_or(builtin.kelvin_tolerance),
            delay_after_send: self.delay_after_send.unwrap_or(builtin.delay_after_send),
            max_retries: self.max_retries.unwrap_or(builtin.max_retries),
            max_runtime_seconds: self
                .max_runtime_seconds
                .unwrap_or(builtin.max_runtime_seconds),
            use_exponential_backoff: self
                .use_exponential_backoff
                .unwrap_or(builtin.use_exponential_backoff),
            max_backoff_seconds: self
                .max_backoff_seconds
                .unwrap_or(builtin.max_backoff_seconds),
            log_success: self.log_success.unwrap_or(builtin.log_success),
            ..builtin
        }
    }
}

#[derive(Clone, Deserialize, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub hass: HassSettings,
    pub defaults: DefaultsSettings,
    pub presets: Vec<PresetConfig>,
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lightconv").join("config.toml"))
}

/// Load settings from `path` (which must exist) or from the default location
/// (which may not), then apply `LIGHTCONV_<SECTION>__<KEY>` overrides.
pub fn read_settings(path: Option<&Path>) -> Result<Settings, AppError> {
    let mut builder = Config::builder();

    match path {
        Some(path) => builder = builder.add_source(File::from(path).required(true)),
        None => {
            if let Some(path) = default_path() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Settings>()?;

    Ok(settings)
}
