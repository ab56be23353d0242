use std::sync::Arc;

use clap::Args;

use crate::auth::credentials::get_credentials;
use crate::cli::output::print_result;
use crate::config::RuntimeConfig;
use crate::engine::LightController;
use crate::error::AppError;
use crate::models::request::ConvergeRequest;
use crate::models::target::DeviceOverride;
use crate::settings::DefaultsSettings;

/// Parse `R,G,B` with each channel 0-255.
pub fn parse_rgb(value: &str) -> Result<[u8; 3], String> {
    let channels: Vec<&str> = value.split(',').map(str::trim).collect();
    if channels.len() != 3 {
        return Err(format!("expected R,G,B, got '{}'", value));
    }
    let mut rgb = [0u8; 3];
    for (slot, channel) in rgb.iter_mut().zip(&channels) {
        *slot = channel
            .parse()
            .map_err(|_| format!("'{}' is not a channel value between 0 and 255", channel))?;
    }
    Ok(rgb)
}

#[derive(Args, Debug, Clone)]
pub struct EnsureArgs {
    /// Light, light group or group entity IDs
    #[arg(required = true)]
    pub entities: Vec<String>,

    /// Target state (on or off)
    #[arg(long, default_value = "on")]
    pub state: String,

    /// Brightness percent (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub brightness: Option<u8>,

    /// RGB color as R,G,B
    #[arg(long, value_parser = parse_rgb)]
    pub rgb: Option<[u8; 3]>,

    /// Color temperature in Kelvin
    #[arg(long)]
    pub kelvin: Option<u32>,

    /// Light effect name
    #[arg(long)]
    pub effect: Option<String>,

    /// Per-light overrides as a JSON array, e.g. '[{"entity_id":"light.a","brightness_pct":20}]'
    #[arg(long, value_name = "JSON")]
    pub targets: Option<String>,

    /// Accepted brightness deviation in percent
    #[arg(long)]
    pub brightness_tolerance: Option<u8>,

    /// Accepted deviation per RGB channel
    #[arg(long)]
    pub rgb_tolerance: Option<u8>,

    /// Accepted color temperature deviation in Kelvin
    #[arg(long)]
    pub kelvin_tolerance: Option<u32>,

    /// Transition in seconds (first attempt only)
    #[arg(long)]
    pub transition: Option<f64>,

    /// Seconds to wait between sending and verifying
    #[arg(long)]
    pub delay: Option<f64>,

    /// Maximum number of send/verify rounds
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Overall time budget in seconds
    #[arg(long)]
    pub max_runtime: Option<f64>,

    /// Double the delay on every retry
    #[arg(long)]
    pub backoff: bool,

    /// Upper bound for the backoff delay in seconds
    #[arg(long)]
    pub max_backoff: Option<f64>,

    /// Send once and return without verifying
    #[arg(long)]
    pub skip_verification: bool,

    /// Also write successful outcomes to the logbook
    #[arg(long)]
    pub log_success: bool,
}

impl EnsureArgs {
    /// Flags first, then configured defaults, then built-in defaults.
    pub fn to_request(&self, defaults: &DefaultsSettings) -> Result<ConvergeRequest, AppError> {
        let base = defaults.base_request();
        let targets: Vec<DeviceOverride> = match self.targets.as_deref() {
            Some(json) => serde_json::from_str(json)?,
            None => Vec::new(),
        };

        Ok(ConvergeRequest {
            entities: self.entities.clone(),
            state: self.state.clone(),
            brightness_pct: self.brightness.unwrap_or(base.brightness_pct),
            rgb_color: self.rgb,
            color_temp_kelvin: self.kelvin,
            effect: self.effect.clone(),
            targets,
            brightness_tolerance: self
                .brightness_tolerance
                .unwrap_or(base.brightness_tolerance),
            rgb_tolerance: self.rgb_tolerance.unwrap_or(base.rgb_tolerance),
            kelvin_tolerance: self.kelvin_tolerance.unwrap_or(base.kelvin_tolerance),
            transition: self.transition.unwrap_or(base.transition),
            delay_after_send: self.delay.unwrap_or(base.delay_after_send),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            max_runtime_seconds: self.max_runtime.unwrap_or(base.max_runtime_seconds),
            use_exponential_backoff: self.backoff || base.use_exponential_backoff,
            max_backoff_seconds: self.max_backoff.unwrap_or(base.max_backoff_seconds),
            skip_verification: self.skip_verification,
            log_success: self.log_success || base.log_success,
        })
    }
}

/// Returns the process exit code for the convergence outcome.
pub async fn handle(args: &EnsureArgs, config: &RuntimeConfig) -> Result<i32, AppError> {
    let request = args.to_request(&config.settings.defaults)?;
    let client = get_credentials(&config.settings.hass)?.client()?;
    let controller = LightController::new(Arc::new(client));

    let result = controller.ensure_state(&request).await;
    print_result(&result, &config.output_mode);
    Ok(result.result_code.exit_code())
}
