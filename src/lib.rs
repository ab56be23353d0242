pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod listeners;
pub mod models;
pub mod presets;
pub mod resolve;
pub mod settings;

#[cfg(test)]
mod testing;

use cli::output::{print_error, print_json};
use config::{OutputMode, RuntimeConfig};
use error::AppError;

pub use engine::LightController;

pub async fn run(cli_args: cli::Cli) -> i32 {
    let settings = match settings::read_settings(cli_args.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            print_error(&err);
            return err.exit_code();
        }
    };

    let config = RuntimeConfig {
        output_mode: if cli_args.table {
            OutputMode::Table
        } else {
            OutputMode::Json
        },
        verbose: cli_args.verbose,
        settings,
    };

    match dispatch(cli_args.command, &config).await {
        Ok(code) => code,
        Err(err) => {
            print_error(&err);
            err.exit_code()
        }
    }
}

async fn dispatch(command: cli::Commands, config: &RuntimeConfig) -> Result<i32, AppError> {
    match command {
        cli::Commands::Login => cli::auth::handle_login(config).await.map(|()| 0),
        cli::Commands::Logout => cli::auth::handle_logout(config).await.map(|()| 0),
        cli::Commands::Status => cli::auth::handle_status(config).await.map(|()| 0),
        cli::Commands::Ensure(args) => cli::ensure::handle(&args, config).await,
        cli::Commands::Preset(cmd) => cli::preset::handle(&cmd, config).await,
        cli::Commands::State { entity } => {
            let client = auth::credentials::get_credentials(&config.settings.hass)?.client()?;
            match client.fetch_state(&entity).await? {
                Some(state) => {
                    print_json(&serde_json::to_value(&state)?);
                    Ok(0)
                }
                None => Err(AppError::EntityNotFound(entity)),
            }
        }
    }
}
