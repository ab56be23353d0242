use dialoguer::{Input, Password};
use log::warn;
use serde_json::json;

use crate::api::client::HassClient;
use crate::auth::credentials::{credentials_from_env, get_credentials};
use crate::auth::keychain;
use crate::auth::token::StoredCredentials;
use crate::cli::output::print_json;
use crate::config::RuntimeConfig;
use crate::error::AppError;

pub async fn handle_login(config: &RuntimeConfig) -> Result<(), AppError> {
    let hass = &config.settings.hass;
    let (url, token) = match credentials_from_env(hass) {
        Some((u, t)) => (u, t),
        None => {
            let mut prompt = Input::<String>::new().with_prompt("Home Assistant URL");
            if let Some(url) = hass.url.as_ref() {
                prompt = prompt.default(url.clone());
            }
            let url = prompt
                .interact_text()
                .map_err(|e| AppError::InvalidInput(e.to_string()))?;
            let token: String = Password::new()
                .with_prompt("Long-lived access token")
                .interact()
                .map_err(|e| AppError::InvalidInput(e.to_string()))?;
            (url, token)
        }
    };

    // Refuse to store anything the instance does not accept.
    let client = HassClient::new(&url, &token)?;
    let message = client.api_status().await?;

    keychain::store_credentials(&StoredCredentials {
        url: client.base_url().to_string(),
        token,
    })?;

    print_json(&json!({
        "status": "authenticated",
        "url": client.base_url(),
        "message": message,
    }));

    Ok(())
}

pub async fn handle_logout(_config: &RuntimeConfig) -> Result<(), AppError> {
    keychain::clear_credentials()?;
    print_json(&json!({"status": "logged_out"}));
    Ok(())
}

pub async fn handle_status(config: &RuntimeConfig) -> Result<(), AppError> {
    match get_credentials(&config.settings.hass) {
        Ok(credentials) => {
            let client = credentials.client()?;
            let reachable = match client.api_status().await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Home Assistant check failed: {}", e);
                    false
                }
            };
            print_json(&json!({
                "status": "authenticated",
                "url": client.base_url(),
                "token_source": if credentials.token_from_env {
                    config.settings.hass.token_env.as_str()
                } else {
                    "keychain"
                },
                "reachable": reachable,
            }));
        }
        Err(AppError::NotAuthenticated(_)) => {
            print_json(&json!({
                "status": "not_authenticated",
            }));
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
