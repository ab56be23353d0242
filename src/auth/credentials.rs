use std::env;

use log::debug;

use crate::api::client::HassClient;
use crate::auth::keychain;
use crate::error::AppError;
use crate::settings::HassSettings;

/// Environment variable consulted by `login` for the instance URL.
pub const URL_ENV: &str = "LIGHTCONV_URL";

pub struct HassCredentials {
    pub url: String,
    pub token: String,
    pub token_from_env: bool,
}

impl HassCredentials {
    pub fn client(&self) -> Result<HassClient, AppError> {
        HassClient::new(&self.url, &self.token)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Token from the configured environment variable, else the keychain. The
/// URL comes from settings, else the keychain. The keychain is only touched
/// when something is still missing.
pub fn get_credentials(settings: &HassSettings) -> Result<HassCredentials, AppError> {
    let not_authenticated = || AppError::NotAuthenticated(settings.token_env.clone());

    let (token, token_from_env) = match non_empty_env(&settings.token_env) {
        Some(token) => {
            debug!("Using access token from ${}", settings.token_env);
            (token, true)
        }
        None => {
            let token = keychain::stored_token()?
                .filter(|t| !t.is_empty())
                .ok_or_else(not_authenticated)?;
            (token, false)
        }
    };

    let url = match settings.url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => url.to_string(),
        None => keychain::stored_url()?
            .filter(|u| !u.is_empty())
            .ok_or_else(not_authenticated)?,
    };

    Ok(HassCredentials {
        url,
        token,
        token_from_env,
    })
}

/// Get URL and token from env vars for login, or None if either is unset.
pub fn credentials_from_env(settings: &HassSettings) -> Option<(String, String)> {
    let url = non_empty_env(URL_ENV).or_else(|| settings.url.clone().filter(|u| !u.is_empty()))?;
    let token = non_empty_env(&settings.token_env)?;
    Some((url, token))
}
