use keyring::Entry;

use crate::auth::token::StoredCredentials;
use crate::error::AppError;

const SERVICE: &str = "lightconv";

const URL_KEY: &str = "url";
const TOKEN_KEY: &str = "token";

fn entry(key: &str) -> Result<Entry, AppError> {
    Entry::new(SERVICE, key).map_err(|e| AppError::Keychain(e.to_string()))
}

fn get_value(key: &str) -> Result<Option<String>, AppError> {
    let entry = entry(key)?;
    match entry.get_password() {
        Ok(val) => Ok(Some(val)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(AppError::Keychain(e.to_string())),
    }
}

fn set_value(key: &str, value: &str) -> Result<(), AppError> {
    let entry = entry(key)?;
    entry
        .set_password(value)
        .map_err(|e| AppError::Keychain(e.to_string()))
}

fn delete_value(key: &str) -> Result<(), AppError> {
    let entry = entry(key)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(AppError::Keychain(e.to_string())),
    }
}

pub fn store_credentials(credentials: &StoredCredentials) -> Result<(), AppError> {
    set_value(URL_KEY, &credentials.url)?;
    set_value(TOKEN_KEY, &credentials.token)
}

pub fn stored_url() -> Result<Option<String>, AppError> {
    get_value(URL_KEY)
}

pub fn stored_token() -> Result<Option<String>, AppError> {
    get_value(TOKEN_KEY)
}

pub fn clear_credentials() -> Result<(), AppError> {
    delete_value(URL_KEY)?;
    delete_value(TOKEN_KEY)
}
