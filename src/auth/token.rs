use serde::{Deserialize, Serialize};

/// Connection details kept in the OS keychain after `login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub url: String,
    pub token: String,
}
