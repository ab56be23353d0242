#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Home Assistant rejected the access token during {0}")]
    Unauthorized(String),

    #[error("Home Assistant error during {action}: {message}")]
    Hass {
        action: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Not authenticated. Run 'lightconv login' first or set {0}.")]
    NotAuthenticated(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Malformed state for {entity_id}: {message}")]
    MalformedState { entity_id: String, message: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn malformed(entity_id: &str, message: impl Into<String>) -> Self {
        AppError::MalformedState {
            entity_id: entity_id.to_string(),
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Unauthorized(_) | AppError::NotAuthenticated(_) => 2,
            AppError::PresetNotFound(_) | AppError::EntityNotFound(_) => 3,
            _ => 1,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Hass { .. } => "hass",
            AppError::NotAuthenticated(_) => "not_authenticated",
            AppError::Keychain(_) => "keychain",
            AppError::PresetNotFound(_) => "preset_not_found",
            AppError::EntityNotFound(_) => "entity_not_found",
            AppError::MalformedState { .. } => "malformed_state",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Config(_) => "config",
            AppError::Http(_) => "http",
            AppError::Json(_) => "json",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "error": self.error_type(),
            "message": self.to_string(),
        });
        if let AppError::Hass {
            status: Some(status),
            ..
        } = self
        {
            obj["status"] = serde_json::json!(status);
        }
        obj
    }
}
