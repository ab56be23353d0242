use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{Dispatcher, Logbook, StateOracle, TurnOnPayload};
use crate::error::AppError;
use crate::models::entity_state::{EntityState, LIGHT_DOMAIN};

const PATH_API_STATUS: &str = "/api/";
const PATH_STATES: &str = "/api/states";
const PATH_SERVICES: &str = "/api/services";

#[derive(Debug, Deserialize)]
struct ApiStatus {
    message: String,
}

/// Home Assistant REST API client.
pub struct HassClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

fn build_http_client() -> Result<reqwest::Client, AppError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("lightconv/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(HassClient::DEFAULT_TIMEOUT_SECS))
        .build()?)
}

impl HassClient {
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn new(base_url: &str, token: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(AppError::InvalidInput(
                "Home Assistant URL is empty".into(),
            ));
        }
        if token.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Home Assistant access token is empty".into(),
            ));
        }

        Ok(Self {
            client: build_http_client()?,
            base_url: base_url.to_string(),
            token: token.trim().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        action: &str,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(action.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, body)
        };
        Err(AppError::Hass {
            action: action.to_string(),
            message,
            status: Some(status.as_u16()),
        })
    }

    /// Connectivity and token check. Returns the API's status message.
    pub async fn api_status(&self) -> Result<String, AppError> {
        let action = format!("GET {}", PATH_API_STATUS);
        debug!("{}", action);
        let response = self
            .client
            .get(self.endpoint(PATH_API_STATUS))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = self.check_status(response, &action).await?;
        let status: ApiStatus = response.json().await?;
        Ok(status.message)
    }

    pub async fn fetch_state(&self, entity_id: &str) -> Result<Option<EntityState>, AppError> {
        let path = format!("{}/{}", PATH_STATES, entity_id);
        let action = format!("GET {}", path);
        debug!("{}", action);

        let response = self
            .client
            .get(self.endpoint(&path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} does not exist", entity_id);
            return Ok(None);
        }
        let response = self.check_status(response, &action).await?;
        Ok(Some(response.json().await?))
    }

    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Map<String, Value>,
    ) -> Result<(), AppError> {
        let path = format!("{}/{}/{}", PATH_SERVICES, domain, service);
        let action = format!("POST {}", path);
        let body = Value::Object(data);
        debug!("{} {}", action, body);

        let response = self
            .client
            .post(self.endpoint(&path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        self.check_status(response, &action).await?;
        Ok(())
    }
}

fn service_data(entity_ids: &[String], payload: Option<&TurnOnPayload>) -> Result<Map<String, Value>, AppError> {
    let mut data = match payload {
        Some(payload) => match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        None => Map::new(),
    };
    data.insert("entity_id".to_string(), json!(entity_ids));
    Ok(data)
}

#[async_trait]
impl StateOracle for HassClient {
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, AppError> {
        self.fetch_state(entity_id).await
    }
}

#[async_trait]
impl Dispatcher for HassClient {
    async fn turn_on(&self, entity_ids: &[String], payload: &TurnOnPayload) -> Result<(), AppError> {
        let data = service_data(entity_ids, Some(payload))?;
        self.call_service(LIGHT_DOMAIN, "turn_on", data).await
    }

    async fn turn_off(&self, entity_ids: &[String]) -> Result<(), AppError> {
        let data = service_data(entity_ids, None)?;
        self.call_service(LIGHT_DOMAIN, "turn_off", data).await
    }
}

#[async_trait]
impl Logbook for HassClient {
    async fn log(&self, name: &str, message: &str) -> Result<(), AppError> {
        let mut data = Map::new();
        data.insert("name".to_string(), json!(name));
        data.insert("message".to_string(), json!(message));
        self.call_service("logbook", "log", data).await
    }
}
