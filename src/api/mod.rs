pub mod client;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::models::entity_state::EntityState;

/// Settings for one `light.turn_on` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOnPayload {
    pub brightness_pct: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<[u8; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temp_kelvin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<f64>,
}

/// Read access to live entity state.
#[async_trait]
pub trait StateOracle: Send + Sync {
    /// `Ok(None)` when the entity does not exist.
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, AppError>;
}

/// Best-effort command channel to the lights.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn turn_on(&self, entity_ids: &[String], payload: &TurnOnPayload) -> Result<(), AppError>;

    async fn turn_off(&self, entity_ids: &[String]) -> Result<(), AppError>;
}

/// Human-readable activity sink.
#[async_trait]
pub trait Logbook: Send + Sync {
    async fn log(&self, name: &str, message: &str) -> Result<(), AppError>;
}

pub trait Backend: StateOracle + Dispatcher + Logbook {}

impl<T: StateOracle + Dispatcher + Logbook> Backend for T {}
