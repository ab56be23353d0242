//! In-memory Home Assistant stand-in for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::api::{Dispatcher, Logbook, StateOracle, TurnOnPayload};
use crate::error::AppError;
use crate::models::entity_state::EntityState;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Read(String),
    On(Vec<String>, TurnOnPayload),
    Off(Vec<String>),
}

/// Lights that obey commands immediately unless marked stuck.
#[derive(Default)]
pub struct FakeHome {
    states: Mutex<HashMap<String, EntityState>>,
    failing_reads: Mutex<HashSet<String>>,
    stuck: Mutex<HashSet<String>>,
    fail_dispatch: AtomicBool,
    events: Mutex<Vec<Event>>,
    logbook: Mutex<Vec<String>>,
}

impl FakeHome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, state: EntityState) -> Self {
        self.set_state(state);
        self
    }

    pub fn with_light(self, entity_id: &str, state: &str) -> Self {
        self.with_state(EntityState::new(entity_id, state))
    }

    pub fn with_color_light(self, entity_id: &str, state: &str) -> Self {
        self.with_state(
            EntityState::new(entity_id, state)
                .with_attr("supported_color_modes", json!(["hs", "color_temp"])),
        )
    }

    pub fn set_state(&self, state: EntityState) {
        self.states
            .lock()
            .unwrap()
            .insert(state.entity_id.clone(), state);
    }

    pub fn state(&self, entity_id: &str) -> Option<EntityState> {
        self.states.lock().unwrap().get(entity_id).cloned()
    }

    pub fn fail_reads_for(&self, entity_id: &str) {
        self.failing_reads
            .lock()
            .unwrap()
            .insert(entity_id.to_string());
    }

    /// The light keeps whatever state it has, ignoring commands.
    pub fn stick(&self, entity_id: &str) {
        self.stuck.lock().unwrap().insert(entity_id.to_string());
    }

    pub fn fail_dispatch(&self) {
        self.fail_dispatch.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn dispatches(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Read(_)))
            .collect()
    }

    pub fn logbook(&self) -> Vec<String> {
        self.logbook.lock().unwrap().clone()
    }

    fn apply(&self, entity_ids: &[String], payload: Option<&TurnOnPayload>) {
        let stuck = self.stuck.lock().unwrap();
        let mut states = self.states.lock().unwrap();
        for id in entity_ids.iter().filter(|id| !stuck.contains(*id)) {
            let Some(state) = states.get_mut(id) else {
                continue;
            };
            match payload {
                Some(payload) => {
                    state.state = "on".into();
                    let raw = (f64::from(payload.brightness_pct) * 255.0 / 100.0).round();
                    state.attributes.insert("brightness".into(), json!(raw as u64));
                    if let Some(rgb) = payload.rgb_color {
                        state.attributes.insert("rgb_color".into(), json!(rgb));
                    }
                    if let Some(kelvin) = payload.color_temp_kelvin {
                        state.attributes.insert("color_temp_kelvin".into(), json!(kelvin));
                    }
                }
                None => {
                    state.state = "off".into();
                    state.attributes.remove("brightness");
                }
            }
        }
    }
}

#[async_trait]
impl StateOracle for FakeHome {
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, AppError> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Read(entity_id.to_string()));
        if self.failing_reads.lock().unwrap().contains(entity_id) {
            return Err(AppError::Hass {
                action: format!("GET /api/states/{}", entity_id),
                message: "connection reset".into(),
                status: None,
            });
        }
        Ok(self.state(entity_id))
    }
}

#[async_trait]
impl Dispatcher for FakeHome {
    async fn turn_on(&self, entity_ids: &[String], payload: &TurnOnPayload) -> Result<(), AppError> {
        self.events
            .lock()
            .unwrap()
            .push(Event::On(entity_ids.to_vec(), payload.clone()));
        if self.fail_dispatch.load(Ordering::SeqCst) {
            return Err(AppError::InvalidInput("dispatch refused".into()));
        }
        self.apply(entity_ids, Some(payload));
        Ok(())
    }

    async fn turn_off(&self, entity_ids: &[String]) -> Result<(), AppError> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Off(entity_ids.to_vec()));
        if self.fail_dispatch.load(Ordering::SeqCst) {
            return Err(AppError::InvalidInput("dispatch refused".into()));
        }
        self.apply(entity_ids, None);
        Ok(())
    }
}

#[async_trait]
impl Logbook for FakeHome {
    async fn log(&self, _name: &str, message: &str) -> Result<(), AppError> {
        self.logbook.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
