use std::collections::HashSet;

use log::{debug, warn};

use crate::api::StateOracle;
use crate::models::entity_state::{is_entity_id, is_light, EntityState};

/// Concrete lights reachable from a set of caller references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub valid: Vec<String>,
    pub skipped: Vec<String>,
}

async fn read_state<S>(states: &S, entity_id: &str) -> Option<EntityState>
where
    S: StateOracle + ?Sized,
{
    match states.get_state(entity_id).await {
        Ok(state) => state,
        Err(e) => {
            warn!("Could not read state of {}: {}", entity_id, e);
            None
        }
    }
}

async fn is_available<S>(states: &S, entity_id: &str) -> bool
where
    S: StateOracle + ?Sized,
{
    read_state(states, entity_id)
        .await
        .is_some_and(|state| state.is_available())
}

/// Expand one reference: a light group (or `group.*` helper) becomes its light
/// members, a light stays itself, anything else is ignored.
async fn expand_entity<S>(states: &S, reference: &str, valid: &mut Vec<String>, skipped: &mut Vec<String>)
where
    S: StateOracle + ?Sized,
{
    if !is_entity_id(reference) {
        warn!("Invalid entity id: {:?}", reference);
        return;
    }

    let state = read_state(states, reference).await;
    let members: Vec<String> = state
        .as_ref()
        .map(|s| s.members().into_iter().map(str::to_string).collect())
        .unwrap_or_default();

    if !members.is_empty() {
        debug!("Expanding group {} with {} members", reference, members.len());
        for member in members.iter().filter(|m| is_light(m)) {
            if is_available(states, member).await {
                valid.push(member.clone());
            } else {
                skipped.push(member.clone());
            }
        }
    } else if is_light(reference) {
        if state.is_some_and(|s| s.is_available()) {
            valid.push(reference.to_string());
        } else {
            skipped.push(reference.to_string());
        }
    } else {
        warn!("Entity {} is not a light or group", reference);
    }
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Resolve references into deduplicated light ids, preserving first-seen
/// order. A light that resolved as valid anywhere is never reported skipped.
pub async fn resolve_entities<S>(states: &S, references: &[String]) -> Resolution
where
    S: StateOracle + ?Sized,
{
    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for reference in references {
        expand_entity(states, reference, &mut valid, &mut skipped).await;
    }

    let valid = dedup(valid);
    let valid_set: HashSet<&String> = valid.iter().collect();
    let skipped: Vec<String> = dedup(skipped)
        .into_iter()
        .filter(|id| !valid_set.contains(id))
        .collect();

    debug!(
        "Expanded to {} valid lights, {} skipped",
        valid.len(),
        skipped.len()
    );

    Resolution { valid, skipped }
}
