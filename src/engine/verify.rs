use log::{debug, error};

use crate::api::StateOracle;
use crate::error::AppError;
use crate::models::entity_state::{EntityState, STATE_OFF, STATE_ON};
use crate::models::policy::ToleranceConfig;
use crate::models::target::{DeviceTarget, TargetState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Success,
    WrongState,
    WrongBrightness,
    WrongColor,
    Unavailable,
    Error,
}

impl Verification {
    /// Settled lights leave the pending set: either they converged or
    /// retrying cannot help.
    pub fn is_settled(&self) -> bool {
        matches!(self, Verification::Success | Verification::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorCheck {
    Match,
    NoMatch,
    NotApplicable,
}

impl ColorCheck {
    fn satisfied(self) -> bool {
        self != ColorCheck::NoMatch
    }
}

fn within(actual: f64, expected: f64, tolerance: f64) -> bool {
    expected - tolerance <= actual && actual <= expected + tolerance
}

fn check_brightness(state: &EntityState, expected_pct: u8, tolerance: u8) -> Result<bool, AppError> {
    let actual_pct = state.brightness_pct()?;
    let expected = i64::from(expected_pct);
    let tolerance = i64::from(tolerance);
    let matched = (expected - tolerance..=expected + tolerance).contains(&actual_pct);
    debug!(
        "{} brightness: expected={}%, actual={}%, tolerance=±{}%, match={}",
        state.entity_id, expected, actual_pct, tolerance, matched
    );
    Ok(matched)
}

fn check_rgb(state: &EntityState, expected: Option<[u8; 3]>, tolerance: u8) -> Result<ColorCheck, AppError> {
    let Some(expected) = expected else {
        return Ok(ColorCheck::NotApplicable);
    };
    if !state.supports_rgb() {
        return Ok(ColorCheck::NotApplicable);
    }
    let Some(actual) = state.rgb_color()? else {
        return Ok(ColorCheck::NoMatch);
    };

    for (channel, (want, got)) in expected.iter().zip(actual).enumerate() {
        if !within(got, f64::from(*want), f64::from(tolerance)) {
            debug!(
                "{} RGB channel {}: expected={}, actual={}, mismatch",
                state.entity_id, channel, want, got
            );
            return Ok(ColorCheck::NoMatch);
        }
    }
    Ok(ColorCheck::Match)
}

fn check_kelvin(state: &EntityState, expected: Option<u32>, tolerance: u32) -> Result<ColorCheck, AppError> {
    let Some(expected) = expected else {
        return Ok(ColorCheck::NotApplicable);
    };
    if !state.supports_color_temp() {
        return Ok(ColorCheck::NotApplicable);
    }
    let Some(actual) = state.color_temp_kelvin()? else {
        return Ok(ColorCheck::NoMatch);
    };

    if within(actual, f64::from(expected), f64::from(tolerance)) {
        Ok(ColorCheck::Match)
    } else {
        debug!(
            "{} color temperature: expected={}K, actual={}K, mismatch",
            state.entity_id, expected, actual
        );
        Ok(ColorCheck::NoMatch)
    }
}

fn classify(
    target: &DeviceTarget,
    state: Option<&EntityState>,
    tolerances: &ToleranceConfig,
) -> Result<Verification, AppError> {
    let Some(state) = state.filter(|s| s.is_available()) else {
        return Ok(Verification::Unavailable);
    };

    if target.state == TargetState::Off {
        return Ok(if state.state == STATE_OFF {
            Verification::Success
        } else {
            Verification::WrongState
        });
    }

    if state.state != STATE_ON {
        return Ok(Verification::WrongState);
    }

    if !check_brightness(state, target.brightness_pct, tolerances.brightness_pct)? {
        return Ok(Verification::WrongBrightness);
    }

    if target.rgb_color.is_none() && target.color_temp_kelvin.is_none() {
        return Ok(Verification::Success);
    }

    let rgb = check_rgb(state, target.rgb_color, tolerances.rgb)?;
    let kelvin = check_kelvin(state, target.color_temp_kelvin, tolerances.kelvin)?;

    // Either requested representation satisfying the target is enough.
    let requested = [
        target.rgb_color.map(|_| rgb),
        target.color_temp_kelvin.map(|_| kelvin),
    ];
    if requested.iter().flatten().any(|check| check.satisfied()) {
        Ok(Verification::Success)
    } else {
        Ok(Verification::WrongColor)
    }
}

/// Classify an already-read state record against its target.
pub fn verify_state(
    target: &DeviceTarget,
    state: Option<&EntityState>,
    tolerances: &ToleranceConfig,
) -> Verification {
    match classify(target, state, tolerances) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Error verifying {}: {}", target.entity_id, e);
            Verification::Error
        }
    }
}

/// Read the light's live state and classify it.
pub async fn verify_light<S>(states: &S, target: &DeviceTarget, tolerances: &ToleranceConfig) -> Verification
where
    S: StateOracle + ?Sized,
{
    match states.get_state(&target.entity_id).await {
        Ok(state) => verify_state(target, state.as_ref(), tolerances),
        Err(e) => {
            error!("Error verifying {}: {}", target.entity_id, e);
            Verification::Error
        }
    }
}
