use std::sync::Arc;

use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio::time::Instant;

use super::batch::{plan_commands, CommandPlan};
use super::plan::build_targets;
use super::verify::verify_light;
use crate::api::{Backend, Dispatcher, Logbook};
use crate::listeners::Listeners;
use crate::models::request::ConvergeRequest;
use crate::models::result::{OperationResult, ResultCode};
use crate::models::target::{DeviceTarget, TargetState};
use crate::resolve::resolve_entities;

pub const LOGBOOK_NAME: &str = "Light Controller";

/// Drives lights to a target state and confirms they got there.
pub struct LightController {
    backend: Arc<dyn Backend>,
    listeners: Listeners<OperationResult>,
}

impl LightController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            listeners: Listeners::new(),
        }
    }

    /// Observers notified with every result `ensure_state` returns.
    pub fn listeners(&self) -> &Listeners<OperationResult> {
        &self.listeners
    }

    pub async fn ensure_state(&self, request: &ConvergeRequest) -> OperationResult {
        let result = self.converge(request).await;
        self.listeners.notify(&result);
        result
    }

    async fn converge(&self, request: &ConvergeRequest) -> OperationResult {
        let started = Instant::now();
        info!("Starting ensure_state with {} entities", request.entities.len());

        if request.entities.is_empty() {
            let message = "No entities provided";
            warn!("{}", message);
            self.log_to_logbook(&format!("{}; exiting.", message)).await;
            return OperationResult::error(message);
        }

        let target_state: TargetState = match request.state.parse() {
            Ok(state) => state,
            Err(e) => {
                error!("{}", e);
                return OperationResult::error(e.to_string());
            }
        };

        if let Err(e) = request.validate() {
            error!("{}", e);
            return OperationResult::error(e.to_string());
        }

        let resolution = resolve_entities(self.backend.as_ref(), &request.entities).await;
        let members = resolution.valid;
        let skipped = resolution.skipped;

        if members.is_empty() {
            let mut message = String::from("No valid light entities found");
            if !skipped.is_empty() {
                message.push_str(&format!(". Skipped: {}", skipped.join(", ")));
            }
            warn!("{}", message);
            self.log_to_logbook(&message).await;
            return OperationResult::new(ResultCode::NoValidEntities, message)
                .with_lights(0, Vec::new(), skipped)
                .with_elapsed(started.elapsed().as_secs_f64());
        }

        if !skipped.is_empty() {
            info!(
                "Skipped {} unavailable entities: {}",
                skipped.len(),
                skipped.join(", ")
            );
        }

        let targets = build_targets(
            &members,
            &request.overrides(),
            &request.defaults(target_state),
        );

        if request.skip_verification {
            info!("Fire-and-forget mode");
            self.dispatch(&plan_commands(&targets, true)).await;

            if request.log_success {
                self.log_to_logbook(&format!(
                    "Fire-and-forget: Sent {} to {} lights",
                    target_state,
                    members.len()
                ))
                .await;
            }

            return OperationResult::new(
                ResultCode::Success,
                format!("Fire-and-forget: sent {} to {} lights", target_state, members.len()),
            )
            .with_lights(members.len(), Vec::new(), skipped)
            .with_elapsed(started.elapsed().as_secs_f64());
        }

        let policy = request.retry_policy();
        let tolerances = request.tolerances();
        let mut pending: Vec<DeviceTarget> = targets;
        let mut attempt: u32 = 0;

        while !pending.is_empty() && attempt < policy.max_retries {
            let elapsed = started.elapsed();
            if policy.runtime_exceeded(elapsed) {
                warn!("Timeout reached after {:.1}s", elapsed.as_secs_f64());
                break;
            }

            info!(
                "Attempt {}/{}: {} lights pending",
                attempt + 1,
                policy.max_retries,
                pending.len()
            );

            // Only the first round animates; retries snap straight to target.
            self.dispatch(&plan_commands(&pending, attempt == 0)).await;

            tokio::time::sleep(policy.delay(attempt)).await;

            let backend = self.backend.as_ref();
            let outcomes = join_all(
                pending
                    .iter()
                    .map(|target| verify_light(backend, target, &tolerances)),
            )
            .await;

            let before = pending.len();
            pending = pending
                .into_iter()
                .zip(outcomes)
                .filter(|(_, outcome)| !outcome.is_settled())
                .map(|(target, _)| target)
                .collect();

            debug!(
                "Verification: {} succeeded, {} pending",
                before - pending.len(),
                pending.len()
            );

            attempt += 1;
        }

        let elapsed = started.elapsed();
        let failed: Vec<String> = pending.iter().map(|t| t.entity_id.clone()).collect();

        if !failed.is_empty() && policy.runtime_exceeded(elapsed) {
            let message = format!(
                "Timeout after {:?}s. Failed: {}",
                policy.max_runtime_seconds,
                failed.join(", ")
            );
            error!("{}", message);
            self.log_to_logbook(&message).await;
            return OperationResult::new(ResultCode::Timeout, message)
                .with_attempts(attempt)
                .with_lights(members.len(), failed, skipped)
                .with_elapsed(elapsed.as_secs_f64());
        }

        if !failed.is_empty() {
            let message = format!(
                "Failed after {} attempts. Remaining: {}",
                attempt,
                failed.join(", ")
            );
            error!("{}", message);
            self.log_to_logbook(&message).await;
            return OperationResult::new(ResultCode::Failed, message)
                .with_attempts(attempt)
                .with_lights(members.len(), failed, skipped)
                .with_elapsed(elapsed.as_secs_f64());
        }

        let mut message = format!(
            "Set {} lights to {} in {} attempts",
            members.len(),
            target_state,
            attempt
        );
        if !skipped.is_empty() {
            message.push_str(&format!(". Skipped {} unavailable.", skipped.len()));
        }
        info!("{}", message);
        if request.log_success {
            self.log_to_logbook(&message).await;
        }

        OperationResult::new(ResultCode::Success, message)
            .with_attempts(attempt)
            .with_lights(members.len(), Vec::new(), skipped)
            .with_elapsed(elapsed.as_secs_f64())
    }

    /// Sends one round of commands. Every call runs concurrently and all of
    /// them finish before this returns. Failures are logged, never raised.
    async fn dispatch(&self, plan: &CommandPlan) {
        let backend = self.backend.as_ref();

        let off = async {
            if plan.off.is_empty() {
                return;
            }
            debug!("Sending turn_off to {} lights", plan.off.len());
            if let Err(e) = backend.turn_off(&plan.off).await {
                error!("Error sending turn_off: {}", e);
            }
        };

        let on = join_all(plan.on.iter().map(|batch| async move {
            let payload = batch.payload();
            debug!(
                "Sending turn_on to {} lights: {:?}",
                batch.entity_ids.len(),
                payload
            );
            if let Err(e) = backend.turn_on(&batch.entity_ids, &payload).await {
                error!("Error sending turn_on: {}", e);
            }
        }));

        futures::join!(off, on);
    }

    async fn log_to_logbook(&self, message: &str) {
        if let Err(e) = self.backend.log(LOGBOOK_NAME, message).await {
            warn!("Failed to write logbook entry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity_state::EntityState;
    use crate::models::target::DeviceOverride;
    use crate::testing::{Event, FakeHome};
    use serde_json::json;
    use std::sync::Mutex;

    fn controller(home: &Arc<FakeHome>) -> LightController {
        LightController::new(home.clone())
    }

    fn reads(home: &FakeHome) -> usize {
        home.events()
            .iter()
            .filter(|e| matches!(e, Event::Read(_)))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_and_forget_dispatches_once_without_verifying() {
        let home = Arc::new(
            FakeHome::new()
                .with_light("light.a", "off")
                .with_light("light.b", "off"),
        );
        let mut request = ConvergeRequest::new(&["light.a", "light.b", "light.a"]);
        request.skip_verification = true;
        request.log_success = true;

        let result = controller(&home).ensure_state(&request).await;

        assert!(result.success);
        assert_eq!(result.result_code, ResultCode::Success);
        assert_eq!(result.total_lights, 2);
        assert_eq!(result.attempts, 0);
        assert_eq!(result.message, "Fire-and-forget: sent on to 2 lights");
        assert_eq!(home.dispatches().len(), 1);
        // Only the three resolution reads happened.
        assert_eq!(reads(&home), 3);
        assert_eq!(home.logbook(), vec!["Fire-and-forget: Sent on to 2 lights"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_valid_entities() {
        let home = Arc::new(FakeHome::new().with_light("light.porch", "unavailable"));
        let request = ConvergeRequest::new(&["light.porch", "light.ghost"]);

        let result = controller(&home).ensure_state(&request).await;

        assert!(!result.success);
        assert_eq!(result.result_code, ResultCode::NoValidEntities);
        assert_eq!(
            result.message,
            "No valid light entities found. Skipped: light.porch, light.ghost"
        );
        assert_eq!(result.skipped_lights, vec!["light.porch", "light.ghost"]);
        assert!(home.dispatches().is_empty());
        assert_eq!(home.logbook().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_entity_list_is_an_error() {
        let home = Arc::new(FakeHome::new());
        let result = controller(&home).ensure_state(&ConvergeRequest::default()).await;

        assert_eq!(result.result_code, ResultCode::Error);
        assert_eq!(result.message, "No entities provided");
        assert_eq!(home.logbook(), vec!["No entities provided; exiting."]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_state_is_an_error() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "on"));
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.state = "dim".into();

        let result = controller(&home).ensure_state(&request).await;

        assert_eq!(result.result_code, ResultCode::Error);
        assert_eq!(result.message, "Invalid state 'dim'. Must be 'on' or 'off'.");
        assert!(home.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_numbers_are_rejected_before_dispatch() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "on"));
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.max_retries = 0;

        let result = controller(&home).ensure_state(&request).await;

        assert_eq!(result.result_code, ResultCode::Error);
        assert!(home.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_converged_light_takes_one_attempt() {
        let home = Arc::new(FakeHome::new().with_state(
            EntityState::new("light.a", "on").with_attr("brightness", json!(191)),
        ));
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.brightness_pct = 75;

        let result = controller(&home).ensure_state(&request).await;

        assert!(result.success);
        assert_eq!(result.attempts, 1);
        assert!(result.failed_lights.is_empty());
        assert_eq!(result.message, "Set 1 lights to on in 1 attempts");
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_call_is_idempotent() {
        let home = Arc::new(
            FakeHome::new()
                .with_color_light("light.a", "off")
                .with_color_light("light.b", "on"),
        );
        let mut request = ConvergeRequest::new(&["light.a", "light.b"]);
        request.brightness_pct = 40;
        request.color_temp_kelvin = Some(2700);
        let controller = controller(&home);

        let first = controller.ensure_state(&request).await;
        let second = controller.ensure_state(&request).await;

        assert_eq!(first.result_code, ResultCode::Success);
        assert_eq!(second.result_code, ResultCode::Success);
        assert_eq!(first.total_lights, second.total_lights);
        assert_eq!(second.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_light_fails_after_retries() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        home.stick("light.a");
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.max_retries = 2;

        let result = controller(&home).ensure_state(&request).await;

        assert_eq!(result.result_code, ResultCode::Failed);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.failed_lights, vec!["light.a"]);
        assert_eq!(result.message, "Failed after 2 attempts. Remaining: light.a");
        assert_eq!(home.logbook(), vec!["Failed after 2 attempts. Remaining: light.a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_takes_precedence_over_failure() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        home.stick("light.a");
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.max_retries = 10;
        request.max_runtime_seconds = 0.001;

        let result = controller(&home).ensure_state(&request).await;

        assert_eq!(result.result_code, ResultCode::Timeout);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.failed_lights, vec!["light.a"]);
        assert!(result.message.starts_with("Timeout after 0.001s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_message_keeps_the_decimal_point() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        home.stick("light.a");
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.max_retries = 100;
        request.max_runtime_seconds = 4.0;

        let result = controller(&home).ensure_state(&request).await;

        assert_eq!(result.result_code, ResultCode::Timeout);
        assert_eq!(result.message, "Timeout after 4.0s. Failed: light.a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_finite_delay_is_an_error_result() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.delay_after_send = f64::INFINITY;

        let result = controller(&home).ensure_state(&request).await;

        assert_eq!(result.result_code, ResultCode::Error);
        assert!(result.message.contains("delay_after_send"));
        assert!(home.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_light_is_skipped_and_the_rest_converge() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        let request = ConvergeRequest::new(&["light.a", "light.unavailable"]);

        let result = controller(&home).ensure_state(&request).await;

        assert!(result.success);
        assert_eq!(result.total_lights, 1);
        assert_eq!(result.skipped_lights, vec!["light.unavailable"]);
        assert_eq!(
            result.message,
            "Set 1 lights to on in 1 attempts. Skipped 1 unavailable."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_light_going_unavailable_mid_run_is_not_retried() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        home.stick("light.a");
        let request = ConvergeRequest::new(&["light.a"]);
        let controller = controller(&home);

        // Drop the light while the first round is sleeping.
        let home_for_task = home.clone();
        let drop_light = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            home_for_task.set_state(EntityState::new("light.a", "unavailable"));
        });
        let result = controller.ensure_state(&request).await;
        drop_light.await.unwrap();

        assert!(result.success);
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_only_on_first_attempt() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        home.stick("light.a");
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.transition = 1.5;
        request.max_retries = 2;

        controller(&home).ensure_state(&request).await;

        let transitions: Vec<Option<f64>> = home
            .dispatches()
            .into_iter()
            .filter_map(|e| match e {
                Event::On(_, payload) => Some(payload.transition),
                _ => None,
            })
            .collect();
        assert_eq!(transitions, vec![Some(1.5), None]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_overrides_dispatch_off_and_on_batches() {
        let home = Arc::new(
            FakeHome::new()
                .with_light("light.a", "off")
                .with_light("light.b", "off")
                .with_light("light.c", "on"),
        );
        let mut request = ConvergeRequest::new(&["light.a", "light.b", "light.c"]);
        request.brightness_pct = 50;
        request.targets = vec![
            DeviceOverride {
                entity_id: "light.b".into(),
                brightness_pct: Some(80),
                ..Default::default()
            },
            DeviceOverride {
                entity_id: "light.c".into(),
                state: Some(TargetState::Off),
                ..Default::default()
            },
        ];

        let result = controller(&home).ensure_state(&request).await;

        assert!(result.success);
        let dispatches = home.dispatches();
        assert_eq!(dispatches.len(), 3);
        assert!(dispatches.contains(&Event::Off(vec!["light.c".into()])));
        assert_eq!(home.state("light.c").unwrap().state, "off");
        assert_eq!(
            home.state("light.b").unwrap().brightness_pct().unwrap(),
            80
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_errors_are_absorbed() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        home.fail_dispatch();
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.max_retries = 3;

        let result = controller(&home).ensure_state(&request).await;

        assert_eq!(result.result_code, ResultCode::Failed);
        assert_eq!(result.attempts, 3);
        assert_eq!(home.dispatches().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_errors_keep_the_light_pending() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.max_retries = 2;
        let controller = controller(&home);

        // Reads fail only after resolution has accepted the light.
        let home_for_task = home.clone();
        let break_reads = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            home_for_task.fail_reads_for("light.a");
        });
        let result = controller.ensure_state(&request).await;
        break_reads.await.unwrap();

        assert_eq!(result.result_code, ResultCode::Failed);
        assert_eq!(result.failed_lights, vec!["light.a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_between_rounds() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "off"));
        home.stick("light.a");
        let mut request = ConvergeRequest::new(&["light.a"]);
        request.max_retries = 3;
        request.use_exponential_backoff = true;
        request.delay_after_send = 1.0;
        request.max_backoff_seconds = 3.0;

        let result = controller(&home).ensure_state(&request).await;

        // 1 + 2 + 3 (capped)
        assert_eq!(result.elapsed_seconds, 6.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listeners_see_every_result() {
        let home = Arc::new(FakeHome::new().with_light("light.a", "on"));
        let controller = controller(&home);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let handle = controller
            .listeners()
            .add(move |result: &OperationResult| sink.lock().unwrap().push(result.result_code));

        controller.ensure_state(&ConvergeRequest::new(&["light.a"])).await;
        controller.ensure_state(&ConvergeRequest::default()).await;
        controller.listeners().remove(handle);
        controller.ensure_state(&ConvergeRequest::new(&["light.a"])).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ResultCode::Success, ResultCode::Error]
        );
    }
}
