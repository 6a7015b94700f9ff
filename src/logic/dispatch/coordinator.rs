//! Dispatch Coordinator
//!
//! Turns a classified detection into response actions and drives each one
//! through the transport with retry, backoff, and cooperative
//! cancellation. Duplicate submissions for the same `(detection, action)`
//! key are suppressed by the ledger's atomic begin.
//!
//! Pipeline: Detection -> classify() -> dispatch() -> {transport sends}
//! -> ledger updates.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::logic::config::RetryConfig;
use crate::logic::ledger::{
    ActionKind, AlertRequest, AlertStatus, BeginOutcome, ResponseLedger,
};
use crate::logic::threat::{Detection, ThreatAssessment, ThreatLevel};
use crate::logic::toggles::{SystemToggles, ToggleState};
use crate::logic::transport::{AlertTransport, SendOutcome, TriggerPayload};

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct DispatchCoordinator<T: AlertTransport> {
    ctx: SendContext<T>,
}

/// Everything a spawned send task needs. Cloning is cheap (Arcs + Copy).
struct SendContext<T: AlertTransport> {
    transport: Arc<T>,
    ledger: Arc<ResponseLedger>,
    toggles: Arc<SystemToggles>,
    retry: RetryConfig,
    jammer_window: Duration,
}

impl<T: AlertTransport> Clone for SendContext<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            ledger: Arc::clone(&self.ledger),
            toggles: Arc::clone(&self.toggles),
            retry: self.retry,
            jammer_window: self.jammer_window,
        }
    }
}

impl<T: AlertTransport> DispatchCoordinator<T> {
    pub fn new(
        transport: Arc<T>,
        ledger: Arc<ResponseLedger>,
        toggles: Arc<SystemToggles>,
        retry: RetryConfig,
        jammer_window: Duration,
    ) -> Self {
        Self {
            ctx: SendContext {
                transport,
                ledger,
                toggles,
                retry,
                jammer_window,
            },
        }
    }

    pub fn ledger(&self) -> &Arc<ResponseLedger> {
        &self.ctx.ledger
    }

    pub(crate) fn toggles(&self) -> &Arc<SystemToggles> {
        &self.ctx.toggles
    }

    /// Decide and submit response actions for one classified detection.
    ///
    /// Returns the requests now covering this detection: freshly created
    /// ones plus any existing in-flight records whose duplicates were
    /// suppressed. Network work continues in background tasks; state is
    /// always observable through the ledger.
    pub fn dispatch(
        &self,
        detection: &Detection,
        assessment: &ThreatAssessment,
    ) -> Vec<AlertRequest> {
        let toggles = self.ctx.toggles.snapshot();

        if !toggles.ai_detection_enabled {
            log::info!(
                "AI detection disabled, suppressing dispatch for {}",
                detection.id
            );
            return Vec::new();
        }

        let mut requests = Vec::new();
        for action in applicable_actions(assessment.level) {
            if !capability_enabled(action, &toggles) {
                log::info!(
                    "CapabilityDisabled: skipping {} for {} (level {})",
                    action,
                    detection.id,
                    assessment.level
                );
                continue;
            }
            requests.push(self.submit(detection, assessment.level, action));
        }
        requests
    }

    /// Submit one action for one detection through the duplicate-suppressed
    /// ledger path, spawning the send task on creation.
    pub(crate) fn submit(
        &self,
        detection: &Detection,
        level: ThreatLevel,
        action: ActionKind,
    ) -> AlertRequest {
        let payload = TriggerPayload::new(detection, level);
        match self.ctx.ledger.begin(&detection.id, action, payload) {
            BeginOutcome::Existing(req) => req,
            BeginOutcome::Created(req) => {
                log::info!(
                    "Dispatching {} for detection {} (level {}, request {})",
                    action,
                    detection.id,
                    level,
                    req.id
                );
                spawn_request(self.ctx.clone(), req.clone());
                req
            }
        }
    }
}

/// Level-based policy table, before capability gating. Rules are not
/// exclusive: every matching row fires.
pub fn applicable_actions(level: ThreatLevel) -> Vec<ActionKind> {
    let mut actions = Vec::new();
    if level >= ThreatLevel::Medium {
        actions.push(ActionKind::Notify);
    }
    if level >= ThreatLevel::High {
        actions.push(ActionKind::Jam);
    }
    if level == ThreatLevel::Critical {
        actions.push(ActionKind::Escalate);
    }
    actions
}

pub(crate) fn capability_enabled(action: ActionKind, toggles: &ToggleState) -> bool {
    match action {
        ActionKind::Notify => toggles.email_alerts_enabled,
        ActionKind::Jam => toggles.jammer_armed,
        // Critical escalation cannot be disabled; deactivation is cleanup
        // of an already-fired jam and must always go out.
        ActionKind::Escalate | ActionKind::JamDeactivate => true,
    }
}

/// Toggle check run immediately before a scheduled retry re-attempts.
/// Toggling off is a cooperative-cancellation signal.
fn retry_allowed(action: ActionKind, toggles: &ToggleState) -> bool {
    match action {
        ActionKind::JamDeactivate => true,
        _ => toggles.ai_detection_enabled && capability_enabled(action, toggles),
    }
}

// ============================================================================
// SEND TASKS
// ============================================================================

fn spawn_request<T: AlertTransport>(ctx: SendContext<T>, req: AlertRequest) {
    tokio::spawn(async move {
        let action = req.action;
        let detection_id = req.detection_id.clone();
        let payload = req.payload.clone();
        let final_status = drive_request(&ctx, req).await;

        if final_status == AlertStatus::Sent && action == ActionKind::Jam {
            schedule_jam_deactivation(ctx, detection_id, payload);
        }
    });
}

/// Retry loop for one request. The transport call is the only suspension
/// point besides the backoff sleeps; every state transition is written to
/// the ledger before and after it.
async fn drive_request<T: AlertTransport>(
    ctx: &SendContext<T>,
    mut req: AlertRequest,
) -> AlertStatus {
    loop {
        req.status = AlertStatus::Sending;
        req.touch();
        ctx.ledger.upsert(&req);

        let outcome = ctx.transport.send(&req).await;
        req.attempt_count += 1;

        match outcome {
            SendOutcome::Success => {
                req.status = AlertStatus::Sent;
                req.last_error = None;
                req.touch();
                ctx.ledger.upsert(&req);
                log::info!(
                    "{} sent for detection {} (attempt {})",
                    req.action,
                    req.detection_id,
                    req.attempt_count
                );
                return AlertStatus::Sent;
            }
            SendOutcome::PermanentFailure(reason) => {
                return fail_permanent(ctx, &mut req, reason);
            }
            SendOutcome::RetryableFailure(reason) => {
                if req.attempt_count >= ctx.retry.max_attempts {
                    let reason = format!(
                        "retries exhausted after {} attempts, last error: {}",
                        req.attempt_count, reason
                    );
                    return fail_permanent(ctx, &mut req, reason);
                }

                req.status = AlertStatus::FailedRetryable;
                req.last_error = Some(reason.clone());
                req.touch();
                ctx.ledger.upsert(&req);

                let delay = backoff_delay(&ctx.retry, req.attempt_count);
                log::warn!(
                    "{} attempt {}/{} failed for detection {}: {}. Retrying in {:?}",
                    req.action,
                    req.attempt_count,
                    ctx.retry.max_attempts,
                    req.detection_id,
                    reason,
                    delay
                );
                sleep(delay).await;

                let toggles = ctx.toggles.snapshot();
                if !retry_allowed(req.action, &toggles) {
                    let reason = format!(
                        "CapabilityDisabled: {} disabled before retry",
                        req.action
                    );
                    return fail_permanent(ctx, &mut req, reason);
                }
            }
        }
    }
}

fn fail_permanent<T: AlertTransport>(
    ctx: &SendContext<T>,
    req: &mut AlertRequest,
    reason: String,
) -> AlertStatus {
    log::error!(
        "{} failed permanently for detection {}: {}",
        req.action,
        req.detection_id,
        reason
    );
    req.status = AlertStatus::FailedPermanent;
    req.last_error = Some(reason);
    req.touch();
    ctx.ledger.upsert(req);
    AlertStatus::FailedPermanent
}

/// After a successful jam, queue the deactivation follow-up immediately
/// and drive it once the effect window expires. Queuing up front keeps the
/// owed deactivation visible in the ledger (and in `pending_count`) for
/// the whole window; a process draining on pending work will not exit with
/// the jammer still on.
fn schedule_jam_deactivation<T: AlertTransport>(
    ctx: SendContext<T>,
    detection_id: String,
    payload: TriggerPayload,
) {
    let req = match ctx
        .ledger
        .begin(&detection_id, ActionKind::JamDeactivate, payload)
    {
        BeginOutcome::Created(req) => req,
        BeginOutcome::Existing(_) => return,
    };
    log::info!(
        "Jam active for detection {}, deactivation queued in {:?} (request {})",
        detection_id,
        ctx.jammer_window,
        req.id
    );

    tokio::spawn(async move {
        sleep(ctx.jammer_window).await;
        drive_request(&ctx, req).await;
    });
}

/// Exponential backoff with jitter: `base * 2^attempt`, multiplied by a
/// random factor in [0.8, 1.2], clamped to [base, cap]. The clamp keeps
/// the documented floor: no inter-attempt delay is ever shorter than the
/// base.
fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let base_ms = retry.backoff_base.as_millis() as f64;
    let cap_ms = retry.backoff_cap.as_millis() as f64;
    let exp = base_ms * 2f64.powi(attempt.min(16) as i32);
    let jittered = exp * rand::thread_rng().gen_range(0.8..=1.2);
    Duration::from_millis(jittered.clamp(base_ms, cap_ms) as u64)
}
