//! End-to-end dispatch scenarios against a scripted stub transport.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep, Instant};

use crate::logic::config::RetryConfig;
use crate::logic::dispatch::{DispatchCoordinator, ManualOverrideController};
use crate::logic::ledger::{ActionKind, AlertStatus, LedgerFilter, ResponseLedger};
use crate::logic::threat::{classify, BoundingBox, Detection, ThresholdConfig};
use crate::logic::toggles::{SystemToggles, ToggleState};
use crate::logic::transport::{AlertTransport, SendOutcome};

// ============================================================================
// STUB TRANSPORT
// ============================================================================

struct CallRecord {
    action: ActionKind,
    detection_id: String,
    at: Instant,
}

/// Scripted transport: pops the next outcome per call, defaulting to
/// `Success` when the script runs dry. Records every call with its
/// (tokio) timestamp.
struct StubTransport {
    script: Mutex<VecDeque<SendOutcome>>,
    calls: Mutex<Vec<CallRecord>>,
}

impl StubTransport {
    fn new(script: Vec<SendOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn always_ok() -> Self {
        Self::new(Vec::new())
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn calls_for(&self, action: ActionKind) -> usize {
        self.calls.lock().iter().filter(|c| c.action == action).count()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|c| c.at).collect()
    }
}

impl AlertTransport for StubTransport {
    async fn send(&self, request: &crate::logic::ledger::AlertRequest) -> SendOutcome {
        self.calls.lock().push(CallRecord {
            action: request.action,
            detection_id: request.detection_id.clone(),
            at: Instant::now(),
        });
        self.script
            .lock()
            .pop_front()
            .unwrap_or(SendOutcome::Success)
    }
}

// ============================================================================
// HARNESS
// ============================================================================

struct TestEnv {
    coordinator: Arc<DispatchCoordinator<StubTransport>>,
    transport: Arc<StubTransport>,
    ledger: Arc<ResponseLedger>,
    toggles: Arc<SystemToggles>,
}

fn env_with(transport: StubTransport, state: ToggleState) -> TestEnv {
    env_full(transport, state, RetryConfig::default(), Duration::from_secs(30))
}

fn env_full(
    transport: StubTransport,
    state: ToggleState,
    retry: RetryConfig,
    jammer_window: Duration,
) -> TestEnv {
    let transport = Arc::new(transport);
    let ledger = Arc::new(ResponseLedger::new());
    let toggles = Arc::new(SystemToggles::with_state(state));
    let coordinator = Arc::new(DispatchCoordinator::new(
        Arc::clone(&transport),
        Arc::clone(&ledger),
        Arc::clone(&toggles),
        retry,
        jammer_window,
    ));
    TestEnv {
        coordinator,
        transport,
        ledger,
        toggles,
    }
}

fn all_enabled() -> ToggleState {
    ToggleState {
        ai_detection_enabled: true,
        email_alerts_enabled: true,
        jammer_armed: true,
    }
}

fn detection(id: &str, confidence: f32) -> Detection {
    Detection {
        id: id.to_string(),
        class_name: "drone".to_string(),
        confidence,
        bbox: BoundingBox::new(120.0, 80.0, 360.0, 290.0),
        camera_id: "cam-north".to_string(),
        observed_at: chrono::Utc::now(),
    }
}

fn thresholds() -> ThresholdConfig {
    ThresholdConfig::new(0.6, 0.75, 0.9)
}

/// Dispatch one detection through classify + coordinator.
fn run_dispatch(env: &TestEnv, det: &Detection) -> Vec<crate::logic::ledger::AlertRequest> {
    let assessment = classify(det, &thresholds()).unwrap();
    env.coordinator.dispatch(det, &assessment)
}

/// Wait until no request is left in a non-terminal state.
async fn wait_settled(ledger: &ResponseLedger) {
    for _ in 0..400 {
        if ledger.pending_count() == 0 {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("dispatch did not settle");
}

fn statuses(ledger: &ResponseLedger, detection_id: &str) -> Vec<(ActionKind, AlertStatus)> {
    ledger
        .list_by_detection(detection_id)
        .into_iter()
        .map(|r| (r.action, r.status))
        .collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Scenario A: critical detection with everything enabled fires all three
/// actions and they all reach Sent.
#[tokio::test(start_paused = true)]
async fn test_critical_dispatch_fires_all_actions() {
    let env = env_full(
        StubTransport::always_ok(),
        all_enabled(),
        RetryConfig::default(),
        Duration::from_secs(2),
    );
    let det = detection("det-a", 0.94);

    let requests = run_dispatch(&env, &det);
    assert_eq!(requests.len(), 3);

    wait_settled(&env.ledger).await;

    for action in [ActionKind::Notify, ActionKind::Jam, ActionKind::Escalate] {
        let req = env.ledger.get("det-a", action).unwrap();
        assert_eq!(req.status, AlertStatus::Sent, "{} not sent", action);
        assert_eq!(env.transport.calls_for(action), 1);
    }
}

/// Scenario B: medium detection only notifies; with email alerts off it
/// produces nothing at all.
#[tokio::test(start_paused = true)]
async fn test_medium_dispatch_notify_only() {
    let env = env_with(StubTransport::always_ok(), all_enabled());
    let det = detection("det-b", 0.70);

    let requests = run_dispatch(&env, &det);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, ActionKind::Notify);

    wait_settled(&env.ledger).await;
    assert_eq!(env.transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_medium_dispatch_suppressed_without_email() {
    let mut state = all_enabled();
    state.email_alerts_enabled = false;
    let env = env_with(StubTransport::always_ok(), state);

    let requests = run_dispatch(&env, &detection("det-b2", 0.70));
    assert!(requests.is_empty());
    assert!(env.ledger.is_empty());
    assert_eq!(env.transport.call_count(), 0);
}

/// Disabled-capability law: a critical detection with email alerts off and
/// jammer disarmed still escalates, and only escalates.
#[tokio::test(start_paused = true)]
async fn test_critical_with_capabilities_disabled_still_escalates() {
    let state = ToggleState {
        ai_detection_enabled: true,
        email_alerts_enabled: false,
        jammer_armed: false,
    };
    let env = env_with(StubTransport::always_ok(), state);

    let requests = run_dispatch(&env, &detection("det-c", 0.95));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, ActionKind::Escalate);

    wait_settled(&env.ledger).await;
    assert_eq!(env.transport.calls_for(ActionKind::Escalate), 1);
    assert_eq!(env.transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_master_toggle_suppresses_everything() {
    let mut state = all_enabled();
    state.ai_detection_enabled = false;
    let env = env_with(StubTransport::always_ok(), state);

    let requests = run_dispatch(&env, &detection("det-d", 0.99));
    assert!(requests.is_empty());
    assert!(env.ledger.is_empty());
}

/// Duplicate suppression: a second dispatch while the first request is
/// still in flight yields the same request id and exactly one transport
/// call.
#[tokio::test(start_paused = true)]
async fn test_duplicate_dispatch_suppressed() {
    let env = env_with(StubTransport::always_ok(), all_enabled());
    let det = detection("det-e", 0.70);

    // Both dispatches run before the spawned send task gets a chance to
    // complete, so the second sees the first still pending.
    let first = run_dispatch(&env, &det);
    let second = run_dispatch(&env, &det);

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].id, second[0].id);

    wait_settled(&env.ledger).await;
    assert_eq!(env.transport.call_count(), 1);
    assert_eq!(env.ledger.len(), 1);
}

/// Retry law: two retryable failures then success means exactly three
/// transport calls, a final Sent, and every inter-attempt delay at or
/// above the backoff floor.
#[tokio::test(start_paused = true)]
async fn test_retryable_failures_then_success() {
    let retry = RetryConfig {
        max_attempts: 3,
        backoff_base: Duration::from_millis(500),
        backoff_cap: Duration::from_secs(8),
    };
    let env = env_full(
        StubTransport::new(vec![
            SendOutcome::RetryableFailure("HTTP 503".to_string()),
            SendOutcome::RetryableFailure("HTTP 503".to_string()),
            SendOutcome::Success,
        ]),
        all_enabled(),
        retry,
        Duration::from_secs(30),
    );

    run_dispatch(&env, &detection("det-f", 0.70));
    wait_settled(&env.ledger).await;

    assert_eq!(env.transport.call_count(), 3);
    let req = env.ledger.get("det-f", ActionKind::Notify).unwrap();
    assert_eq!(req.status, AlertStatus::Sent);
    assert_eq!(req.attempt_count, 3);

    let times = env.transport.call_times();
    for pair in times.windows(2) {
        assert!(
            pair[1] - pair[0] >= retry.backoff_base,
            "inter-attempt delay below backoff floor"
        );
    }
}

/// Scenario C: a permanent failure (HTTP 400) is terminal after one call.
#[tokio::test(start_paused = true)]
async fn test_permanent_failure_is_not_retried() {
    let env = env_with(
        StubTransport::new(vec![SendOutcome::PermanentFailure(
            "HTTP 400: bad payload".to_string(),
        )]),
        all_enabled(),
    );

    run_dispatch(&env, &detection("det-g", 0.70));
    wait_settled(&env.ledger).await;

    assert_eq!(env.transport.call_count(), 1);
    let req = env.ledger.get("det-g", ActionKind::Notify).unwrap();
    assert_eq!(req.status, AlertStatus::FailedPermanent);
    assert_eq!(req.attempt_count, 1);
    assert!(req.last_error.as_deref().unwrap().contains("400"));
}

/// Retries exhausted: every attempt transient-fails, the request ends
/// FailedPermanent after the configured cap.
#[tokio::test(start_paused = true)]
async fn test_retries_exhausted_fails_permanently() {
    let env = env_with(
        StubTransport::new(vec![
            SendOutcome::RetryableFailure("connection refused".to_string()),
            SendOutcome::RetryableFailure("connection refused".to_string()),
            SendOutcome::RetryableFailure("connection refused".to_string()),
        ]),
        all_enabled(),
    );

    run_dispatch(&env, &detection("det-h", 0.70));
    wait_settled(&env.ledger).await;

    assert_eq!(env.transport.call_count(), 3);
    let req = env.ledger.get("det-h", ActionKind::Notify).unwrap();
    assert_eq!(req.status, AlertStatus::FailedPermanent);
    assert!(req.last_error.as_deref().unwrap().contains("exhausted"));
}

/// Cooperative cancellation: disabling the capability while a retry is
/// pending aborts the retry before it re-attempts.
#[tokio::test(start_paused = true)]
async fn test_toggle_off_cancels_pending_retry() {
    let env = env_with(
        StubTransport::new(vec![SendOutcome::RetryableFailure(
            "HTTP 503".to_string(),
        )]),
        all_enabled(),
    );

    run_dispatch(&env, &detection("det-i", 0.70));

    // Let the first attempt fail, then pull the capability while the
    // retry timer is running.
    sleep(Duration::from_millis(100)).await;
    env.toggles.set_email_alerts(false);

    wait_settled(&env.ledger).await;

    assert_eq!(env.transport.call_count(), 1, "retry must not re-attempt");
    let req = env.ledger.get("det-i", ActionKind::Notify).unwrap();
    assert_eq!(req.status, AlertStatus::FailedPermanent);
    assert!(req
        .last_error
        .as_deref()
        .unwrap()
        .contains("CapabilityDisabled"));
}

/// A successful jam queues its deactivation follow-up right away: the
/// pending request is visible in the ledger for the whole effect window
/// and holds `pending_count` open, then fires once the window expires.
#[tokio::test(start_paused = true)]
async fn test_jam_deactivation_pending_through_window() {
    let env = env_full(
        StubTransport::always_ok(),
        all_enabled(),
        RetryConfig::default(),
        Duration::from_secs(5),
    );

    run_dispatch(&env, &detection("det-j", 0.92));

    // Let the Notify/Jam sends complete; the window has barely started.
    sleep(Duration::from_secs(2)).await;

    let jam = env.ledger.get("det-j", ActionKind::Jam).unwrap();
    assert_eq!(jam.status, AlertStatus::Sent);

    // The owed deactivation is already on the ledger, not yet on the wire.
    let queued = env.ledger.get("det-j", ActionKind::JamDeactivate).unwrap();
    assert_eq!(queued.status, AlertStatus::Pending);
    assert!(env.ledger.pending_count() >= 1, "drain must stay open");
    assert_eq!(env.transport.calls_for(ActionKind::JamDeactivate), 0);

    // Cross the jammer effect window.
    sleep(Duration::from_secs(4)).await;
    wait_settled(&env.ledger).await;

    assert_eq!(env.transport.calls_for(ActionKind::JamDeactivate), 1);
    let req = env.ledger.get("det-j", ActionKind::JamDeactivate).unwrap();
    assert_eq!(req.status, AlertStatus::Sent);
    assert_eq!(req.id, queued.id, "same request, not a late re-creation");
}

/// Independent detections settle independently: one failing permanently
/// does not disturb the other.
#[tokio::test(start_paused = true)]
async fn test_failure_isolation_between_detections() {
    let env = env_with(
        StubTransport::new(vec![
            SendOutcome::PermanentFailure("HTTP 401".to_string()),
            SendOutcome::Success,
        ]),
        all_enabled(),
    );

    run_dispatch(&env, &detection("det-k1", 0.70));
    wait_settled(&env.ledger).await;
    run_dispatch(&env, &detection("det-k2", 0.70));
    wait_settled(&env.ledger).await;

    let failed = env.ledger.get("det-k1", ActionKind::Notify).unwrap();
    let sent = env.ledger.get("det-k2", ActionKind::Notify).unwrap();
    assert_eq!(failed.status, AlertStatus::FailedPermanent);
    assert_eq!(sent.status, AlertStatus::Sent);
}

// ============================================================================
// MANUAL OVERRIDE
// ============================================================================

/// Override with jammer disarmed fires Notify and Escalate, skips Jam,
/// and records one audit entry distinct from the alert requests.
#[tokio::test(start_paused = true)]
async fn test_override_honors_capability_gates() {
    let state = ToggleState {
        ai_detection_enabled: true,
        email_alerts_enabled: true,
        jammer_armed: false,
    };
    let env = env_with(StubTransport::always_ok(), state);
    let controller = ManualOverrideController::new(Arc::clone(&env.coordinator));

    let requests = controller.trigger(None);
    assert_eq!(requests.len(), 2);
    let actions: Vec<ActionKind> = requests.iter().map(|r| r.action).collect();
    assert!(actions.contains(&ActionKind::Notify));
    assert!(actions.contains(&ActionKind::Escalate));
    assert!(!actions.contains(&ActionKind::Jam));

    wait_settled(&env.ledger).await;

    let audit = controller.audit_log();
    assert_eq!(audit.len(), 1);
    assert!(audit[0].synthetic_detection);
    assert_eq!(audit[0].skipped, vec![ActionKind::Jam]);
    assert_eq!(audit[0].fired.len(), 2);

    // Audit entry is separate from the two request records.
    assert_eq!(env.ledger.len(), 2);
}

/// Override on a real low-level detection forces actions level gating
/// would have withheld.
#[tokio::test(start_paused = true)]
async fn test_override_bypasses_level_gating() {
    let env = env_full(
        StubTransport::always_ok(),
        all_enabled(),
        RetryConfig::default(),
        Duration::from_secs(1),
    );
    let controller = ManualOverrideController::new(Arc::clone(&env.coordinator));
    let det = detection("det-low", 0.20);

    // Automatic dispatch does nothing at this level.
    assert!(run_dispatch(&env, &det).is_empty());

    let requests = controller.trigger(Some(&det));
    assert_eq!(requests.len(), 3);

    wait_settled(&env.ledger).await;
    for (_, status) in statuses(&env.ledger, "det-low") {
        assert_eq!(status, AlertStatus::Sent);
    }
    let audit = controller.audit_log();
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].synthetic_detection);
}

// ============================================================================
// LEDGER OBSERVABILITY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_terminal_states_queryable_with_reason() {
    let env = env_with(
        StubTransport::new(vec![SendOutcome::PermanentFailure(
            "HTTP 403: forbidden".to_string(),
        )]),
        all_enabled(),
    );

    run_dispatch(&env, &detection("det-m", 0.70));
    wait_settled(&env.ledger).await;

    let failed = env.ledger.list_all(&LedgerFilter {
        status: Some(AlertStatus::FailedPermanent),
        ..Default::default()
    });
    assert_eq!(failed.len(), 1);
    assert!(failed[0].last_error.as_deref().unwrap().contains("forbidden"));
}
