//! System Toggles
//!
//! Operator-controlled kill-switches for the response capabilities.
//! Mutated only by explicit operator commands; the dispatch coordinator
//! takes a fresh snapshot on every decision instead of caching.
//!
//! No persistence across restarts: the process always comes up in the safe
//! default state (detection on, email alerts on, jammer disarmed).

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of the toggle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleState {
    /// Master switch: when false, dispatch is suppressed entirely.
    pub ai_detection_enabled: bool,
    /// Gate for NOTIFY actions.
    pub email_alerts_enabled: bool,
    /// Gate for JAM actions.
    pub jammer_armed: bool,
}

impl Default for ToggleState {
    fn default() -> Self {
        Self {
            ai_detection_enabled: true,
            email_alerts_enabled: true,
            jammer_armed: false,
        }
    }
}

/// Shared toggle store. One lock per logical operation; never held across
/// network work.
#[derive(Debug, Default)]
pub struct SystemToggles {
    state: RwLock<ToggleState>,
}

impl SystemToggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ToggleState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Snapshot read. Subsequent writes by other threads are not reflected
    /// in a snapshot already taken.
    pub fn snapshot(&self) -> ToggleState {
        *self.state.read()
    }

    pub fn set_ai_detection(&self, enabled: bool) {
        self.state.write().ai_detection_enabled = enabled;
        log::info!(
            "Operator toggled AI detection: {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn set_email_alerts(&self, enabled: bool) {
        self.state.write().email_alerts_enabled = enabled;
        log::info!(
            "Operator toggled email alerts: {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn set_jammer_armed(&self, armed: bool) {
        self.state.write().jammer_armed = armed;
        log::info!(
            "Operator toggled jammer: {}",
            if armed { "armed" } else { "standby" }
        );
    }
}
