//! AeroGuard Core
//!
//! Threat classification and alert dispatch engine for airspace defense.
//! Consumes detector output, grades it against confidence thresholds, and
//! drives the gated response actions (notify, jam, escalate) through the
//! response backend with retries and a full audit ledger.

pub mod errors;
pub mod logic;

pub use errors::{EngineError, EngineResult};
pub use logic::config::EngineConfig;
pub use logic::dispatch::{DispatchCoordinator, ManualOverrideController};
pub use logic::ledger::ResponseLedger;
pub use logic::threat::{classify, Detection, ThreatLevel};
pub use logic::toggles::SystemToggles;
pub use logic::transport::HttpAlertTransport;
