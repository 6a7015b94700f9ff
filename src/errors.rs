//! Engine error taxonomy
//!
//! Only faults that are surfaced synchronously to callers live here.
//! Transport failures are classified as `SendOutcome` variants and stay
//! inside the dispatch retry loop; capability skips and duplicate
//! suppression are informational outcomes, not errors.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Malformed detection input. Rejected before classification, never
    /// reaches dispatch or the ledger.
    #[error("invalid detection: {0}")]
    InvalidDetection(String),

    /// Startup configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Out-of-band transport call failed (status probe, not dispatch).
    #[error("transport error: {0}")]
    Transport(String),
}
