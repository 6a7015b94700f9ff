//! Response Ledger Module
//!
//! Durable-in-process record of every dispatch attempt, plus the alert
//! request lifecycle types. The ledger exclusively owns all `AlertRequest`
//! records; other components hold transient copies.

pub mod store;
pub mod types;

pub use store::{BeginOutcome, LedgerFilter, ResponseLedger};
pub use types::{ActionKind, AlertRequest, AlertStatus};
