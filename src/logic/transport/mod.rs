//! Transport Module
//!
//! The network seam between the engine and the response backend: typed
//! wire payloads plus the one-attempt transport client.

pub mod client;
pub mod payload;

pub use client::{AlertTransport, HttpAlertTransport, SendOutcome};
pub use payload::{DetectionPayload, TriggerPayload};
