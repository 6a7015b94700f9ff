//! Dispatch Module
//!
//! Level-to-action policy, the retrying dispatch coordinator, and the
//! manual override path.

pub mod coordinator;
pub mod override_ctrl;

#[cfg(test)]
mod tests;

pub use coordinator::{applicable_actions, DispatchCoordinator};
pub use override_ctrl::{ManualOverrideController, OverrideAudit};
