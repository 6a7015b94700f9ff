//! Engine Logic
//!
//! Detection classification, response dispatch, and the supporting state
//! stores. `main.rs` wires these together; nothing here owns a global.

pub mod config;
pub mod dispatch;
pub mod ledger;
pub mod threat;
pub mod toggles;
pub mod transport;
