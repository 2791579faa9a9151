//! Roster-to-directory reconciliation
//!
//! The engine compares a desired roster against the observed state of an
//! external directory group and issues the remote calls that close the gap,
//! moving the group first when its mailing address has changed.

mod engine;
mod result;

pub use engine::ReconciliationEngine;
pub use result::{ReconciliationError, ReconciliationResult, ReconciliationStep};
