//! Team directory sync

mod sync_service;

pub use sync_service::{SkipReason, SyncOutcome, TeamSyncService};
