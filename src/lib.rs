//! roster-sync
//!
//! Keeps external mailing-list groups in line with team rosters:
//! - Minimal diffing of desired vs observed membership
//! - Group migration when a team's mailing address changes
//! - Per-team serialized, retried syncs that never fail the triggering change

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::{DirectoryClient, DomainError};
use infrastructure::{
    directory::HttpDirectoryClient, notification::TracingNotificationLog, retry::RetryPolicy,
    team::TeamSyncService,
};

/// Directory client for the configured service
pub fn create_directory_client(
    config: &AppConfig,
) -> Result<Arc<dyn DirectoryClient>, DomainError> {
    let client = HttpDirectoryClient::new(&config.directory)?;
    Ok(Arc::new(client))
}

/// Sync service wired to the configured directory, logging failures via tracing
pub fn create_sync_service(
    config: &AppConfig,
    policy: RetryPolicy,
) -> Result<TeamSyncService<dyn DirectoryClient, TracingNotificationLog>, DomainError> {
    let client = create_directory_client(config)?;
    let notifications = Arc::new(TracingNotificationLog::new());

    Ok(TeamSyncService::new(client, notifications, policy))
}
