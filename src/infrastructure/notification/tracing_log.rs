use async_trait::async_trait;
use tracing::error;

use crate::domain::{FailureRecord, NotificationLog};

/// Writes sync failures to the application log
#[derive(Debug, Clone, Default)]
pub struct TracingNotificationLog;

impl TracingNotificationLog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationLog for TracingNotificationLog {
    async fn record_failure(&self, record: FailureRecord) {
        error!(
            record_id = %record.id,
            team_id = %record.team_id,
            team_address = %record.team_address,
            failed_step = record.failed_step.map(|s| s.as_str()).unwrap_or("none"),
            attempts = record.attempts,
            cause = %record.cause,
            "Directory sync failed"
        );
    }
}
