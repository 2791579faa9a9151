use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::domain::reconciliation::{ReconciliationError, ReconciliationStep};
use crate::domain::team::{EmailAddress, TeamId};

/// A directory sync that gave up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: Uuid,
    pub team_id: TeamId,
    pub team_address: EmailAddress,
    /// Absent when the failure was not tied to a reconciliation step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<ReconciliationStep>,
    pub cause: String,
    pub attempts: u32,
    pub occurred_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(
        team_id: TeamId,
        team_address: EmailAddress,
        failed_step: Option<ReconciliationStep>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            team_address,
            failed_step,
            cause: cause.into(),
            attempts: 1,
            occurred_at: Utc::now(),
        }
    }

    /// Build from a reconciliation error, keeping its step and cause
    pub fn from_error(
        team_id: TeamId,
        team_address: EmailAddress,
        error: &ReconciliationError,
    ) -> Self {
        let cause = match error.directory_error() {
            Some(source) => source.to_string(),
            None => error.to_string(),
        };

        Self::new(team_id, team_address, error.step(), cause)
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Sink for sync failures; recording never fails the caller
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn record_failure(&self, record: FailureRecord);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::DirectoryError;

    #[test]
    fn test_from_directory_error() {
        let error = ReconciliationError::directory(
            ReconciliationStep::SyncRemove,
            DirectoryError::server(503, "unavailable"),
        );

        let record = FailureRecord::from_error(
            TeamId::new("team-triumphant").unwrap(),
            EmailAddress::parse("team@cmu.edu").unwrap(),
            &error,
        )
        .with_attempts(3);

        assert_eq!(record.failed_step, Some(ReconciliationStep::SyncRemove));
        assert_eq!(record.cause, "Directory returned HTTP 503: unavailable");
        assert_eq!(record.attempts, 3);
    }

    #[test]
    fn test_serializes_step_in_kebab_case() {
        let record = FailureRecord::new(
            TeamId::new("team-triumphant").unwrap(),
            EmailAddress::parse("team@cmu.edu").unwrap(),
            Some(ReconciliationStep::MigrateDelete),
            "Group 'team@cmu.edu' not found",
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["failed_step"], "migrate-delete");
        assert_eq!(json["team_address"], "team@cmu.edu");
    }
}
