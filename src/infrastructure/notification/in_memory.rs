use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{FailureRecord, NotificationLog, TeamId};

/// Keeps failure records in memory for operator queries
#[derive(Debug, Default)]
pub struct InMemoryNotificationLog {
    records: RwLock<Vec<FailureRecord>>,
}

impl InMemoryNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn records_for(&self, team_id: &TeamId) -> Vec<FailureRecord> {
        self.records
            .read()
            .map(|r| r.iter().filter(|rec| &rec.team_id == team_id).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn record_failure(&self, record: FailureRecord) {
        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EmailAddress;

    #[tokio::test]
    async fn test_records_by_team() {
        let log = InMemoryNotificationLog::new();
        let alpha = TeamId::new("alpha").unwrap();
        let beta = TeamId::new("beta").unwrap();

        log.record_failure(FailureRecord::new(
            alpha.clone(),
            EmailAddress::parse("alpha@cmu.edu").unwrap(),
            None,
            "boom",
        ))
        .await;
        log.record_failure(FailureRecord::new(
            beta,
            EmailAddress::parse("beta@cmu.edu").unwrap(),
            None,
            "boom",
        ))
        .await;

        assert_eq!(log.len(), 2);
        assert_eq!(log.records_for(&alpha).len(), 1);
    }
}
