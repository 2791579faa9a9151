//! Team directory sync service
//!
//! Runs reconciliation on behalf of roster-changing operations. The roster
//! change is already committed when this runs, so a directory failure is
//! logged and reported as data; it never becomes an error for the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::domain::{
    DirectoryClient, DirectoryError, EmailAddress, FailureRecord, NotificationLog,
    ReconciliationEngine, ReconciliationResult, Roster, TeamId,
};
use crate::infrastructure::metrics::{record_reconciliation, record_retry};
use crate::infrastructure::retry::RetryPolicy;

/// Why a roster was not reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Teams with no members are never reconciled
    EmptyRoster,
    /// The roster has members but no mailing address
    MissingAddress,
}

/// Result of syncing one roster
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Synced(ReconciliationResult),
    Skipped(SkipReason),
    Failed(FailureRecord),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Synced(_) => "synced",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }
}

/// Serializes, retries and records directory syncs per team
pub struct TeamSyncService<C, N>
where
    C: DirectoryClient + ?Sized,
    N: NotificationLog + ?Sized,
{
    engine: ReconciliationEngine<C>,
    notifications: Arc<N>,
    policy: RetryPolicy,
    locks: Mutex<HashMap<TeamId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C, N> TeamSyncService<C, N>
where
    C: DirectoryClient + ?Sized,
    N: NotificationLog + ?Sized,
{
    pub fn new(client: Arc<C>, notifications: Arc<N>, policy: RetryPolicy) -> Self {
        Self {
            engine: ReconciliationEngine::new(client),
            notifications,
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine<C> {
        &self.engine
    }

    /// One lock per team; different teams never wait on each other
    fn team_lock(&self, team_id: &TeamId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        Arc::clone(locks.entry(team_id.clone()).or_default())
    }

    /// Forget the team's lock once the map and `lock` are its only holders.
    ///
    /// Must be called after the guard is dropped. Anyone waiting on the lock
    /// holds a clone, which keeps the entry alive.
    fn release_team_lock(&self, team_id: &TeamId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if Arc::strong_count(&lock) == 2 {
            locks.remove(team_id);
        }
    }

    /// Bring the team's directory group in line with `roster`.
    ///
    /// A failed attempt is retried from the roster's current address, which is
    /// safe because reconciliation is idempotent.
    pub async fn sync_roster(&self, roster: &Roster) -> SyncOutcome {
        let outcome = self.run_sync(roster).await;
        record_reconciliation(outcome.label());
        outcome
    }

    async fn run_sync(&self, roster: &Roster) -> SyncOutcome {
        let team_id = roster.team_id();

        if roster.is_empty() {
            info!(team_id = %team_id, "Skipping directory sync for empty roster");
            return SyncOutcome::Skipped(SkipReason::EmptyRoster);
        }

        if let Err(error) = roster.validate() {
            warn!(team_id = %team_id, error = %error, "Skipping directory sync");
            return SyncOutcome::Skipped(SkipReason::MissingAddress);
        }

        // validate() guarantees a target for a non-empty roster
        let Some(target) = roster.target_address() else {
            return SyncOutcome::Skipped(SkipReason::MissingAddress);
        };

        let lock = self.team_lock(team_id);
        let outcome = {
            let _guard = lock.lock().await;
            self.reconcile_with_retry(roster, target).await
        };
        self.release_team_lock(team_id, lock);

        outcome
    }

    async fn reconcile_with_retry(&self, roster: &Roster, target: &EmailAddress) -> SyncOutcome {
        let team_id = roster.team_id();
        let mut attempt = 1;

        loop {
            let error = match self
                .engine
                .reconcile(roster.current_address(), target, roster.members())
                .await
            {
                Ok(result) => return SyncOutcome::Synced(result),
                Err(error) => error,
            };

            let retry_delay = error
                .directory_error()
                .filter(|source| self.policy.should_retry(attempt, source))
                .map(|source| self.policy.delay_for(attempt, source));

            if let Some(delay) = retry_delay {
                warn!(
                    team_id = %team_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Directory sync failed, retrying"
                );
                record_retry();
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            warn!(team_id = %team_id, attempts = attempt, error = %error, "Directory sync gave up");

            let record = FailureRecord::from_error(team_id.clone(), target.clone(), &error)
                .with_attempts(attempt);
            self.notifications.record_failure(record.clone()).await;

            return SyncOutcome::Failed(record);
        }
    }

    /// Delete a disbanded team's group.
    ///
    /// A group that is already gone counts as removed. Other failures are
    /// recorded and reported through the return value only.
    pub async fn remove_team_group(&self, team_id: &TeamId, address: &EmailAddress) -> bool {
        let lock = self.team_lock(team_id);
        let removed = {
            let _guard = lock.lock().await;
            self.delete_with_retry(team_id, address).await
        };
        self.release_team_lock(team_id, lock);

        removed
    }

    async fn delete_with_retry(&self, team_id: &TeamId, address: &EmailAddress) -> bool {
        let mut attempt = 1;

        loop {
            let error = match self.engine.client().delete_group(address).await {
                Ok(()) | Err(DirectoryError::GroupNotFound { .. }) => {
                    info!(team_id = %team_id, address = %address, "Team group removed");
                    return true;
                }
                Err(error) => error,
            };

            if self.policy.should_retry(attempt, &error) {
                let delay = self.policy.delay_for(attempt, &error);
                record_retry();
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            warn!(team_id = %team_id, address = %address, error = %error, "Failed to remove team group");

            let record = FailureRecord::new(team_id.clone(), address.clone(), None, error.to_string())
                .with_attempts(attempt);
            self.notifications.record_failure(record).await;

            return false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    use crate::domain::notification::MockNotificationLog;
    use crate::domain::{DirectoryOperation, ReconciliationStep};
    use crate::infrastructure::directory::{Fault, InMemoryDirectoryClient};
    use crate::infrastructure::notification::InMemoryNotificationLog;

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    fn set(members: &[&str]) -> BTreeSet<EmailAddress> {
        members.iter().map(|m| email(m)).collect()
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts)
            .with_initial_delay(1)
            .with_max_delay(5)
    }

    fn service(
        client: &Arc<InMemoryDirectoryClient>,
        log: &Arc<InMemoryNotificationLog>,
        attempts: u32,
    ) -> TeamSyncService<InMemoryDirectoryClient, InMemoryNotificationLog> {
        TeamSyncService::new(Arc::clone(client), Arc::clone(log), fast_policy(attempts))
    }

    fn roster(team: &str, address: &str, members: &[&str]) -> Roster {
        Roster::new(TeamId::new(team).unwrap())
            .with_current_address(email(address))
            .with_members(set(members))
    }

    #[tokio::test]
    async fn test_skips_empty_roster_without_remote_calls() {
        let client = Arc::new(InMemoryDirectoryClient::new());
        let log = Arc::new(InMemoryNotificationLog::new());

        let outcome = service(&client, &log, 3)
            .sync_roster(&roster("alpha", "alpha@cmu.edu", &[]))
            .await;

        assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::EmptyRoster));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_skips_roster_without_address() {
        let client = Arc::new(InMemoryDirectoryClient::new());
        let log = Arc::new(InMemoryNotificationLog::new());
        let roster = Roster::new(TeamId::new("alpha").unwrap()).with_members(set(&["a@cmu.edu"]));

        let outcome = service(&client, &log, 3).sync_roster(&roster).await;

        assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::MissingAddress));
    }

    #[tokio::test]
    async fn test_rename_through_service() {
        let client = Arc::new(InMemoryDirectoryClient::new().with_group(
            email("old@cmu.edu"),
            set(&["sam@cmu.edu", "raj@cmu.edu"]),
        ));
        let log = Arc::new(InMemoryNotificationLog::new());

        let mut roster = roster("triumphant", "old@cmu.edu", &["sam@cmu.edu", "raj@cmu.edu"]);
        roster.rename_address(email("new@cmu.edu"));
        roster.remove_member(&email("raj@cmu.edu"));

        let outcome = service(&client, &log, 3).sync_roster(&roster).await;

        let SyncOutcome::Synced(result) = outcome else {
            panic!("expected sync to succeed, got {:?}", outcome);
        };
        assert_eq!(result.migrated_from, Some(email("old@cmu.edu")));
        assert!(!client.group_exists(&email("old@cmu.edu")));
        assert_eq!(
            client.members_of(&email("new@cmu.edu")),
            Some(set(&["sam@cmu.edu"]))
        );
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_retries_transient_failure_then_succeeds() {
        let client = Arc::new(
            InMemoryDirectoryClient::new().with_group(email("alpha@cmu.edu"), BTreeSet::new()),
        );
        client.inject_fault(
            Fault::new(DirectoryOperation::AddMember, DirectoryError::Timeout).times(1),
        );
        let log = Arc::new(InMemoryNotificationLog::new());

        let outcome = service(&client, &log, 3)
            .sync_roster(&roster("alpha", "alpha@cmu.edu", &["a@cmu.edu", "b@cmu.edu"]))
            .await;

        assert!(outcome.is_synced());
        assert_eq!(
            client.members_of(&email("alpha@cmu.edu")),
            Some(set(&["a@cmu.edu", "b@cmu.edu"]))
        );
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_retry_after_partial_migration_converges() {
        let client = Arc::new(InMemoryDirectoryClient::new().with_group(
            email("old@cmu.edu"),
            set(&["sam@cmu.edu"]),
        ));
        // Old group is deleted on the first attempt, then the create fails once
        client.inject_fault(
            Fault::new(
                DirectoryOperation::CreateGroup,
                DirectoryError::server(503, "unavailable"),
            )
            .times(1),
        );
        let log = Arc::new(InMemoryNotificationLog::new());

        let mut roster = roster("alpha", "old@cmu.edu", &["sam@cmu.edu", "sally@cmu.edu"]);
        roster.rename_address(email("new@cmu.edu"));

        let outcome = service(&client, &log, 3).sync_roster(&roster).await;

        assert!(outcome.is_synced());
        assert!(!client.group_exists(&email("old@cmu.edu")));
        assert_eq!(
            client.members_of(&email("new@cmu.edu")),
            Some(set(&["sam@cmu.edu", "sally@cmu.edu"]))
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_recorded() {
        let client = Arc::new(
            InMemoryDirectoryClient::new().with_group(email("alpha@cmu.edu"), BTreeSet::new()),
        );
        client.inject_fault(Fault::new(
            DirectoryOperation::ListMembers,
            DirectoryError::transport("connection reset"),
        ));
        let log = Arc::new(InMemoryNotificationLog::new());

        let outcome = service(&client, &log, 3)
            .sync_roster(&roster("alpha", "alpha@cmu.edu", &["a@cmu.edu"]))
            .await;

        let SyncOutcome::Failed(record) = outcome else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert_eq!(record.failed_step, Some(ReconciliationStep::ListMembers));
        assert_eq!(record.attempts, 3);
        assert_eq!(record.team_address, email("alpha@cmu.edu"));
        assert_eq!(client.count_calls(DirectoryOperation::ListMembers), 3);
        assert_eq!(log.records(), vec![record]);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let client = Arc::new(InMemoryDirectoryClient::new());
        client.inject_fault(Fault::new(
            DirectoryOperation::ListGroups,
            DirectoryError::unauthorized("revoked"),
        ));

        let mut log = MockNotificationLog::new();
        log.expect_record_failure()
            .withf(|record| record.failed_step == Some(ReconciliationStep::ListGroups))
            .times(1)
            .return_const(());

        let service = TeamSyncService::new(Arc::clone(&client), Arc::new(log), fast_policy(5));
        let roster = Roster::new(TeamId::new("alpha").unwrap())
            .with_desired_address(email("alpha@cmu.edu"))
            .with_members(set(&["a@cmu.edu"]));

        let outcome = service.sync_roster(&roster).await;

        assert!(matches!(outcome, SyncOutcome::Failed(ref r) if r.attempts == 1));
        assert_eq!(client.count_calls(DirectoryOperation::ListGroups), 1);
    }

    #[tokio::test]
    async fn test_same_team_syncs_do_not_interleave() {
        let client = Arc::new(
            InMemoryDirectoryClient::new().with_group(email("alpha@cmu.edu"), BTreeSet::new()),
        );
        let log = Arc::new(InMemoryNotificationLog::new());
        let service = Arc::new(service(&client, &log, 1));

        let first = roster("alpha", "alpha@cmu.edu", &["a@cmu.edu", "b@cmu.edu"]);
        let second = roster("alpha", "alpha@cmu.edu", &["c@cmu.edu"]);

        let lock = service.team_lock(first.team_id());
        let held = lock.lock().await;

        let pending = {
            let service = Arc::clone(&service);
            let second = second.clone();
            tokio::spawn(async move { service.sync_roster(&second).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.calls().is_empty(), "sync ran while the team lock was held");

        drop(held);
        assert!(pending.await.unwrap().is_synced());
        assert!(service.sync_roster(&first).await.is_synced());

        assert_eq!(
            client.members_of(&email("alpha@cmu.edu")),
            Some(set(&["a@cmu.edu", "b@cmu.edu"]))
        );
    }

    fn tracked_locks<C, N>(service: &TeamSyncService<C, N>) -> usize
    where
        C: DirectoryClient + ?Sized,
        N: NotificationLog + ?Sized,
    {
        service.locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_team_locks_are_released_after_use() {
        let client = Arc::new(
            InMemoryDirectoryClient::new()
                .with_group(email("alpha@cmu.edu"), BTreeSet::new())
                .with_group(email("beta@cmu.edu"), BTreeSet::new()),
        );
        let log = Arc::new(InMemoryNotificationLog::new());
        let service = service(&client, &log, 1);

        for team in ["alpha", "beta"] {
            let address = format!("{}@cmu.edu", team);
            let outcome = service
                .sync_roster(&roster(team, &address, &["a@cmu.edu"]))
                .await;
            assert!(outcome.is_synced());
        }
        assert_eq!(tracked_locks(&service), 0);

        assert!(
            service
                .remove_team_group(&TeamId::new("alpha").unwrap(), &email("alpha@cmu.edu"))
                .await
        );
        assert_eq!(tracked_locks(&service), 0);
    }

    #[tokio::test]
    async fn test_team_lock_kept_while_another_sync_waits() {
        let client = Arc::new(
            InMemoryDirectoryClient::new().with_group(email("alpha@cmu.edu"), BTreeSet::new()),
        );
        let log = Arc::new(InMemoryNotificationLog::new());
        let service = Arc::new(service(&client, &log, 1));
        let team_id = TeamId::new("alpha").unwrap();

        let lock = service.team_lock(&team_id);
        let held = lock.lock().await;

        let pending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .sync_roster(&roster("alpha", "alpha@cmu.edu", &["a@cmu.edu"]))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracked_locks(&service), 1);

        drop(held);
        assert!(pending.await.unwrap().is_synced());

        // The test's handle was still alive when the sync finished
        service.release_team_lock(&team_id, lock);
        assert_eq!(tracked_locks(&service), 0);
    }

    #[tokio::test]
    async fn test_different_teams_do_not_block_each_other() {
        let client = Arc::new(
            InMemoryDirectoryClient::new()
                .with_group(email("alpha@cmu.edu"), BTreeSet::new())
                .with_group(email("beta@cmu.edu"), BTreeSet::new()),
        );
        let log = Arc::new(InMemoryNotificationLog::new());
        let service = service(&client, &log, 1);

        let alpha_lock = service.team_lock(&TeamId::new("alpha").unwrap());
        let _held = alpha_lock.lock().await;

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            service.sync_roster(&roster("beta", "beta@cmu.edu", &["b@cmu.edu"])),
        )
        .await
        .expect("beta sync should not wait on alpha's lock");

        assert!(outcome.is_synced());
    }

    #[tokio::test]
    async fn test_remove_team_group() {
        let client = Arc::new(
            InMemoryDirectoryClient::new().with_group(email("alpha@cmu.edu"), set(&["a@cmu.edu"])),
        );
        let log = Arc::new(InMemoryNotificationLog::new());
        let service = service(&client, &log, 1);
        let team_id = TeamId::new("alpha").unwrap();

        assert!(service.remove_team_group(&team_id, &email("alpha@cmu.edu")).await);
        assert!(!client.group_exists(&email("alpha@cmu.edu")));

        // Already gone still counts as removed
        assert!(service.remove_team_group(&team_id, &email("alpha@cmu.edu")).await);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_remove_team_group_failure_is_logged_not_raised() {
        let client = Arc::new(
            InMemoryDirectoryClient::new().with_group(email("alpha@cmu.edu"), BTreeSet::new()),
        );
        client.inject_fault(Fault::new(
            DirectoryOperation::DeleteGroup,
            DirectoryError::unauthorized("revoked"),
        ));
        let log = Arc::new(InMemoryNotificationLog::new());
        let service = service(&client, &log, 3);
        let team_id = TeamId::new("alpha").unwrap();

        assert!(!service.remove_team_group(&team_id, &email("alpha@cmu.edu")).await);

        let records = log.records_for(&team_id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].failed_step, None);
        assert!(client.group_exists(&email("alpha@cmu.edu")));
    }
}
