//! Reconciliation engine

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::result::{ReconciliationError, ReconciliationResult, ReconciliationStep};
use crate::domain::directory::{DirectoryClient, DirectoryError};
use crate::domain::team::{diff, EmailAddress};

/// Brings a remote directory group in line with a desired roster.
///
/// Remote calls are issued strictly one after another and the first fault
/// aborts the run. The engine holds no locks: callers serialize runs for the
/// same team.
#[derive(Debug)]
pub struct ReconciliationEngine<C: DirectoryClient + ?Sized> {
    client: Arc<C>,
}

impl<C: DirectoryClient + ?Sized> Clone for ReconciliationEngine<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: DirectoryClient + ?Sized> ReconciliationEngine<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Converge the group at `new_address` to exactly `desired_members`.
    ///
    /// When `old_address` is present and differs, the old group is deleted and
    /// its members are carried over to the group at `new_address` first.
    pub async fn reconcile(
        &self,
        old_address: Option<&EmailAddress>,
        new_address: &EmailAddress,
        desired_members: &BTreeSet<EmailAddress>,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        if desired_members.is_empty() {
            return Err(ReconciliationError::invalid_input(format!(
                "Refusing to reconcile '{}' with an empty member set",
                new_address
            )));
        }

        debug!(
            old_address = ?old_address.map(EmailAddress::as_str),
            new_address = %new_address,
            desired = desired_members.len(),
            "Reconciling directory group"
        );

        let mut result = ReconciliationResult::new(new_address.clone());

        match old_address {
            Some(old) if old == new_address => {}
            Some(old) => self.migrate(old, new_address, &mut result).await?,
            None => {
                let groups = self.list_groups().await?;
                if !groups.contains(new_address) {
                    self.create_group(new_address, &mut result).await?;
                }
            }
        }

        self.sync_members(new_address, desired_members, &mut result)
            .await?;

        info!(
            address = %new_address,
            migrated = result.migrated(),
            created = result.group_created,
            seeded = result.seeded.len(),
            added = result.added.len(),
            removed = result.removed.len(),
            "Directory group reconciled"
        );

        Ok(result)
    }

    async fn migrate(
        &self,
        old: &EmailAddress,
        new: &EmailAddress,
        result: &mut ReconciliationResult,
    ) -> Result<(), ReconciliationError> {
        info!(from = %old, to = %new, "Migrating directory group");

        let groups = self.list_groups().await?;

        let carried = if groups.contains(old) {
            let members = self.list_members(old).await?;

            match self.client.delete_group(old).await {
                Ok(()) => {}
                Err(DirectoryError::GroupNotFound { .. }) => {
                    debug!(address = %old, "Old group already gone");
                }
                Err(e) => {
                    return Err(ReconciliationError::directory(
                        ReconciliationStep::MigrateDelete,
                        e,
                    ));
                }
            }

            members
        } else {
            warn!(address = %old, "Old group not found, nothing to carry over");
            BTreeSet::new()
        };

        if !groups.contains(new) {
            self.create_group(new, result).await?;
        }

        for member in &carried {
            if self
                .add_member(new, member, ReconciliationStep::SeedMember)
                .await?
            {
                result.seeded.insert(member.clone());
            }
        }

        result.migrated_from = Some(old.clone());
        Ok(())
    }

    async fn sync_members(
        &self,
        address: &EmailAddress,
        desired: &BTreeSet<EmailAddress>,
        result: &mut ReconciliationResult,
    ) -> Result<(), ReconciliationError> {
        let observed = self.list_members(address).await?;
        let changes = diff(desired, &observed);

        if changes.is_empty() {
            debug!(address = %address, "Membership already in sync");
            return Ok(());
        }

        // Adds go first so a rotated membership never leaves the group empty
        for member in &changes.to_add {
            if self
                .add_member(address, member, ReconciliationStep::SyncAdd)
                .await?
            {
                result.added.insert(member.clone());
            }
        }

        for member in &changes.to_remove {
            if self.remove_member(address, member).await? {
                result.removed.insert(member.clone());
            }
        }

        Ok(())
    }

    async fn list_groups(&self) -> Result<BTreeSet<EmailAddress>, ReconciliationError> {
        self.client
            .list_groups()
            .await
            .map_err(|e| ReconciliationError::directory(ReconciliationStep::ListGroups, e))
    }

    async fn list_members(
        &self,
        address: &EmailAddress,
    ) -> Result<BTreeSet<EmailAddress>, ReconciliationError> {
        self.client
            .list_members(address)
            .await
            .map_err(|e| ReconciliationError::directory(ReconciliationStep::ListMembers, e))
    }

    async fn create_group(
        &self,
        address: &EmailAddress,
        result: &mut ReconciliationResult,
    ) -> Result<(), ReconciliationError> {
        match self.client.create_group(address).await {
            Ok(()) => {
                result.group_created = true;
                Ok(())
            }
            Err(DirectoryError::GroupExists { .. }) => {
                debug!(address = %address, "Group already exists");
                Ok(())
            }
            Err(e) => Err(ReconciliationError::directory(
                ReconciliationStep::MigrateCreate,
                e,
            )),
        }
    }

    /// Returns false when the service reports the member was already there
    async fn add_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
        step: ReconciliationStep,
    ) -> Result<bool, ReconciliationError> {
        match self.client.add_member(address, member).await {
            Ok(()) => Ok(true),
            Err(DirectoryError::MemberExists { .. }) => {
                debug!(address = %address, member = %member, "Member already present");
                Ok(false)
            }
            Err(e) => Err(ReconciliationError::directory(step, e)),
        }
    }

    /// Returns false when the service reports the member was already gone
    async fn remove_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
    ) -> Result<bool, ReconciliationError> {
        match self.client.remove_member(address, member).await {
            Ok(()) => Ok(true),
            Err(DirectoryError::MemberNotFound { .. }) => {
                debug!(address = %address, member = %member, "Member already absent");
                Ok(false)
            }
            Err(e) => Err(ReconciliationError::directory(
                ReconciliationStep::SyncRemove,
                e,
            )),
        }
    }
}
