//! Directory client trait

use std::collections::BTreeSet;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::error::DirectoryError;
use crate::domain::team::EmailAddress;

/// Capability interface over the external group-management service.
///
/// Every method is exactly one remote call with no retries; callers decide
/// whether a failure is worth another attempt. Implementations own transport
/// timeouts and report them as [`DirectoryError::Timeout`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Addresses of every group that currently exists
    async fn list_groups(&self) -> Result<BTreeSet<EmailAddress>, DirectoryError>;

    /// Create a group; fails with `GroupExists` if it is already there
    async fn create_group(&self, address: &EmailAddress) -> Result<(), DirectoryError>;

    /// Delete a group; fails with `GroupNotFound` if it is absent
    async fn delete_group(&self, address: &EmailAddress) -> Result<(), DirectoryError>;

    /// Members of a group; fails with `GroupNotFound` if it is absent
    async fn list_members(
        &self,
        address: &EmailAddress,
    ) -> Result<BTreeSet<EmailAddress>, DirectoryError>;

    /// Add a member. The service may report `MemberExists` or silently succeed.
    async fn add_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
    ) -> Result<(), DirectoryError>;

    /// Remove a member. The service may report `MemberNotFound` or silently succeed.
    async fn remove_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
    ) -> Result<(), DirectoryError>;
}
