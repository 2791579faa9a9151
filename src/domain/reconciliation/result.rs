//! Reconciliation outcome and error types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::directory::DirectoryError;
use crate::domain::team::EmailAddress;

/// Remote call at which a reconciliation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconciliationStep {
    ListGroups,
    ListMembers,
    MigrateDelete,
    MigrateCreate,
    SeedMember,
    SyncAdd,
    SyncRemove,
}

impl ReconciliationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListGroups => "list-groups",
            Self::ListMembers => "list-members",
            Self::MigrateDelete => "migrate-delete",
            Self::MigrateCreate => "migrate-create",
            Self::SeedMember => "seed-member",
            Self::SyncAdd => "sync-add",
            Self::SyncRemove => "sync-remove",
        }
    }
}

impl std::fmt::Display for ReconciliationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation failure, surfaced to the caller untouched
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconciliationError {
    #[error("Invalid reconciliation input: {message}")]
    InvalidInput { message: String },

    #[error("Directory call failed at step '{step}': {source}")]
    Directory {
        step: ReconciliationStep,
        #[source]
        source: DirectoryError,
    },
}

impl ReconciliationError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn directory(step: ReconciliationStep, source: DirectoryError) -> Self {
        Self::Directory { step, source }
    }

    /// Step that failed, absent for input validation failures
    pub fn step(&self) -> Option<ReconciliationStep> {
        match self {
            Self::Directory { step, .. } => Some(*step),
            Self::InvalidInput { .. } => None,
        }
    }

    pub fn directory_error(&self) -> Option<&DirectoryError> {
        match self {
            Self::Directory { source, .. } => Some(source),
            Self::InvalidInput { .. } => None,
        }
    }

    /// Whether re-running the whole reconciliation may succeed
    pub fn is_retryable(&self) -> bool {
        self.directory_error()
            .is_some_and(DirectoryError::is_retryable)
    }
}

/// What a successful reconciliation changed remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Address the group has after reconciliation
    pub address: EmailAddress,
    /// Previous address when the group was moved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated_from: Option<EmailAddress>,
    /// Whether this call created the group at `address`
    pub group_created: bool,
    /// Members carried over from the old group
    pub seeded: BTreeSet<EmailAddress>,
    /// Members added during membership sync
    pub added: BTreeSet<EmailAddress>,
    /// Members removed during membership sync
    pub removed: BTreeSet<EmailAddress>,
}

impl ReconciliationResult {
    pub fn new(address: EmailAddress) -> Self {
        Self {
            address,
            migrated_from: None,
            group_created: false,
            seeded: BTreeSet::new(),
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn migrated(&self) -> bool {
        self.migrated_from.is_some()
    }

    /// True when no remote state was modified
    pub fn is_noop(&self) -> bool {
        !self.migrated()
            && !self.group_created
            && self.seeded.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}
