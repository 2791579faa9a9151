//! Team roster entity and related types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::validation::{validate_email, validate_team_id, TeamValidationError};

/// Team identifier - alphanumeric, hyphens and underscores, max 64 characters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamId(String);

impl TeamId {
    /// Create a new TeamId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, TeamValidationError> {
        let id = id.into();
        validate_team_id(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TeamId {
    type Error = TeamValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TeamId> for String {
    fn from(id: TeamId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email address, normalized to trimmed lowercase
///
/// Equality, ordering and hashing all operate on the normalized form, so
/// `Sam@CMU.edu` and `sam@cmu.edu` are the same member. Used for both person
/// addresses and mailing-list (group) addresses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an email address
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, TeamValidationError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        validate_email(&normalized)?;
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part after the `@`
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map(|(_, d)| d).unwrap_or_default()
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = TeamValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = TeamValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a team's authoritative membership and mailing address
///
/// Built by the caller from durable team storage for the duration of one
/// reconciliation and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    team_id: TeamId,
    members: BTreeSet<EmailAddress>,
    /// Address the remote group is believed to have right now
    #[serde(skip_serializing_if = "Option::is_none")]
    current_address: Option<EmailAddress>,
    /// Address the remote group should have after reconciliation
    #[serde(skip_serializing_if = "Option::is_none")]
    desired_address: Option<EmailAddress>,
}

impl Roster {
    /// Create an empty roster for a team
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            members: BTreeSet::new(),
            current_address: None,
            desired_address: None,
        }
    }

    /// Set members (builder pattern); duplicates collapse case-insensitively
    pub fn with_members<I>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = EmailAddress>,
    {
        self.members = members.into_iter().collect();
        self
    }

    /// Address the group currently has remotely (builder pattern)
    pub fn with_current_address(mut self, address: EmailAddress) -> Self {
        self.current_address = Some(address);
        self
    }

    /// Address the group should have after reconciliation (builder pattern)
    pub fn with_desired_address(mut self, address: EmailAddress) -> Self {
        self.desired_address = Some(address);
        self
    }

    // Getters

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn members(&self) -> &BTreeSet<EmailAddress> {
        &self.members
    }

    pub fn current_address(&self) -> Option<&EmailAddress> {
        self.current_address.as_ref()
    }

    pub fn desired_address(&self) -> Option<&EmailAddress> {
        self.desired_address.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Address the group must have once reconciled
    pub fn target_address(&self) -> Option<&EmailAddress> {
        self.desired_address
            .as_ref()
            .or(self.current_address.as_ref())
    }

    /// Whether reconciling this roster moves the group to a new address
    pub fn needs_migration(&self) -> bool {
        match (&self.current_address, &self.desired_address) {
            (Some(current), Some(desired)) => current != desired,
            _ => false,
        }
    }

    /// Case-insensitive membership check for a raw address
    pub fn contains(&self, email: &str) -> bool {
        EmailAddress::parse(email)
            .map(|e| self.members.contains(&e))
            .unwrap_or(false)
    }

    // Mutators

    /// Add a member, returning false if already present
    pub fn add_member(&mut self, email: EmailAddress) -> bool {
        self.members.insert(email)
    }

    /// Remove a member, returning false if absent
    pub fn remove_member(&mut self, email: &EmailAddress) -> bool {
        self.members.remove(email)
    }

    /// Change the mailing address; the current address is kept until reconciled
    pub fn rename_address(&mut self, address: EmailAddress) {
        self.desired_address = Some(address);
    }

    /// Record that the remote group now lives at the target address
    pub fn mark_reconciled(&mut self) {
        if let Some(target) = self.target_address().cloned() {
            self.current_address = Some(target.clone());
            self.desired_address = Some(target);
        }
    }

    /// A roster with members must know where its group lives
    pub fn validate(&self) -> Result<(), crate::domain::DomainError> {
        if !self.members.is_empty() && self.target_address().is_none() {
            return Err(crate::domain::DomainError::validation(format!(
                "Team '{}' has members but no mailing address",
                self.team_id
            )));
        }

        Ok(())
    }
}
