//! In-memory directory client

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{DirectoryClient, DirectoryError, DirectoryOperation, EmailAddress};

/// One call received by [`InMemoryDirectoryClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCall {
    pub operation: DirectoryOperation,
    pub group: Option<EmailAddress>,
    pub member: Option<EmailAddress>,
}

/// Injected failure for a directory operation
#[derive(Debug, Clone)]
pub struct Fault {
    operation: DirectoryOperation,
    group: Option<EmailAddress>,
    member: Option<EmailAddress>,
    error: DirectoryError,
    /// Remaining failures; `None` fails forever
    remaining: Option<u32>,
}

impl Fault {
    pub fn new(operation: DirectoryOperation, error: DirectoryError) -> Self {
        Self {
            operation,
            group: None,
            member: None,
            error,
            remaining: None,
        }
    }

    /// Only fail calls targeting this group
    pub fn for_group(mut self, group: EmailAddress) -> Self {
        self.group = Some(group);
        self
    }

    /// Only fail calls targeting this member
    pub fn for_member(mut self, member: EmailAddress) -> Self {
        self.member = Some(member);
        self
    }

    /// Fail this many times, then let calls through
    pub fn times(mut self, count: u32) -> Self {
        self.remaining = Some(count);
        self
    }

    fn matches(&self, call: &DirectoryCall) -> bool {
        self.operation == call.operation
            && self.remaining != Some(0)
            && self.group.as_ref().is_none_or(|g| call.group.as_ref() == Some(g))
            && self
                .member
                .as_ref()
                .is_none_or(|m| call.member.as_ref() == Some(m))
    }
}

/// Directory kept in process memory.
///
/// Records every call and supports fault injection. By default adding an
/// existing member or removing an absent one succeeds silently; [`strict`]
/// makes those report `MemberExists` / `MemberNotFound` instead.
///
/// [`strict`]: InMemoryDirectoryClient::strict
#[derive(Debug, Default)]
pub struct InMemoryDirectoryClient {
    groups: RwLock<BTreeMap<EmailAddress, BTreeSet<EmailAddress>>>,
    calls: RwLock<Vec<DirectoryCall>>,
    faults: RwLock<Vec<Fault>>,
    strict: bool,
}

impl InMemoryDirectoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report redundant member changes as errors
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Seed a group (builder pattern)
    pub fn with_group(self, address: EmailAddress, members: BTreeSet<EmailAddress>) -> Self {
        if let Ok(mut groups) = self.groups.write() {
            groups.insert(address, members);
        }
        self
    }

    pub fn inject_fault(&self, fault: Fault) {
        if let Ok(mut faults) = self.faults.write() {
            faults.push(fault);
        }
    }

    pub fn group_exists(&self, address: &EmailAddress) -> bool {
        self.groups
            .read()
            .map(|g| g.contains_key(address))
            .unwrap_or(false)
    }

    pub fn members_of(&self, address: &EmailAddress) -> Option<BTreeSet<EmailAddress>> {
        self.groups
            .read()
            .ok()
            .and_then(|g| g.get(address).cloned())
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count_calls(&self, operation: DirectoryOperation) -> usize {
        self.calls
            .read()
            .map(|c| c.iter().filter(|call| call.operation == operation).count())
            .unwrap_or(0)
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.write() {
            calls.clear();
        }
    }

    /// Journal the call and return an injected fault, if one applies
    fn enter(
        &self,
        operation: DirectoryOperation,
        group: Option<&EmailAddress>,
        member: Option<&EmailAddress>,
    ) -> Result<(), DirectoryError> {
        let call = DirectoryCall {
            operation,
            group: group.cloned(),
            member: member.cloned(),
        };

        let mut faults = self.faults.write().map_err(|_| lock_error())?;
        let injected = faults.iter_mut().find(|f| f.matches(&call)).map(|fault| {
            if let Some(remaining) = fault.remaining.as_mut() {
                *remaining -= 1;
            }
            fault.error.clone()
        });

        self.calls.write().map_err(|_| lock_error())?.push(call);

        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn lock_error() -> DirectoryError {
    DirectoryError::transport("Failed to acquire lock")
}

#[async_trait]
impl DirectoryClient for InMemoryDirectoryClient {
    async fn list_groups(&self) -> Result<BTreeSet<EmailAddress>, DirectoryError> {
        self.enter(DirectoryOperation::ListGroups, None, None)?;

        let groups = self.groups.read().map_err(|_| lock_error())?;
        Ok(groups.keys().cloned().collect())
    }

    async fn create_group(&self, address: &EmailAddress) -> Result<(), DirectoryError> {
        self.enter(DirectoryOperation::CreateGroup, Some(address), None)?;

        let mut groups = self.groups.write().map_err(|_| lock_error())?;

        if groups.contains_key(address) {
            return Err(DirectoryError::group_exists(address.as_str()));
        }

        groups.insert(address.clone(), BTreeSet::new());
        Ok(())
    }

    async fn delete_group(&self, address: &EmailAddress) -> Result<(), DirectoryError> {
        self.enter(DirectoryOperation::DeleteGroup, Some(address), None)?;

        let mut groups = self.groups.write().map_err(|_| lock_error())?;

        match groups.remove(address) {
            Some(_) => Ok(()),
            None => Err(DirectoryError::group_not_found(address.as_str())),
        }
    }

    async fn list_members(
        &self,
        address: &EmailAddress,
    ) -> Result<BTreeSet<EmailAddress>, DirectoryError> {
        self.enter(DirectoryOperation::ListMembers, Some(address), None)?;

        let groups = self.groups.read().map_err(|_| lock_error())?;

        groups
            .get(address)
            .cloned()
            .ok_or_else(|| DirectoryError::group_not_found(address.as_str()))
    }

    async fn add_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
    ) -> Result<(), DirectoryError> {
        self.enter(DirectoryOperation::AddMember, Some(address), Some(member))?;

        let mut groups = self.groups.write().map_err(|_| lock_error())?;
        let members = groups
            .get_mut(address)
            .ok_or_else(|| DirectoryError::group_not_found(address.as_str()))?;

        if !members.insert(member.clone()) && self.strict {
            return Err(DirectoryError::member_exists(address.as_str(), member.as_str()));
        }

        Ok(())
    }

    async fn remove_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
    ) -> Result<(), DirectoryError> {
        self.enter(DirectoryOperation::RemoveMember, Some(address), Some(member))?;

        let mut groups = self.groups.write().map_err(|_| lock_error())?;
        let members = groups
            .get_mut(address)
            .ok_or_else(|| DirectoryError::group_not_found(address.as_str()))?;

        if !members.remove(member) && self.strict {
            return Err(DirectoryError::member_not_found(
                address.as_str(),
                member.as_str(),
            ));
        }

        Ok(())
    }
}
