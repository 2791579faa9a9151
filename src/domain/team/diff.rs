//! Membership diff between a desired roster and an observed group

use std::collections::BTreeSet;

use super::entity::EmailAddress;

/// Members to add to and remove from an observed group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    pub to_add: BTreeSet<EmailAddress>,
    pub to_remove: BTreeSet<EmailAddress>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute `desired - observed` and `observed - desired`.
///
/// Case-insensitive because [`EmailAddress`] compares normalized values.
pub fn diff(desired: &BTreeSet<EmailAddress>, observed: &BTreeSet<EmailAddress>) -> RosterDiff {
    RosterDiff {
        to_add: desired.difference(observed).cloned().collect(),
        to_remove: observed.difference(desired).cloned().collect(),
    }
}
