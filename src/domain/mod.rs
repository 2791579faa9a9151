//! Domain layer - Core business logic and entities

pub mod directory;
pub mod error;
pub mod notification;
pub mod reconciliation;
pub mod team;

pub use directory::{DirectoryClient, DirectoryError, DirectoryOperation};
pub use error::DomainError;
pub use notification::{FailureRecord, NotificationLog};
pub use reconciliation::{
    ReconciliationEngine, ReconciliationError, ReconciliationResult, ReconciliationStep,
};
pub use team::{diff, EmailAddress, Roster, RosterDiff, TeamId, TeamValidationError};
