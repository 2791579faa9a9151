//! Team roster domain module
//!
//! A roster is the authoritative local view of a team: its members and the
//! mailing-list address its external directory group should have.

mod diff;
mod entity;
mod validation;

pub use diff::{diff, RosterDiff};
pub use entity::{EmailAddress, Roster, TeamId};
pub use validation::{validate_email, validate_team_id, TeamValidationError};
