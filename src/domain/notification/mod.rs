//! Operator-facing record of directory sync failures

mod log;

pub use log::{FailureRecord, NotificationLog};
#[cfg(test)]
pub use log::MockNotificationLog;
