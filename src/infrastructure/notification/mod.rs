//! Notification log implementations

mod in_memory;
mod tracing_log;

pub use in_memory::InMemoryNotificationLog;
pub use tracing_log::TracingNotificationLog;
