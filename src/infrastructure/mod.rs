//! Infrastructure layer - Adapters for external services and ambient concerns

pub mod directory;
pub mod logging;
pub mod metrics;
pub mod notification;
pub mod retry;
pub mod team;
