//! Directory service errors

use thiserror::Error;

/// Fault reported by a single directory call
///
/// Addresses are kept as raw strings: they come back from the remote service
/// and are only ever logged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("Group '{address}' already exists")]
    GroupExists { address: String },

    #[error("Group '{address}' not found")]
    GroupNotFound { address: String },

    #[error("'{member}' is already a member of '{group}'")]
    MemberExists { group: String, member: String },

    #[error("'{member}' is not a member of '{group}'")]
    MemberNotFound { group: String, member: String },

    #[error("Directory rejected credentials: {message}")]
    Unauthorized { message: String },

    #[error("Directory rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Directory request timed out")]
    Timeout,

    #[error("Directory transport error: {message}")]
    Transport { message: String },

    #[error("Directory returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected directory response: {message}")]
    InvalidResponse { message: String },
}

impl DirectoryError {
    pub fn group_exists(address: impl Into<String>) -> Self {
        Self::GroupExists {
            address: address.into(),
        }
    }

    pub fn group_not_found(address: impl Into<String>) -> Self {
        Self::GroupNotFound {
            address: address.into(),
        }
    }

    pub fn member_exists(group: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MemberExists {
            group: group.into(),
            member: member.into(),
        }
    }

    pub fn member_not_found(group: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MemberNotFound {
            group: group.into(),
            member: member.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Transient faults worth another full reconciliation attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Transport { .. } => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short snake_case label, used as a metrics dimension
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GroupExists { .. } => "group_exists",
            Self::GroupNotFound { .. } => "group_not_found",
            Self::MemberExists { .. } => "member_exists",
            Self::MemberNotFound { .. } => "member_not_found",
            Self::Unauthorized { .. } => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::Timeout => "timeout",
            Self::Transport { .. } => "transport",
            Self::Server { .. } => "server",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }

    /// Server-suggested wait before retrying, if any
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}
