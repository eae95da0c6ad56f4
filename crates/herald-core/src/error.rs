use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::adapter::AdapterError;

/// Result alias for manager operations.
pub type Result<T, E = NotificationError> = std::result::Result<T, E>;

/// Errors surfaced to callers of [`NotificationManager`](crate::NotificationManager) operations.
///
/// Every variant is raised before, or after rollback of, any registry change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    /// Malformed input.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// Delivery or expiration times are out of order.
    #[error("cannot schedule notification for {delivery_time}: {reason}")]
    Scheduling {
        /// Requested delivery time.
        delivery_time: DateTime<Utc>,
        /// Which ordering rule was violated.
        reason: &'static str,
    },
    /// The platform rejected a show or hide request.
    #[error("notification delivery failed: {message}")]
    Delivery {
        /// Platform message.
        message: String,
        /// Platform error code, when available.
        code: Option<i64>,
    },
    /// The platform backend could not be set up.
    #[error("failed to initialize {platform} notifications: {message}")]
    Initialization {
        /// Platform name.
        platform: String,
        /// Failure description.
        message: String,
    },
    /// The backend has no primitive for the requested operation.
    #[error("{platform} notifications do not support {operation}")]
    UnsupportedOperation {
        /// Operation name.
        operation: &'static str,
        /// Platform name.
        platform: String,
    },
    /// The manager was disposed.
    #[error("notification manager has been disposed")]
    Disposed,
}

impl NotificationError {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn scheduling(delivery_time: DateTime<Utc>, reason: &'static str) -> Self {
        Self::Scheduling {
            delivery_time,
            reason,
        }
    }

    /// Maps an adapter failure onto the caller-facing taxonomy.
    pub(crate) fn from_adapter(platform: &str, err: AdapterError) -> Self {
        match err {
            AdapterError::Rejected { message, code } => Self::Delivery { message, code },
            AdapterError::Unavailable { message } => Self::Delivery {
                message,
                code: None,
            },
            AdapterError::Unsupported { operation } => Self::UnsupportedOperation {
                operation,
                platform: platform.to_string(),
            },
        }
    }

    /// Returns the platform error code carried by delivery errors.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Self::Delivery { code, .. } => *code,
            _ => None,
        }
    }

    /// Returns the offending delivery time of scheduling errors.
    pub fn delivery_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Scheduling { delivery_time, .. } => Some(*delivery_time),
            _ => None,
        }
    }
}
