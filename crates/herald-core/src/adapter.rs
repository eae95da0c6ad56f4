//! Contracts between the manager, platform backends and application code.

use std::{fmt::Debug, future::Future, hash::Hash};

use chrono::{DateTime, Utc};
use herald_types::{Capabilities, DismissReason, Notification, NotificationEvent, NotificationId};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

use crate::{error::Result, translator::CallbackSink};

/// Resolves with the raw activation arguments when the process was launched
/// by activating a notification.
pub type LaunchSignal = oneshot::Receiver<String>;

/// Errors reported by platform backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The platform refused the request.
    #[error("{message}")]
    Rejected {
        /// Platform message.
        message: String,
        /// Platform error code, when available.
        code: Option<i64>,
    },
    /// The platform has no primitive for this operation.
    #[error("{operation} is not supported")]
    Unsupported {
        /// Operation name.
        operation: &'static str,
    },
    /// The platform service could not be reached.
    #[error("notification service unavailable: {message}")]
    Unavailable {
        /// Failure description.
        message: String,
    },
}

impl AdapterError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            code: None,
        }
    }

    pub fn rejected_with_code(message: impl Into<String>, code: i64) -> Self {
        Self::Rejected {
            message: message.into(),
            code: Some(code),
        }
    }
}

/// Raw callback raised by a platform backend for one of its native handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCallback<H> {
    /// The notification body or one of its buttons was activated.
    Activated {
        /// Raw activation arguments; empty or missing means the body itself.
        arguments: Option<String>,
    },
    /// The notification went away. `code` is the platform's reason code.
    Dismissed {
        /// Native dismissal reason code.
        code: u32,
    },
    /// A scheduled notification was delivered and is now shown under `shown`.
    Delivered {
        /// Handle of the delivered notification.
        shown: H,
    },
    /// The platform gave up on delivering the notification.
    Failed {
        /// Platform error code, when available.
        code: Option<i64>,
    },
}

/// Platform backend that renders notifications and reports native callbacks.
///
/// Backends never see the registry. They return opaque handles from `render*`
/// and later report callbacks for those handles through the [`CallbackSink`]
/// handed to [`initialize`](NotificationAdapter::initialize). A callback may
/// arrive before the `render*` call that produced its handle has returned; the
/// sink keeps a bounded number of such callbacks and applies them once the
/// handle is registered.
pub trait NotificationAdapter: Send + Sync + Sized + 'static {
    /// Opaque native notification handle.
    type Handle: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Platform name used in errors and logs.
    fn platform(&self) -> &str;

    /// Optional features this backend renders.
    fn capabilities(&self) -> Capabilities;

    /// Whether [`render_scheduled`](NotificationAdapter::render_scheduled) is available.
    fn supports_scheduling(&self) -> bool {
        false
    }

    /// Maps a native dismissal code. `None` marks the code as unrecognized.
    fn classify_dismissal(code: u32) -> Option<DismissReason>;

    /// Performs platform setup and keeps `sink` for reporting callbacks.
    fn initialize(
        &self,
        sink: CallbackSink<Self>,
    ) -> impl Future<Output = Result<Option<LaunchSignal>, AdapterError>> + Send;

    /// Renders and delivers a notification now.
    fn render(
        &self,
        notification: &Notification,
        expiration_time: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Self::Handle, AdapterError>> + Send;

    /// Hands a notification to the platform scheduler.
    fn render_scheduled(
        &self,
        _notification: &Notification,
        _delivery_time: DateTime<Utc>,
        _expiration_time: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Self::Handle, AdapterError>> + Send {
        async {
            Err(AdapterError::Unsupported {
                operation: "scheduling",
            })
        }
    }

    /// Removes a shown notification.
    fn hide(&self, handle: &Self::Handle) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Removes a notification from the platform scheduler.
    fn cancel_schedule(
        &self,
        _handle: &Self::Handle,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send {
        async {
            Err(AdapterError::Unsupported {
                operation: "schedule cancellation",
            })
        }
    }

    /// Releases platform resources. Shown notifications stay with the platform.
    fn shutdown(&self) {}
}

/// Caller-facing notification lifecycle.
///
/// This is the surface application code depends on; the backend behind it is
/// chosen once at startup.
pub trait NotificationCenter: Send + Sync {
    /// Platform name.
    fn platform(&self) -> &str;

    /// Optional features the backend renders. Advisory only.
    fn capabilities(&self) -> Capabilities;

    /// Action id the process was launched with, if it was launched by a notification.
    fn launch_action_id(&self) -> Option<&str>;

    /// Subscribes to activation, dismissal and failure events.
    fn subscribe(&self) -> broadcast::Receiver<NotificationEvent>;

    /// Sets up the backend. May wait a bounded time for a launch activation.
    fn initialize(&self) -> impl Future<Output = Result<()>> + Send;

    /// Shows a notification now.
    fn show_notification(
        &self,
        notification: Notification,
        expiration_time: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<NotificationId>> + Send;

    /// Schedules a notification for later delivery.
    fn schedule_notification(
        &self,
        notification: Notification,
        delivery_time: DateTime<Utc>,
        expiration_time: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<NotificationId>> + Send;

    /// Hides a shown notification or cancels a scheduled one. Untracked ids are a no-op.
    fn hide_notification(&self, id: NotificationId) -> impl Future<Output = Result<()>> + Send;

    /// Stops tracking every notification without hiding any of them.
    fn dispose(&self);
}
