//! Identity tracking and lifecycle control for desktop notifications.
//!
//! [`NotificationManager`] maps every notification it shows or schedules to
//! the opaque handle returned by a platform backend ([`NotificationAdapter`]),
//! and turns the backend's raw callbacks into exactly one normalized
//! [`NotificationEvent`](herald_types::NotificationEvent) per notification.

pub mod adapter;
pub mod config;
pub mod error;
pub mod manager;
pub mod registry;
pub mod tracked;
pub mod translator;

pub use adapter::{AdapterError, LaunchSignal, NativeCallback, NotificationAdapter, NotificationCenter};
pub use config::{ManagerConfig, default_config_path, load_or_default};
pub use error::{NotificationError, Result};
pub use manager::NotificationManager;
pub use registry::{IdentityRegistry, RegistryError};
pub use tracked::{Schedule, TrackedNotification};
pub use translator::CallbackSink;

#[cfg(test)]
mod tests;
