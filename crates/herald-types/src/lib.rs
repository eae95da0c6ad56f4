use std::{fmt, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

/// Action id reported when a notification is activated without a specific button.
pub const DEFAULT_ACTION_ID: &str = "default";

/// Alt text used for body images unless the caller provides one.
pub const DEFAULT_IMAGE_ALT_TEXT: &str = "Image";

/// Why a shown notification went away.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DismissReason {
    /// The user closed the notification.
    User,
    /// The notification timed out or passed its expiration time.
    Expired,
    /// The application (or the platform on its behalf) removed the notification.
    Application,
}

/// A button attached to a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationButton {
    /// Human-readable label shown in UI.
    pub label: String,
    /// Identifier reported back when the button is activated.
    pub action_id: String,
}

/// Logical notification content.
///
/// A `Notification` carries no identity of its own. The manager assigns a
/// [`NotificationId`] when the notification is shown or scheduled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Notification {
    /// Notification title.
    pub title: Option<String>,
    /// Notification body text.
    pub body: Option<String>,
    /// Path of an image shown in the body.
    pub body_image_path: Option<PathBuf>,
    /// Accessibility text for the body image.
    pub body_image_alt_text: String,
    /// Buttons in display order.
    pub buttons: Vec<NotificationButton>,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            title: None,
            body: None,
            body_image_path: None,
            body_image_alt_text: DEFAULT_IMAGE_ALT_TEXT.to_string(),
            buttons: Vec::new(),
        }
    }
}

impl Notification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attaches a body image. An empty `alt_text` keeps the default.
    pub fn with_body_image(mut self, path: impl Into<PathBuf>, alt_text: impl Into<String>) -> Self {
        self.body_image_path = Some(path.into());
        let alt_text = alt_text.into();
        if !alt_text.is_empty() {
            self.body_image_alt_text = alt_text;
        }
        self
    }

    pub fn with_button(mut self, label: impl Into<String>, action_id: impl Into<String>) -> Self {
        self.buttons.push(NotificationButton {
            label: label.into(),
            action_id: action_id.into(),
        });
        self
    }
}

/// Identity assigned to a notification for as long as the manager tracks it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Normalized event delivered to subscribers of a notification manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A notification (or one of its buttons) was activated.
    Activated {
        /// Identity of the activated notification.
        id: NotificationId,
        /// Notification payload.
        notification: Arc<Notification>,
        /// Button action id, or [`DEFAULT_ACTION_ID`].
        action_id: String,
    },
    /// A notification was dismissed.
    Dismissed {
        /// Identity of the dismissed notification.
        id: NotificationId,
        /// Notification payload.
        notification: Arc<Notification>,
        /// Normalized dismissal reason.
        reason: DismissReason,
    },
    /// The platform reported that delivery failed after the request was accepted.
    Failed {
        /// Identity of the failed notification.
        id: NotificationId,
        /// Notification payload.
        notification: Arc<Notification>,
        /// Platform error code, when the platform supplies one.
        error_code: Option<i64>,
    },
}

impl NotificationEvent {
    pub fn id(&self) -> NotificationId {
        match self {
            Self::Activated { id, .. } | Self::Dismissed { id, .. } | Self::Failed { id, .. } => *id,
        }
    }
}

bitflags::bitflags! {
    /// Optional notification features a platform backend can render.
    ///
    /// Flags are advisory: fields a backend cannot render are dropped silently.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Body text.
        const BODY_TEXT = 1 << 0;
        /// Images inside the body.
        const BODY_IMAGES = 1 << 1;
        /// Application icon.
        const ICON = 1 << 2;
        /// Notification sound.
        const AUDIO = 1 << 3;
    }
}

impl Capabilities {
    /// Parses a capability name as advertised by freedesktop notification servers.
    pub fn from_server_name(name: &str) -> Option<Self> {
        match name {
            "body" => Some(Self::BODY_TEXT),
            "body-images" => Some(Self::BODY_IMAGES),
            "icon-static" | "icon-multi" => Some(Self::ICON),
            "sound" => Some(Self::AUDIO),
            _ => None,
        }
    }

    /// Collects every recognized name; unknown names are skipped.
    pub fn from_server_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(Self::from_server_name)
            .fold(Self::empty(), |set, cap| set | cap)
    }
}

/// Information about the hosting application that some backends display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationContext {
    /// Application name.
    pub name: String,
    /// Icon shown next to notifications, if the backend supports it.
    pub icon_path: Option<PathBuf>,
}

impl ApplicationContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon_path: None,
        }
    }

    pub fn with_icon(mut self, icon_path: impl Into<PathBuf>) -> Self {
        self.icon_path = Some(icon_path.into());
        self
    }
}

/// Normalizes raw activation arguments to an action id.
pub fn normalize_action_id(arguments: Option<&str>) -> String {
    match arguments {
        Some(arguments) if !arguments.is_empty() => arguments.to_string(),
        _ => DEFAULT_ACTION_ID.to_string(),
    }
}
