//! Notification backend for desktops implementing the freedesktop.org
//! notification specification over the D-Bus session bus.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use herald_core::{AdapterError, CallbackSink, LaunchSignal, NativeCallback, NotificationAdapter};
use herald_types::{ApplicationContext, Capabilities, DEFAULT_ACTION_ID, DismissReason, Notification};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zbus::{Message, message::Type as MessageType, zvariant};

pub const NOTIFY_IFACE: &str = "org.freedesktop.Notifications";
pub const DEFAULT_DBUS_NAME: &str = "org.freedesktop.Notifications";
pub const DEFAULT_DBUS_PATH: &str = "/org/freedesktop/Notifications";

/// `NotificationClosed` reason: the notification expired.
pub const CLOSED_EXPIRED: u32 = 1;
/// `NotificationClosed` reason: dismissed by the user.
pub const CLOSED_BY_USER: u32 = 2;
/// `NotificationClosed` reason: closed by a `CloseNotification` call.
pub const CLOSED_BY_CALL: u32 = 3;

/// Runtime configuration for [`FreedesktopAdapter`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FreedesktopConfig {
    /// Application name sent with every notification.
    pub app_name: String,
    /// Application icon sent with every notification.
    pub app_icon: Option<PathBuf>,
    /// Bus name of the notification server.
    pub dbus_name: String,
    /// Object path of the notification server.
    pub dbus_path: String,
    /// Timeout for notifications without an expiration time. `-1` lets the server decide.
    pub default_timeout_ms: i32,
}

impl Default for FreedesktopConfig {
    fn default() -> Self {
        Self {
            app_name: "herald".to_string(),
            app_icon: None,
            dbus_name: DEFAULT_DBUS_NAME.to_string(),
            dbus_path: DEFAULT_DBUS_PATH.to_string(),
            default_timeout_ms: -1,
        }
    }
}

impl FreedesktopConfig {
    pub fn application(&self) -> ApplicationContext {
        let app = ApplicationContext::new(self.app_name.clone());
        match &self.app_icon {
            Some(icon) => app.with_icon(icon.clone()),
            None => app,
        }
    }
}

/// Signals emitted by a notification server that matter to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSignal {
    NotificationClosed { id: u32, reason: u32 },
    ActionInvoked { id: u32, action_key: String },
}

impl ServerSignal {
    /// Splits the signal into the server id and the callback it stands for.
    pub fn into_callback(self) -> (u32, NativeCallback<u32>) {
        match self {
            Self::NotificationClosed { id, reason } => (id, NativeCallback::Dismissed { code: reason }),
            Self::ActionInvoked { id, action_key } => (
                id,
                NativeCallback::Activated {
                    arguments: Some(action_key),
                },
            ),
        }
    }
}

/// Parses a notification server signal. Other messages yield `Ok(None)`.
pub fn parse_signal(msg: &Message) -> zbus::Result<Option<ServerSignal>> {
    let header = msg.header();

    let iface_is_notify = header
        .interface()
        .is_some_and(|iface| iface.as_str() == NOTIFY_IFACE);
    if !iface_is_notify || msg.message_type() != MessageType::Signal {
        return Ok(None);
    }

    match header.member().map(|m| m.as_str()) {
        Some("NotificationClosed") => {
            let (id, reason) = msg.body().deserialize::<(u32, u32)>()?;
            Ok(Some(ServerSignal::NotificationClosed { id, reason }))
        }
        Some("ActionInvoked") => {
            let (id, action_key) = msg.body().deserialize::<(u32, String)>()?;
            Ok(Some(ServerSignal::ActionInvoked { id, action_key }))
        }
        _ => Ok(None),
    }
}

/// Argument tuple of the `Notify` method.
pub type NotifyBody = (
    String,
    u32,
    String,
    String,
    String,
    Vec<String>,
    HashMap<String, zvariant::OwnedValue>,
    i32,
);

/// Client of a freedesktop notification server.
#[derive(Debug, Clone)]
pub struct FreedesktopAdapter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cfg: FreedesktopConfig,
    app: ApplicationContext,
    capabilities: RwLock<Capabilities>,
    session: Mutex<Option<Session>>,
}

#[derive(Debug)]
struct Session {
    proxy: zbus::Proxy<'static>,
    listener: JoinHandle<()>,
}

impl FreedesktopAdapter {
    pub fn new(cfg: FreedesktopConfig) -> Self {
        let app = cfg.application();
        Self {
            inner: Arc::new(Inner {
                cfg,
                app,
                capabilities: RwLock::new(Capabilities::empty()),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn application(&self) -> &ApplicationContext {
        &self.inner.app
    }

    fn proxy(&self) -> Result<zbus::Proxy<'static>, AdapterError> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|session| session.proxy.clone())
            .ok_or_else(|| AdapterError::Unavailable {
                message: "not connected to the session bus".to_string(),
            })
    }

    /// Builds the `Notify` arguments for `notification`.
    ///
    /// Body images are attached only when the server advertises `body-images`.
    pub fn notify_body(
        &self,
        notification: &Notification,
        expiration_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> NotifyBody {
        let app = &self.inner.app;
        let app_icon = app
            .icon_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();

        let mut actions = vec![DEFAULT_ACTION_ID.to_string(), String::new()];
        for button in &notification.buttons {
            actions.push(button.action_id.clone());
            actions.push(button.label.clone());
        }

        let mut hints = HashMap::new();
        if let Some(path) = &notification.body_image_path
            && self.capabilities().contains(Capabilities::BODY_IMAGES)
        {
            hints.insert(
                "image-path".to_string(),
                zvariant::OwnedValue::from(zvariant::Str::from(path.display().to_string())),
            );
        }

        (
            app.name.clone(),
            0,
            app_icon,
            notification.title.clone().unwrap_or_default(),
            notification.body.clone().unwrap_or_default(),
            actions,
            hints,
            expire_timeout(expiration_time, self.inner.cfg.default_timeout_ms, now),
        )
    }
}

/// Milliseconds until `expiration_time`, or `default_ms` when there is none.
///
/// Never returns 0, which the protocol reserves for notifications that never expire.
pub fn expire_timeout(expiration_time: Option<DateTime<Utc>>, default_ms: i32, now: DateTime<Utc>) -> i32 {
    match expiration_time {
        Some(at) => {
            let ms = (at - now).num_milliseconds().clamp(1, i64::from(i32::MAX));
            i32::try_from(ms).unwrap_or(i32::MAX)
        }
        None => default_ms,
    }
}

fn adapter_error(err: zbus::Error) -> AdapterError {
    match err {
        zbus::Error::MethodError(name, detail, _) => {
            AdapterError::rejected(detail.unwrap_or_else(|| name.to_string()))
        }
        other => AdapterError::Unavailable {
            message: other.to_string(),
        },
    }
}

async fn listen(
    mut closed: zbus::proxy::SignalStream<'static>,
    mut invoked: zbus::proxy::SignalStream<'static>,
    sink: CallbackSink<FreedesktopAdapter>,
) {
    loop {
        let msg = tokio::select! {
            Some(msg) = closed.next() => msg,
            Some(msg) = invoked.next() => msg,
            else => break,
        };

        match parse_signal(&msg) {
            Ok(Some(signal)) => {
                debug!(?signal, "notification server signal");
                let (id, callback) = signal.into_callback();
                sink.deliver(&id, callback);
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "failed to parse notification server signal"),
        }
    }
    debug!("notification server signal streams ended");
}

impl NotificationAdapter for FreedesktopAdapter {
    type Handle = u32;

    fn platform(&self) -> &str {
        "freedesktop"
    }

    fn capabilities(&self) -> Capabilities {
        *self.inner.capabilities.read()
    }

    fn classify_dismissal(code: u32) -> Option<DismissReason> {
        match code {
            CLOSED_EXPIRED => Some(DismissReason::Expired),
            CLOSED_BY_USER => Some(DismissReason::User),
            CLOSED_BY_CALL => Some(DismissReason::Application),
            _ => None,
        }
    }

    async fn initialize(&self, sink: CallbackSink<Self>) -> Result<Option<LaunchSignal>, AdapterError> {
        let cfg = &self.inner.cfg;
        info!(dbus_name = %cfg.dbus_name, dbus_path = %cfg.dbus_path, "connecting to notification server");

        let connection = zbus::Connection::session().await.map_err(adapter_error)?;
        let proxy = zbus::Proxy::new(
            &connection,
            cfg.dbus_name.clone(),
            cfg.dbus_path.clone(),
            NOTIFY_IFACE,
        )
        .await
        .map_err(adapter_error)?;

        let names: Vec<String> = proxy
            .call("GetCapabilities", &())
            .await
            .map_err(adapter_error)?;
        let capabilities = Capabilities::from_server_names(names.iter().map(String::as_str));
        *self.inner.capabilities.write() = capabilities;
        debug!(?names, ?capabilities, "notification server capabilities");

        let closed = proxy
            .receive_signal("NotificationClosed")
            .await
            .map_err(adapter_error)?;
        let invoked = proxy.receive_signal("ActionInvoked").await.map_err(adapter_error)?;
        let listener = tokio::spawn(listen(closed, invoked, sink));

        if let Some(previous) = self.inner.session.lock().replace(Session { proxy, listener }) {
            previous.listener.abort();
        }

        info!(dbus_name = %cfg.dbus_name, "notification server connected");
        Ok(None)
    }

    async fn render(
        &self,
        notification: &Notification,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Result<u32, AdapterError> {
        let proxy = self.proxy()?;
        let body = self.notify_body(notification, expiration_time, Utc::now());

        let reply = proxy.call_method("Notify", &body).await.map_err(adapter_error)?;
        let id: u32 = reply.body().deserialize().map_err(adapter_error)?;
        debug!(id, "notification server accepted Notify");
        Ok(id)
    }

    async fn hide(&self, handle: &u32) -> Result<(), AdapterError> {
        let proxy = self.proxy()?;
        proxy
            .call_method("CloseNotification", &(*handle,))
            .await
            .map_err(adapter_error)?;
        debug!(id = handle, "notification server handled CloseNotification");
        Ok(())
    }

    fn shutdown(&self) {
        if let Some(session) = self.inner.session.lock().take() {
            session.listener.abort();
            info!("disconnected from notification server");
        }
    }
}
