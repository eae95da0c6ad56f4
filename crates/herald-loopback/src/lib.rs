use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use herald_core::{AdapterError, CallbackSink, LaunchSignal, NativeCallback, NotificationAdapter};
use herald_types::{Capabilities, DismissReason, Notification};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, info, warn};

/// Dismissed by the user.
pub const USER_CANCELED: u32 = 0;
/// Removed by the application.
pub const APPLICATION_HIDDEN: u32 = 1;
/// Reached its expiration time.
pub const TIMED_OUT: u32 = 2;

/// Configuration for [`LoopbackAdapter`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Platform name reported to the manager.
    pub platform: String,
    /// Advertised capabilities, using freedesktop capability names.
    pub capabilities: Vec<String>,
    /// Whether scheduled delivery is available.
    pub supports_scheduling: bool,
    /// Raw activation arguments to report as the launch activation.
    pub launch_action: Option<String>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            platform: "loopback".to_string(),
            capabilities: vec!["body".to_string(), "body-images".to_string()],
            supports_scheduling: true,
            launch_action: None,
        }
    }
}

/// In-process notification platform.
///
/// Keeps delivered and scheduled notifications in memory, runs delivery and
/// expiration timers on the tokio runtime, and exposes hooks that play the
/// part of the user (activate, dismiss) or the platform (fail, raw callbacks).
#[derive(Debug, Clone)]
pub struct LoopbackAdapter {
    cfg: LoopbackConfig,
    capabilities: Capabilities,
    inner: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    shown: HashMap<u64, Delivered>,
    scheduled: HashMap<u64, Pending>,
    sink: Option<CallbackSink<LoopbackAdapter>>,
    reject_next: Option<AdapterError>,
}

#[derive(Debug)]
struct Delivered {
    notification: Notification,
    expiry: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Pending {
    notification: Notification,
    timer: JoinHandle<()>,
}

impl LoopbackAdapter {
    pub fn new(cfg: LoopbackConfig) -> Self {
        let capabilities = Capabilities::from_server_names(cfg.capabilities.iter().map(String::as_str));
        Self {
            cfg,
            capabilities,
            inner: Arc::new(Mutex::new(State {
                next_id: 1,
                ..State::default()
            })),
        }
    }

    /// Makes the next render request fail with `err`.
    pub fn reject_next(&self, err: AdapterError) {
        self.inner.lock().reject_next = Some(err);
    }

    /// Returns delivered notifications keyed by handle.
    pub fn snapshot(&self) -> Vec<(u64, Notification)> {
        let state = self.inner.lock();
        state
            .shown
            .iter()
            .map(|(id, delivered)| (*id, delivered.notification.clone()))
            .collect()
    }

    /// Returns handles waiting for scheduled delivery.
    pub fn pending(&self) -> Vec<u64> {
        self.inner.lock().scheduled.keys().copied().collect()
    }

    /// Activates a delivered notification as the user would.
    ///
    /// `action_id` must name one of the notification's buttons; `None` clicks
    /// the body. Returns `false` if the handle or the button is unknown.
    pub fn activate(&self, id: u64, action_id: Option<&str>) -> bool {
        let mut state = self.inner.lock();
        let Some(delivered) = state.shown.get(&id) else {
            return false;
        };

        if let Some(action_id) = action_id
            && !delivered
                .notification
                .buttons
                .iter()
                .any(|button| button.action_id == action_id)
        {
            return false;
        }

        let removed = state.shown.remove(&id);
        let sink = state.sink.clone();
        drop(state);

        cancel_expiry(removed);
        raise(
            sink,
            id,
            NativeCallback::Activated {
                arguments: action_id.map(ToOwned::to_owned),
            },
        );
        true
    }

    /// Removes a delivered notification and reports `code` as the dismissal reason.
    pub fn dismiss(&self, id: u64, code: u32) -> bool {
        let mut state = self.inner.lock();
        let Some(removed) = state.shown.remove(&id) else {
            return false;
        };
        let sink = state.sink.clone();
        drop(state);

        cancel_expiry(Some(removed));
        raise(sink, id, NativeCallback::Dismissed { code });
        true
    }

    /// Drops a delivered or scheduled notification and reports a delivery failure.
    pub fn fail(&self, id: u64, code: Option<i64>) -> bool {
        let mut state = self.inner.lock();
        let known = if let Some(pending) = state.scheduled.remove(&id) {
            pending.timer.abort();
            true
        } else {
            let removed = state.shown.remove(&id);
            let known = removed.is_some();
            cancel_expiry(removed);
            known
        };
        if !known {
            return false;
        }
        let sink = state.sink.clone();
        drop(state);

        raise(sink, id, NativeCallback::Failed { code });
        true
    }

    /// Reports a callback without touching platform state, as a platform
    /// redelivering a callback would.
    pub fn raw_callback(&self, id: u64, callback: NativeCallback<u64>) -> bool {
        let sink = self.inner.lock().sink.clone();
        sink.is_some_and(|sink| sink.deliver(&id, callback))
    }

    fn alloc_id(state: &mut State) -> u64 {
        let id = state.next_id;
        state.next_id = state.next_id.saturating_add(1);
        id
    }

    fn take_rejection(&self) -> Result<(), AdapterError> {
        match self.inner.lock().reject_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn arm_expiry(&self, id: u64, expiration_time: DateTime<Utc>) -> JoinHandle<()> {
        let adapter = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(until(expiration_time)).await;
            adapter.expire(id);
        })
    }

    fn expire(&self, id: u64) {
        let mut state = self.inner.lock();
        if state.shown.remove(&id).is_none() {
            return;
        }
        let sink = state.sink.clone();
        drop(state);

        debug!(id, "loopback notification expired");
        raise(sink, id, NativeCallback::Dismissed { code: TIMED_OUT });
    }

    fn deliver_scheduled(&self, id: u64, expiration_time: Option<DateTime<Utc>>) {
        let mut state = self.inner.lock();
        let Some(pending) = state.scheduled.remove(&id) else {
            return;
        };
        let expiry = expiration_time.map(|at| self.arm_expiry(id, at));
        state.shown.insert(
            id,
            Delivered {
                notification: pending.notification,
                expiry,
            },
        );
        let sink = state.sink.clone();
        drop(state);

        debug!(id, "loopback scheduled notification delivered");
        raise(sink, id, NativeCallback::Delivered { shown: id });
    }
}

impl NotificationAdapter for LoopbackAdapter {
    type Handle = u64;

    fn platform(&self) -> &str {
        &self.cfg.platform
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn supports_scheduling(&self) -> bool {
        self.cfg.supports_scheduling
    }

    fn classify_dismissal(code: u32) -> Option<DismissReason> {
        match code {
            USER_CANCELED => Some(DismissReason::User),
            APPLICATION_HIDDEN => Some(DismissReason::Application),
            TIMED_OUT => Some(DismissReason::Expired),
            _ => None,
        }
    }

    async fn initialize(&self, sink: CallbackSink<Self>) -> Result<Option<LaunchSignal>, AdapterError> {
        self.inner.lock().sink = Some(sink);
        info!(platform = %self.cfg.platform, "loopback notification platform ready");

        let Some(arguments) = self.cfg.launch_action.clone() else {
            return Ok(None);
        };
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(arguments);
        Ok(Some(rx))
    }

    async fn render(
        &self,
        notification: &Notification,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Result<u64, AdapterError> {
        self.take_rejection()?;

        let mut state = self.inner.lock();
        let id = Self::alloc_id(&mut state);
        let expiry = expiration_time.map(|at| self.arm_expiry(id, at));
        state.shown.insert(
            id,
            Delivered {
                notification: notification.clone(),
                expiry,
            },
        );
        debug!(id, title = ?notification.title, "loopback notification delivered");
        Ok(id)
    }

    async fn render_scheduled(
        &self,
        notification: &Notification,
        delivery_time: DateTime<Utc>,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Result<u64, AdapterError> {
        if !self.cfg.supports_scheduling {
            return Err(AdapterError::Unsupported {
                operation: "scheduling",
            });
        }
        self.take_rejection()?;

        let mut state = self.inner.lock();
        let id = Self::alloc_id(&mut state);
        let adapter = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(until(delivery_time)).await;
            adapter.deliver_scheduled(id, expiration_time);
        });
        state.scheduled.insert(
            id,
            Pending {
                notification: notification.clone(),
                timer,
            },
        );
        debug!(id, %delivery_time, "loopback notification scheduled");
        Ok(id)
    }

    async fn hide(&self, handle: &u64) -> Result<(), AdapterError> {
        let mut state = self.inner.lock();
        let removed = state.shown.remove(handle);
        if removed.is_none() {
            return Ok(());
        }
        let sink = state.sink.clone();
        drop(state);

        cancel_expiry(removed);
        raise(sink, *handle, NativeCallback::Dismissed { code: APPLICATION_HIDDEN });
        Ok(())
    }

    async fn cancel_schedule(&self, handle: &u64) -> Result<(), AdapterError> {
        if let Some(pending) = self.inner.lock().scheduled.remove(handle) {
            pending.timer.abort();
            debug!(id = handle, "loopback schedule cancelled");
        }
        Ok(())
    }

    fn shutdown(&self) {
        if self.inner.lock().sink.take().is_some() {
            info!(platform = %self.cfg.platform, "loopback platform detached from manager");
        }
    }
}

fn until(at: DateTime<Utc>) -> Duration {
    (at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

fn cancel_expiry(delivered: Option<Delivered>) {
    if let Some(timer) = delivered.and_then(|delivered| delivered.expiry) {
        timer.abort();
    }
}

fn raise(sink: Option<CallbackSink<LoopbackAdapter>>, id: u64, callback: NativeCallback<u64>) {
    match sink {
        Some(sink) => {
            sink.deliver(&id, callback);
        }
        None => warn!(id, ?callback, "loopback platform has no callback sink; dropping callback"),
    }
}
