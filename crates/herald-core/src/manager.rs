use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use herald_types::{
    Capabilities, DEFAULT_ACTION_ID, Notification, NotificationEvent, NotificationId,
    normalize_action_id,
};
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tracing::{debug, info, warn};

use crate::{
    adapter::{LaunchSignal, NotificationAdapter, NotificationCenter},
    config::ManagerConfig,
    error::{NotificationError, Result},
    tracked::{Schedule, TrackedNotification},
    translator::{CallbackSink, Phase, Shared, Slot, admit},
};

/// Notification lifecycle over a single platform backend.
///
/// Cloning is cheap; every clone drives the same registries.
pub struct NotificationManager<A: NotificationAdapter> {
    inner: Arc<Inner<A>>,
}

impl<A: NotificationAdapter> Clone for NotificationManager<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<A: NotificationAdapter> {
    cfg: ManagerConfig,
    adapter: A,
    shared: Arc<Shared<A::Handle>>,
    launch_action_id: OnceLock<String>,
    init_guard: AsyncMutex<()>,
}

impl<A: NotificationAdapter> NotificationManager<A> {
    pub fn new(adapter: A, cfg: ManagerConfig) -> Self {
        let shared = Arc::new(Shared::new(cfg.event_capacity));
        Self {
            inner: Arc::new(Inner {
                cfg,
                adapter,
                shared,
                launch_action_id: OnceLock::new(),
                init_guard: AsyncMutex::new(()),
            }),
        }
    }

    /// Returns the platform backend.
    pub fn adapter(&self) -> &A {
        &self.inner.adapter
    }

    /// Returns a sink feeding raw callbacks into this manager.
    pub fn callback_sink(&self) -> CallbackSink<A> {
        CallbackSink::new(Arc::clone(&self.inner.shared))
    }

    /// Number of shown notifications currently tracked.
    pub fn shown_count(&self) -> usize {
        self.inner.shared.tracking.lock().shown.len()
    }

    /// Number of scheduled, undelivered notifications currently tracked.
    pub fn scheduled_count(&self) -> usize {
        self.inner.shared.tracking.lock().scheduled.len()
    }

    /// Native handle of a shown notification.
    pub fn shown_handle(&self, id: NotificationId) -> Option<A::Handle> {
        self.inner
            .shared
            .tracking
            .lock()
            .shown
            .try_get_by_second(&id)
            .cloned()
    }

    /// Native handle of a scheduled notification.
    pub fn scheduled_handle(&self, id: NotificationId) -> Option<A::Handle> {
        self.inner
            .shared
            .tracking
            .lock()
            .scheduled
            .try_get_by_second(&id)
            .cloned()
    }

    /// Looks up the shown notification behind a native handle.
    pub fn shown_notification(&self, handle: &A::Handle) -> Option<TrackedNotification> {
        self.inner
            .shared
            .tracking
            .lock()
            .shown
            .try_get_by_first(handle)
            .cloned()
    }

    /// Looks up the scheduled notification behind a native handle.
    pub fn scheduled_notification(&self, handle: &A::Handle) -> Option<TrackedNotification> {
        self.inner
            .shared
            .tracking
            .lock()
            .scheduled
            .try_get_by_first(handle)
            .cloned()
    }

    fn ensure_ready(&self) -> Result<()> {
        match &self.inner.shared.tracking.lock().phase {
            Phase::Ready => Ok(()),
            Phase::Uninitialized => Err(NotificationError::Initialization {
                platform: self.inner.adapter.platform().to_string(),
                message: "notification manager is not initialized".to_string(),
            }),
            Phase::Failed(message) => Err(NotificationError::Initialization {
                platform: self.inner.adapter.platform().to_string(),
                message: message.clone(),
            }),
            Phase::Disposed => Err(NotificationError::Disposed),
        }
    }

    fn adapter_error(&self, err: crate::adapter::AdapterError) -> NotificationError {
        NotificationError::from_adapter(self.inner.adapter.platform(), err)
    }

    async fn await_launch_action(&self, signal: LaunchSignal) {
        let wait = self.inner.cfg.launch_wait();
        match tokio::time::timeout(wait, signal).await {
            Ok(Ok(arguments)) => {
                let action_id = normalize_action_id(Some(arguments.as_str()));
                info!(action_id = %action_id, "process was launched by a notification");
                let _ = self.inner.launch_action_id.set(action_id);
            }
            Ok(Err(_)) => debug!("launch signal closed without an activation"),
            Err(_) => warn!(wait_ms = self.inner.cfg.launch_wait_ms, "timed out waiting for launch activation"),
        }
    }

    /// Registers an accepted native handle, or reports why it cannot be tracked.
    ///
    /// If the platform already reported an outcome for `handle`, the
    /// notification is never tracked and its event is published instead.
    fn register(
        &self,
        slot: Slot,
        handle: A::Handle,
        notification: Notification,
        schedule: Option<Schedule>,
    ) -> Result<NotificationId> {
        let (id, early) = {
            let mut tracking = self.inner.shared.tracking.lock();
            if tracking.phase == Phase::Disposed {
                debug!(?handle, "manager disposed while the platform accepted a notification");
                return Err(NotificationError::Disposed);
            }

            let id = tracking.alloc_id();
            let tracked = TrackedNotification::new(id, notification, schedule);
            let early = admit::<A>(&mut tracking, slot, handle, tracked).map_err(|err| {
                NotificationError::Delivery {
                    message: format!("platform returned a handle that is already tracked: {err}"),
                    code: None,
                }
            })?;
            (id, early)
        };

        if let Some(event) = early {
            debug!(%id, "platform finished with notification before it was tracked");
            self.inner.shared.publish(event);
        }
        Ok(id)
    }
}

fn validate(notification: &Notification) -> Result<()> {
    for button in &notification.buttons {
        if button.action_id.is_empty() {
            return Err(NotificationError::invalid_argument(
                "notification",
                format!("button `{}` has an empty action id", button.label),
            ));
        }
        if button.action_id == DEFAULT_ACTION_ID {
            return Err(NotificationError::invalid_argument(
                "notification",
                format!("button `{}` uses the reserved action id `{DEFAULT_ACTION_ID}`", button.label),
            ));
        }
    }
    Ok(())
}

impl<A: NotificationAdapter> NotificationCenter for NotificationManager<A> {
    fn platform(&self) -> &str {
        self.inner.adapter.platform()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.adapter.capabilities()
    }

    fn launch_action_id(&self) -> Option<&str> {
        self.inner.launch_action_id.get().map(String::as_str)
    }

    fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.shared.subscribe()
    }

    async fn initialize(&self) -> Result<()> {
        let _guard = self.inner.init_guard.lock().await;
        let phase = self.inner.shared.tracking.lock().phase.clone();
        match phase {
            Phase::Ready => return Ok(()),
            Phase::Disposed => return Err(NotificationError::Disposed),
            Phase::Uninitialized | Phase::Failed(_) => {}
        }

        let platform = self.inner.adapter.platform().to_string();
        info!(platform = %platform, "initializing notification backend");

        let launch = match self.inner.adapter.initialize(self.callback_sink()).await {
            Ok(launch) => launch,
            Err(err) => {
                let message = err.to_string();
                warn!(platform = %platform, %message, "notification backend failed to initialize");
                let mut tracking = self.inner.shared.tracking.lock();
                if tracking.phase != Phase::Disposed {
                    tracking.phase = Phase::Failed(message.clone());
                }
                return Err(NotificationError::Initialization { platform, message });
            }
        };

        if let Some(signal) = launch {
            self.await_launch_action(signal).await;
        }

        let mut tracking = self.inner.shared.tracking.lock();
        if tracking.phase == Phase::Disposed {
            return Err(NotificationError::Disposed);
        }
        tracking.phase = Phase::Ready;
        drop(tracking);

        info!(
            platform = %platform,
            capabilities = ?self.capabilities(),
            launch_action_id = ?self.launch_action_id(),
            "notification backend ready"
        );
        Ok(())
    }

    async fn show_notification(
        &self,
        notification: Notification,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Result<NotificationId> {
        validate(&notification)?;
        if let Some(expiration) = expiration_time
            && expiration < Utc::now()
        {
            return Err(NotificationError::invalid_argument(
                "expiration_time",
                "expiration time cannot be in the past",
            ));
        }
        self.ensure_ready()?;

        debug!(title = ?notification.title, ?expiration_time, "rendering notification");
        let handle = self
            .inner
            .adapter
            .render(&notification, expiration_time)
            .await
            .map_err(|err| {
                warn!(%err, "platform rejected notification");
                self.adapter_error(err)
            })?;

        let id = self.register(Slot::Shown, handle.clone(), notification, None)?;
        info!(%id, ?handle, "notification shown");
        Ok(id)
    }

    async fn schedule_notification(
        &self,
        notification: Notification,
        delivery_time: DateTime<Utc>,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Result<NotificationId> {
        self.ensure_ready()?;
        if !self.inner.adapter.supports_scheduling() {
            return Err(NotificationError::UnsupportedOperation {
                operation: "scheduling",
                platform: self.inner.adapter.platform().to_string(),
            });
        }
        validate(&notification)?;
        let schedule = Schedule::new(Utc::now(), delivery_time, expiration_time)?;

        debug!(title = ?notification.title, %delivery_time, ?expiration_time, "scheduling notification");
        let handle = self
            .inner
            .adapter
            .render_scheduled(&notification, delivery_time, expiration_time)
            .await
            .map_err(|err| {
                warn!(%err, "platform rejected scheduled notification");
                self.adapter_error(err)
            })?;

        let id = self.register(Slot::Scheduled, handle.clone(), notification, Some(schedule))?;
        info!(%id, ?handle, %delivery_time, "notification scheduled");
        Ok(id)
    }

    async fn hide_notification(&self, id: NotificationId) -> Result<()> {
        let removed = self.inner.shared.tracking.lock().remove_by_id(&id);
        let Some((slot, handle, tracked)) = removed else {
            debug!(%id, "hide requested for untracked notification");
            return Ok(());
        };

        let result = match slot {
            Slot::Shown => self.inner.adapter.hide(&handle).await,
            Slot::Scheduled => self.inner.adapter.cancel_schedule(&handle).await,
        };

        if let Err(err) = result {
            warn!(%id, ?handle, %err, "platform rejected hide request");
            let early = {
                let mut tracking = self.inner.shared.tracking.lock();
                if tracking.phase == Phase::Disposed {
                    None
                } else {
                    admit::<A>(&mut tracking, slot, handle, tracked).unwrap_or_else(|err| {
                        debug!(%id, %err, "hidden notification could not be restored");
                        None
                    })
                }
            };
            if let Some(event) = early {
                self.inner.shared.publish(event);
            }
            return Err(self.adapter_error(err));
        }

        self.inner.shared.tracking.lock().forget_unmatched(&handle);
        info!(%id, ?slot, "notification hidden");
        Ok(())
    }

    fn dispose(&self) {
        let (shown, scheduled) = self.inner.shared.tracking.lock().dispose();
        self.inner.adapter.shutdown();
        info!(shown, scheduled, "notification manager disposed; native notifications left to the platform");
    }
}
