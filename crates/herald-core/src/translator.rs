//! Translation of raw native callbacks into normalized notification events.

use std::{collections::VecDeque, sync::Arc};

use herald_types::{DismissReason, NotificationEvent, NotificationId, normalize_action_id};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    adapter::{NativeCallback, NotificationAdapter},
    registry::{IdentityRegistry, RegistryError},
    tracked::TrackedNotification,
};

/// Manager lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Phase {
    Uninitialized,
    Ready,
    Failed(String),
    Disposed,
}

/// Which registry an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Shown,
    Scheduled,
}

/// Callbacks kept for handles that are not tracked yet.
const RETAINED_CALLBACKS: usize = 128;

/// Everything guarded by the manager lock.
#[derive(Debug)]
pub(crate) struct Tracking<H> {
    pub(crate) shown: IdentityRegistry<H, TrackedNotification>,
    pub(crate) scheduled: IdentityRegistry<H, TrackedNotification>,
    pub(crate) phase: Phase,
    next_id: u64,
    unmatched: VecDeque<(H, NativeCallback<H>)>,
}

impl<H> Tracking<H>
where
    H: Clone + Eq + std::hash::Hash + std::fmt::Debug,
{
    fn new() -> Self {
        Self {
            shown: IdentityRegistry::new(),
            scheduled: IdentityRegistry::new(),
            phase: Phase::Uninitialized,
            next_id: 1,
            unmatched: VecDeque::new(),
        }
    }

    pub(crate) fn alloc_id(&mut self) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub(crate) fn registry_mut(&mut self, slot: Slot) -> &mut IdentityRegistry<H, TrackedNotification> {
        match slot {
            Slot::Shown => &mut self.shown,
            Slot::Scheduled => &mut self.scheduled,
        }
    }

    /// Removes `id` from whichever registry holds it.
    pub(crate) fn remove_by_id(&mut self, id: &NotificationId) -> Option<(Slot, H, TrackedNotification)> {
        if let Some((handle, tracked)) = self.shown.remove_by_second(id) {
            return Some((Slot::Shown, handle, tracked));
        }
        self.scheduled
            .remove_by_second(id)
            .map(|(handle, tracked)| (Slot::Scheduled, handle, tracked))
    }

    /// Moves to `Disposed` and drops all tracking, returning the shown and scheduled counts.
    pub(crate) fn dispose(&mut self) -> (usize, usize) {
        self.phase = Phase::Disposed;
        self.unmatched.clear();
        (self.shown.clear(), self.scheduled.clear())
    }

    /// Keeps a callback for a handle neither registry knows.
    ///
    /// The platform may report an outcome between accepting a request and the
    /// manager registering its handle; registration replays what is kept here.
    fn retain_unmatched(&mut self, handle: &H, callback: NativeCallback<H>) {
        if self.phase == Phase::Disposed || self.shown.contains_first(handle) || self.scheduled.contains_first(handle) {
            return;
        }
        if self.unmatched.len() == RETAINED_CALLBACKS {
            self.unmatched.pop_front();
        }
        self.unmatched.push_back((handle.clone(), callback));
    }

    fn take_unmatched(&mut self, handle: &H, slot: Slot) -> Option<NativeCallback<H>> {
        let index = self
            .unmatched
            .iter()
            .position(|(kept, callback)| kept == handle && applies_to(slot, callback))?;
        self.unmatched.remove(index).map(|(_, callback)| callback)
    }

    /// Drops kept callbacks for a handle the manager has finished with.
    pub(crate) fn forget_unmatched(&mut self, handle: &H) {
        self.unmatched.retain(|(kept, _)| kept != handle);
    }
}

fn applies_to<H>(slot: Slot, callback: &NativeCallback<H>) -> bool {
    match slot {
        Slot::Shown => !matches!(callback, NativeCallback::Delivered { .. }),
        Slot::Scheduled => matches!(
            callback,
            NativeCallback::Delivered { .. } | NativeCallback::Failed { .. }
        ),
    }
}

/// Registers `tracked` under `handle`, first replaying any callback the
/// platform already reported for that handle.
///
/// Returns the event to publish when a kept callback ended the notification
/// before it could be tracked.
pub(crate) fn admit<A: NotificationAdapter>(
    tracking: &mut Tracking<A::Handle>,
    mut slot: Slot,
    mut handle: A::Handle,
    tracked: TrackedNotification,
) -> Result<Option<NotificationEvent>, RegistryError> {
    loop {
        if tracking.registry_mut(slot).contains_first(&handle) {
            return Err(RegistryError::DuplicateFirst);
        }

        match tracking.take_unmatched(&handle, slot) {
            None => {
                tracking.registry_mut(slot).add(handle, tracked)?;
                return Ok(None);
            }
            Some(NativeCallback::Delivered { shown }) => {
                debug!(id = %tracked.id, scheduled = ?handle, ?shown, "replaying early delivery callback");
                slot = Slot::Shown;
                handle = shown;
            }
            Some(callback) => {
                debug!(id = %tracked.id, ?handle, ?callback, "replaying early terminal callback");
                return Ok(terminal_event::<A>(tracked, callback));
            }
        }
    }
}

fn terminal_event<A: NotificationAdapter>(
    tracked: TrackedNotification,
    callback: NativeCallback<A::Handle>,
) -> Option<NotificationEvent> {
    let TrackedNotification { id, notification, .. } = tracked;
    match callback {
        NativeCallback::Activated { arguments } => Some(NotificationEvent::Activated {
            id,
            notification,
            action_id: normalize_action_id(arguments.as_deref()),
        }),
        NativeCallback::Dismissed { code } => Some(NotificationEvent::Dismissed {
            id,
            notification,
            reason: dismiss_reason::<A>(code),
        }),
        NativeCallback::Failed { code } => {
            warn!(%id, ?code, "platform failed to deliver notification");
            Some(NotificationEvent::Failed {
                id,
                notification,
                error_code: code,
            })
        }
        NativeCallback::Delivered { .. } => None,
    }
}

/// State shared between the manager and the callback sink.
#[derive(Debug)]
pub(crate) struct Shared<H> {
    pub(crate) tracking: Mutex<Tracking<H>>,
    events: broadcast::Sender<NotificationEvent>,
    capacity: usize,
}

impl<H> Shared<H>
where
    H: Clone + Eq + std::hash::Hash + std::fmt::Debug,
{
    pub(crate) fn new(event_capacity: usize) -> Self {
        let capacity = event_capacity.max(1);
        let (events, _) = broadcast::channel(capacity);
        Self {
            tracking: Mutex::new(Tracking::new()),
            events,
            capacity,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: NotificationEvent) {
        debug!(?event, "publishing notification event");
        if self.events.len() >= self.capacity {
            warn!(
                capacity = self.capacity,
                "event channel full; the slowest subscriber will miss its oldest event"
            );
        }
        if self.events.send(event).is_err() {
            debug!("no subscribers; notification event dropped");
        }
    }
}

/// Entry point for raw native callbacks.
///
/// Each platform backend receives a sink during initialization and posts
/// every callback it observes through [`deliver`](CallbackSink::deliver).
pub struct CallbackSink<A: NotificationAdapter> {
    shared: Arc<Shared<A::Handle>>,
}

impl<A: NotificationAdapter> Clone for CallbackSink<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: NotificationAdapter> std::fmt::Debug for CallbackSink<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

impl<A: NotificationAdapter> CallbackSink<A> {
    pub(crate) fn new(shared: Arc<Shared<A::Handle>>) -> Self {
        Self { shared }
    }

    /// Translates one raw callback.
    ///
    /// The entry for `handle` is removed before the event is built, so
    /// duplicate callbacks yield at most one event. A callback for a handle
    /// that is not tracked is kept briefly in case its registration is still
    /// in flight, and is otherwise discarded. Returns whether the callback was
    /// applied to a tracked notification.
    pub fn deliver(&self, handle: &A::Handle, callback: NativeCallback<A::Handle>) -> bool {
        let event = {
            let mut tracking = self.shared.tracking.lock();
            let removed = match &callback {
                NativeCallback::Activated { .. } | NativeCallback::Dismissed { .. } => {
                    tracking.shown.remove_by_first(handle)
                }
                NativeCallback::Delivered { .. } => tracking.scheduled.remove_by_first(handle),
                NativeCallback::Failed { .. } => tracking
                    .shown
                    .remove_by_first(handle)
                    .or_else(|| tracking.scheduled.remove_by_first(handle)),
            };
            let Some((_, tracked)) = removed else {
                debug!(?handle, ?callback, "no tracked notification for callback");
                tracking.retain_unmatched(handle, callback);
                return false;
            };

            match callback {
                NativeCallback::Delivered { shown } => {
                    let id = tracked.id;
                    match admit::<A>(&mut tracking, Slot::Shown, shown.clone(), tracked.clone()) {
                        Ok(None) => {
                            debug!(%id, scheduled = ?handle, ?shown, "scheduled notification delivered");
                            return true;
                        }
                        Ok(Some(event)) => event,
                        Err(err) => {
                            warn!(%id, ?shown, %err, "delivered notification could not be tracked as shown");
                            NotificationEvent::Failed {
                                id,
                                notification: tracked.notification,
                                error_code: None,
                            }
                        }
                    }
                }
                callback => {
                    let Some(event) = terminal_event::<A>(tracked, callback) else {
                        return true;
                    };
                    event
                }
            }
        };

        self.shared.publish(event);
        true
    }

    /// Convenience for [`NativeCallback::Activated`].
    pub fn activated(&self, handle: &A::Handle, arguments: Option<&str>) -> bool {
        self.deliver(
            handle,
            NativeCallback::Activated {
                arguments: arguments.map(ToOwned::to_owned),
            },
        )
    }

    /// Convenience for [`NativeCallback::Dismissed`].
    pub fn dismissed(&self, handle: &A::Handle, code: u32) -> bool {
        self.deliver(handle, NativeCallback::Dismissed { code })
    }
}

fn dismiss_reason<A: NotificationAdapter>(code: u32) -> DismissReason {
    A::classify_dismissal(code).unwrap_or_else(|| {
        warn!(code, "unrecognized native dismissal code; treating as application dismissal");
        DismissReason::Application
    })
}
