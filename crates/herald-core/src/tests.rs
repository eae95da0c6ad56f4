use chrono::{DateTime, Duration, Utc};
use herald_types::{Capabilities, DismissReason, Notification, NotificationEvent, NotificationId};
use parking_lot::Mutex;
use tokio::sync::{broadcast::error::TryRecvError, oneshot};

use crate::{
    AdapterError, CallbackSink, LaunchSignal, ManagerConfig, NativeCallback, NotificationAdapter,
    NotificationCenter, NotificationError, NotificationManager,
};

const USER_CANCELED: u32 = 0;
const APPLICATION_HIDDEN: u32 = 1;
const TIMED_OUT: u32 = 2;

enum Launch {
    Activated(String),
    Silent,
}

#[derive(Default)]
struct Script {
    next_handle: u32,
    rendered: Vec<(u32, Notification)>,
    hidden: Vec<u32>,
    cancelled: Vec<u32>,
    fail_render: Option<AdapterError>,
    fail_hide: Option<AdapterError>,
    fail_init: Option<AdapterError>,
    launch: Option<Launch>,
    pending_launch: Option<oneshot::Sender<String>>,
    shutdowns: usize,
    sink: Option<CallbackSink<ScriptedAdapter>>,
    racing_render: Vec<NativeCallback<u32>>,
    racing_hide: Option<NativeCallback<u32>>,
}

#[derive(Default)]
struct ScriptedAdapter {
    scheduling: bool,
    script: Mutex<Script>,
}

impl ScriptedAdapter {
    fn with_scheduling() -> Self {
        Self {
            scheduling: true,
            ..Self::default()
        }
    }

    fn next_handle(&self, notification: &Notification) -> u32 {
        let (handle, racing, sink) = {
            let mut script = self.script.lock();
            script.next_handle += 1;
            let handle = script.next_handle;
            script.rendered.push((handle, notification.clone()));
            (handle, std::mem::take(&mut script.racing_render), script.sink.clone())
        };

        // Outcomes the platform reports before the manager has registered `handle`.
        if let Some(sink) = sink {
            for callback in racing {
                sink.deliver(&handle, callback);
            }
        }
        handle
    }
}

impl NotificationAdapter for ScriptedAdapter {
    type Handle = u32;

    fn platform(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::BODY_TEXT
    }

    fn supports_scheduling(&self) -> bool {
        self.scheduling
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
        let mut script = self.script.lock();
        if let Some(err) = script.fail_init.take() {
            return Err(err);
        }
        script.sink = Some(sink);

        let (tx, rx) = oneshot::channel();
        match script.launch.take() {
            Some(Launch::Activated(arguments)) => {
                let _ = tx.send(arguments);
                Ok(Some(rx))
            }
            Some(Launch::Silent) => {
                script.pending_launch = Some(tx);
                Ok(Some(rx))
            }
            None => Ok(None),
        }
    }

    async fn render(
        &self,
        notification: &Notification,
        _expiration_time: Option<DateTime<Utc>>,
    ) -> Result<u32, AdapterError> {
        if let Some(err) = self.script.lock().fail_render.take() {
            return Err(err);
        }
        Ok(self.next_handle(notification))
    }

    async fn render_scheduled(
        &self,
        notification: &Notification,
        _delivery_time: DateTime<Utc>,
        _expiration_time: Option<DateTime<Utc>>,
    ) -> Result<u32, AdapterError> {
        if let Some(err) = self.script.lock().fail_render.take() {
            return Err(err);
        }
        Ok(self.next_handle(notification))
    }

    async fn hide(&self, handle: &u32) -> Result<(), AdapterError> {
        let mut script = self.script.lock();
        if let Some(err) = script.fail_hide.take() {
            let racing = script.racing_hide.take();
            let sink = script.sink.clone();
            drop(script);
            if let (Some(callback), Some(sink)) = (racing, sink) {
                sink.deliver(handle, callback);
            }
            return Err(err);
        }
        script.hidden.push(*handle);
        Ok(())
    }

    async fn cancel_schedule(&self, handle: &u32) -> Result<(), AdapterError> {
        self.script.lock().cancelled.push(*handle);
        Ok(())
    }

    fn shutdown(&self) {
        self.script.lock().shutdowns += 1;
    }
}

async fn ready_manager(adapter: ScriptedAdapter) -> NotificationManager<ScriptedAdapter> {
    let manager = NotificationManager::new(adapter, ManagerConfig::default());
    manager.initialize().await.unwrap();
    manager
}

fn build_done() -> Notification {
    Notification::new().with_title("Build").with_body("Done")
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<NotificationEvent>) -> Vec<NotificationEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    events
}

#[tokio::test]
async fn shown_notification_is_dismissed_exactly_once() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut rx = manager.subscribe();

    let id = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(id).unwrap();
    let tracked = manager.shown_notification(&handle).unwrap();
    assert_eq!(tracked.id, id);
    assert_eq!(*tracked.notification, build_done());

    let sink = manager.callback_sink();
    assert!(sink.dismissed(&handle, USER_CANCELED));

    match rx.try_recv().unwrap() {
        NotificationEvent::Dismissed {
            id: event_id,
            notification,
            reason,
        } => {
            assert_eq!(event_id, id);
            assert_eq!(*notification, build_done());
            assert_eq!(reason, DismissReason::User);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(manager.shown_handle(id).is_none());
    assert_eq!(manager.shown_count(), 0);

    assert!(!sink.dismissed(&handle, USER_CANCELED));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn concurrent_duplicate_callbacks_emit_one_event() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut rx = manager.subscribe();

    let id = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(id).unwrap();
    let sink = manager.callback_sink();

    let translated = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let sink = sink.clone();
                scope.spawn(move || sink.dismissed(&handle, TIMED_OUT))
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap_or(false))
            .filter(|translated| *translated)
            .count()
    });

    assert_eq!(translated, 1);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        NotificationEvent::Dismissed {
            reason: DismissReason::Expired,
            ..
        }
    ));
    assert_eq!(manager.shown_count(), 0);
}

#[tokio::test]
async fn every_subscriber_sees_the_event() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut first = manager.subscribe();
    let mut second = manager.subscribe();

    let id = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(id).unwrap();
    manager.callback_sink().activated(&handle, Some("open"));

    for rx in [&mut first, &mut second] {
        match rx.try_recv().unwrap() {
            NotificationEvent::Activated { id: event_id, action_id, .. } => {
                assert_eq!(event_id, id);
                assert_eq!(action_id, "open");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn slow_subscriber_lags_past_event_capacity() {
    let cfg = ManagerConfig {
        event_capacity: 2,
        ..ManagerConfig::default()
    };
    let manager = NotificationManager::new(ScriptedAdapter::default(), cfg);
    manager.initialize().await.unwrap();
    let mut rx = manager.subscribe();
    let sink = manager.callback_sink();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let id = manager.show_notification(build_done(), None).await.unwrap();
        let handle = manager.shown_handle(id).unwrap();
        assert!(sink.dismissed(&handle, USER_CANCELED));
        ids.push(id);
    }

    assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(1))));
    let kept: Vec<_> = drain(&mut rx).iter().map(NotificationEvent::id).collect();
    assert_eq!(kept, ids[1..]);
    assert_eq!(manager.shown_count(), 0);
}

#[tokio::test]
async fn activation_without_arguments_uses_default_action() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut rx = manager.subscribe();
    let sink = manager.callback_sink();

    for arguments in [None, Some("")] {
        let id = manager.show_notification(build_done(), None).await.unwrap();
        let handle = manager.shown_handle(id).unwrap();
        assert!(sink.deliver(
            &handle,
            NativeCallback::Activated {
                arguments: arguments.map(ToOwned::to_owned),
            },
        ));

        match rx.try_recv().unwrap() {
            NotificationEvent::Activated { action_id, .. } => assert_eq!(action_id, "default"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(manager.shown_handle(id).is_none());
    }
}

#[tokio::test]
async fn unrecognized_dismissal_code_maps_to_application() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut rx = manager.subscribe();

    let id = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(id).unwrap();
    assert!(manager.callback_sink().dismissed(&handle, 99));

    match rx.try_recv().unwrap() {
        NotificationEvent::Dismissed { reason, .. } => assert_eq!(reason, DismissReason::Application),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn callback_for_unknown_handle_is_ignored() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut rx = manager.subscribe();
    let sink = manager.callback_sink();

    assert!(!sink.activated(&404, None));
    assert!(!sink.dismissed(&404, USER_CANCELED));
    assert!(!sink.deliver(&404, NativeCallback::Delivered { shown: 405 }));
    assert!(!sink.deliver(&404, NativeCallback::Failed { code: Some(1) }));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn past_expiration_is_rejected_before_rendering() {
    let manager = ready_manager(ScriptedAdapter::default()).await;

    let err = manager
        .show_notification(build_done(), Some(Utc::now() - Duration::minutes(1)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NotificationError::InvalidArgument {
            name: "expiration_time",
            ..
        }
    ));
    assert_eq!(manager.shown_count(), 0);
    assert!(manager.adapter().script.lock().rendered.is_empty());
}

#[tokio::test]
async fn future_expiration_is_accepted() {
    let manager = ready_manager(ScriptedAdapter::default()).await;

    manager
        .show_notification(build_done(), Some(Utc::now() + Duration::minutes(5)))
        .await
        .unwrap();
    assert_eq!(manager.shown_count(), 1);
}

#[tokio::test]
async fn rejected_render_leaves_no_entry() {
    let adapter = ScriptedAdapter::default();
    adapter.script.lock().fail_render = Some(AdapterError::rejected_with_code("toast failed", 0x8007_0490));
    let manager = ready_manager(adapter).await;

    let err = manager.show_notification(build_done(), None).await.unwrap_err();

    assert_eq!(err.error_code(), Some(0x8007_0490));
    assert!(matches!(err, NotificationError::Delivery { .. }));
    assert_eq!(manager.shown_count(), 0);
}

#[tokio::test]
async fn reserved_or_empty_button_ids_are_rejected() {
    let manager = ready_manager(ScriptedAdapter::default()).await;

    for action_id in ["", "default"] {
        let notification = build_done().with_button("Open", action_id);
        let err = manager.show_notification(notification, None).await.unwrap_err();
        assert!(matches!(err, NotificationError::InvalidArgument { name: "notification", .. }));
    }
    assert_eq!(manager.shown_count(), 0);
}

#[tokio::test]
async fn operations_require_initialization() {
    let manager = NotificationManager::new(ScriptedAdapter::default(), ManagerConfig::default());

    let err = manager.show_notification(build_done(), None).await.unwrap_err();
    assert!(matches!(err, NotificationError::Initialization { ref platform, .. } if platform == "scripted"));
    assert!(manager.adapter().script.lock().rendered.is_empty());
}

#[tokio::test]
async fn failed_initialization_is_reported_until_retried() {
    let adapter = ScriptedAdapter::default();
    adapter.script.lock().fail_init = Some(AdapterError::Unavailable {
        message: "no session bus".into(),
    });
    let manager = NotificationManager::new(adapter, ManagerConfig::default());

    let err = manager.initialize().await.unwrap_err();
    assert_eq!(
        err,
        NotificationError::Initialization {
            platform: "scripted".into(),
            message: "notification service unavailable: no session bus".into(),
        }
    );
    assert!(matches!(
        manager.show_notification(build_done(), None).await,
        Err(NotificationError::Initialization { .. })
    ));

    manager.initialize().await.unwrap();
    manager.show_notification(build_done(), None).await.unwrap();
}

#[tokio::test]
async fn launch_activation_is_recorded() {
    let adapter = ScriptedAdapter::default();
    adapter.script.lock().launch = Some(Launch::Activated("reply".into()));
    let manager = ready_manager(adapter).await;

    assert_eq!(manager.launch_action_id(), Some("reply"));
}

#[tokio::test]
async fn empty_launch_arguments_mean_default() {
    let adapter = ScriptedAdapter::default();
    adapter.script.lock().launch = Some(Launch::Activated(String::new()));
    let manager = ready_manager(adapter).await;

    assert_eq!(manager.launch_action_id(), Some("default"));
}

#[tokio::test]
async fn launch_wait_is_bounded() {
    let adapter = ScriptedAdapter::default();
    adapter.script.lock().launch = Some(Launch::Silent);
    let cfg = ManagerConfig {
        launch_wait_ms: 20,
        ..ManagerConfig::default()
    };
    let manager = NotificationManager::new(adapter, cfg);

    tokio::time::timeout(std::time::Duration::from_secs(1), manager.initialize())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(manager.launch_action_id(), None);
}

#[tokio::test]
async fn schedule_validates_delivery_window() {
    let manager = ready_manager(ScriptedAdapter::with_scheduling()).await;
    let now = Utc::now();

    manager
        .schedule_notification(build_done(), now + Duration::hours(1), Some(now + Duration::hours(2)))
        .await
        .unwrap();
    assert_eq!(manager.scheduled_count(), 1);

    let late = now + Duration::hours(2);
    let err = manager
        .schedule_notification(build_done(), late, Some(now + Duration::hours(1)))
        .await
        .unwrap_err();
    assert_eq!(err.delivery_time(), Some(late));

    let past = now - Duration::minutes(1);
    let err = manager
        .schedule_notification(build_done(), past, None)
        .await
        .unwrap_err();
    assert_eq!(err.delivery_time(), Some(past));

    assert_eq!(manager.scheduled_count(), 1);
    assert_eq!(manager.adapter().script.lock().rendered.len(), 1);
}

#[tokio::test]
async fn schedule_without_platform_support_fails_fast() {
    let manager = ready_manager(ScriptedAdapter::default()).await;

    let err = manager
        .schedule_notification(build_done(), Utc::now() + Duration::hours(1), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        NotificationError::UnsupportedOperation {
            operation: "scheduling",
            platform: "scripted".into(),
        }
    );
    assert_eq!(manager.scheduled_count(), 0);
}

#[tokio::test]
async fn delivery_moves_schedule_to_shown() {
    let manager = ready_manager(ScriptedAdapter::with_scheduling()).await;
    let mut rx = manager.subscribe();
    let sink = manager.callback_sink();

    let id = manager
        .schedule_notification(build_done(), Utc::now() + Duration::minutes(1), None)
        .await
        .unwrap();
    let scheduled = manager.scheduled_handle(id).unwrap();
    assert!(manager.scheduled_notification(&scheduled).unwrap().schedule.is_some());

    assert!(!sink.dismissed(&scheduled, USER_CANCELED));
    assert!(sink.deliver(&scheduled, NativeCallback::Delivered { shown: 77 }));
    assert_eq!(manager.scheduled_count(), 0);
    assert_eq!(manager.shown_handle(id), Some(77));
    assert!(drain(&mut rx).is_empty());

    assert!(sink.activated(&77, Some("snooze")));
    match rx.try_recv().unwrap() {
        NotificationEvent::Activated { id: event_id, action_id, .. } => {
            assert_eq!(event_id, id);
            assert_eq!(action_id, "snooze");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn platform_failure_emits_failed_event() {
    let manager = ready_manager(ScriptedAdapter::with_scheduling()).await;
    let mut rx = manager.subscribe();
    let sink = manager.callback_sink();

    let id = manager
        .schedule_notification(build_done(), Utc::now() + Duration::minutes(1), None)
        .await
        .unwrap();
    let handle = manager.scheduled_handle(id).unwrap();

    assert!(sink.deliver(&handle, NativeCallback::Failed { code: Some(-5) }));
    match rx.try_recv().unwrap() {
        NotificationEvent::Failed { id: event_id, error_code, .. } => {
            assert_eq!(event_id, id);
            assert_eq!(error_code, Some(-5));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(manager.scheduled_count(), 0);
}

#[tokio::test]
async fn hide_is_idempotent() {
    let manager = ready_manager(ScriptedAdapter::default()).await;

    manager.hide_notification(NotificationId(999)).await.unwrap();

    let id = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(id).unwrap();
    manager.hide_notification(id).await.unwrap();
    manager.hide_notification(id).await.unwrap();

    assert_eq!(manager.shown_count(), 0);
    assert_eq!(manager.adapter().script.lock().hidden, vec![handle]);
}

#[tokio::test]
async fn hidden_notification_ignores_late_callbacks() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut rx = manager.subscribe();

    let id = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(id).unwrap();
    manager.hide_notification(id).await.unwrap();

    assert!(!manager.callback_sink().dismissed(&handle, APPLICATION_HIDDEN));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn hide_cancels_pending_schedule() {
    let manager = ready_manager(ScriptedAdapter::with_scheduling()).await;

    let id = manager
        .schedule_notification(build_done(), Utc::now() + Duration::hours(1), None)
        .await
        .unwrap();
    let handle = manager.scheduled_handle(id).unwrap();

    manager.hide_notification(id).await.unwrap();

    let script = manager.adapter().script.lock();
    assert_eq!(script.cancelled, vec![handle]);
    assert!(script.hidden.is_empty());
    drop(script);
    assert_eq!(manager.scheduled_count(), 0);
}

#[tokio::test]
async fn rejected_hide_keeps_tracking() {
    let manager = ready_manager(ScriptedAdapter::default()).await;

    let id = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(id).unwrap();
    manager.adapter().script.lock().fail_hide = Some(AdapterError::rejected_with_code("busy", 16));

    let err = manager.hide_notification(id).await.unwrap_err();

    assert_eq!(err.error_code(), Some(16));
    assert_eq!(manager.shown_handle(id), Some(handle));
}

#[tokio::test]
async fn dismissal_before_registration_is_replayed() {
    let adapter = ScriptedAdapter::default();
    adapter.script.lock().racing_render = vec![NativeCallback::Dismissed { code: USER_CANCELED }];
    let manager = ready_manager(adapter).await;
    let mut rx = manager.subscribe();

    let id = manager.show_notification(build_done(), None).await.unwrap();

    assert_eq!(manager.shown_count(), 0);
    assert!(manager.shown_handle(id).is_none());
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        NotificationEvent::Dismissed { id: event_id, reason, .. } => {
            assert_eq!(*event_id, id);
            assert_eq!(*reason, DismissReason::User);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert!(!manager.callback_sink().dismissed(&1, USER_CANCELED));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn early_delivery_registers_schedule_as_shown() {
    let adapter = ScriptedAdapter::with_scheduling();
    adapter.script.lock().racing_render = vec![NativeCallback::Delivered { shown: 40 }];
    let manager = ready_manager(adapter).await;
    let mut rx = manager.subscribe();

    let id = manager
        .schedule_notification(build_done(), Utc::now() + Duration::minutes(1), None)
        .await
        .unwrap();

    assert_eq!(manager.scheduled_count(), 0);
    assert_eq!(manager.shown_handle(id), Some(40));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn early_delivery_then_expiry_ends_schedule() {
    let adapter = ScriptedAdapter::with_scheduling();
    adapter.script.lock().racing_render = vec![
        NativeCallback::Delivered { shown: 1 },
        NativeCallback::Dismissed { code: TIMED_OUT },
    ];
    let manager = ready_manager(adapter).await;
    let mut rx = manager.subscribe();

    let id = manager
        .schedule_notification(build_done(), Utc::now() + Duration::minutes(1), None)
        .await
        .unwrap();

    assert_eq!(manager.scheduled_count(), 0);
    assert_eq!(manager.shown_count(), 0);
    match rx.try_recv().unwrap() {
        NotificationEvent::Dismissed { id: event_id, reason, .. } => {
            assert_eq!(event_id, id);
            assert_eq!(reason, DismissReason::Expired);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn dismissal_during_rejected_hide_is_not_lost() {
    let manager = ready_manager(ScriptedAdapter::default()).await;
    let mut rx = manager.subscribe();

    let id = manager.show_notification(build_done(), None).await.unwrap();
    {
        let mut script = manager.adapter().script.lock();
        script.fail_hide = Some(AdapterError::rejected("busy"));
        script.racing_hide = Some(NativeCallback::Dismissed { code: USER_CANCELED });
    }

    assert!(manager.hide_notification(id).await.is_err());

    assert!(manager.shown_handle(id).is_none());
    match rx.try_recv().unwrap() {
        NotificationEvent::Dismissed { id: event_id, reason, .. } => {
            assert_eq!(event_id, id);
            assert_eq!(reason, DismissReason::User);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn delivery_onto_tracked_handle_fails_the_schedule() {
    let manager = ready_manager(ScriptedAdapter::with_scheduling()).await;
    let mut rx = manager.subscribe();
    let sink = manager.callback_sink();

    let shown = manager.show_notification(build_done(), None).await.unwrap();
    let shown_handle = manager.shown_handle(shown).unwrap();
    let scheduled = manager
        .schedule_notification(build_done(), Utc::now() + Duration::minutes(1), None)
        .await
        .unwrap();
    let scheduled_handle = manager.scheduled_handle(scheduled).unwrap();

    assert!(sink.deliver(&scheduled_handle, NativeCallback::Delivered { shown: shown_handle }));

    assert_eq!(manager.scheduled_count(), 0);
    assert_eq!(manager.shown_handle(shown), Some(shown_handle));
    match rx.try_recv().unwrap() {
        NotificationEvent::Failed { id, error_code, .. } => {
            assert_eq!(id, scheduled);
            assert_eq!(error_code, None);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn dispose_drops_tracking_without_hiding() {
    let manager = ready_manager(ScriptedAdapter::with_scheduling()).await;
    let mut rx = manager.subscribe();

    let shown = manager.show_notification(build_done(), None).await.unwrap();
    let handle = manager.shown_handle(shown).unwrap();
    manager
        .schedule_notification(build_done(), Utc::now() + Duration::hours(1), None)
        .await
        .unwrap();

    manager.dispose();

    assert_eq!(manager.shown_count(), 0);
    assert_eq!(manager.scheduled_count(), 0);
    {
        let script = manager.adapter().script.lock();
        assert!(script.hidden.is_empty());
        assert!(script.cancelled.is_empty());
        assert_eq!(script.shutdowns, 1);
    }

    assert!(!manager.callback_sink().dismissed(&handle, USER_CANCELED));
    assert!(drain(&mut rx).is_empty());
    assert_eq!(
        manager.show_notification(build_done(), None).await.unwrap_err(),
        NotificationError::Disposed
    );
    manager.hide_notification(shown).await.unwrap();
}

#[tokio::test]
async fn ids_are_unique_per_notification() {
    let manager = ready_manager(ScriptedAdapter::default()).await;

    let a = manager.show_notification(build_done(), None).await.unwrap();
    let b = manager.show_notification(build_done(), None).await.unwrap();

    assert_ne!(a, b);
    assert_eq!(manager.shown_count(), 2);
    assert_ne!(manager.shown_handle(a), manager.shown_handle(b));
}
