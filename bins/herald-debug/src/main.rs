use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use herald_core::{
    ManagerConfig, NotificationAdapter, NotificationCenter, NotificationManager, default_config_path,
    load_or_default,
};
use herald_freedesktop::{FreedesktopAdapter, FreedesktopConfig};
use herald_loopback::{LoopbackAdapter, LoopbackConfig};
use herald_types::Notification;
use serde::Deserialize;
use tokio::{signal, sync::broadcast::error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Backend {
    #[default]
    Freedesktop,
    Loopback,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AppConfig {
    backend: Backend,
    manager: ManagerConfig,
    freedesktop: FreedesktopConfig,
    loopback: LoopbackConfig,
}

async fn run<A: NotificationAdapter>(manager: NotificationManager<A>) -> Result<()> {
    manager
        .initialize()
        .await
        .with_context(|| format!("failed to initialize {} backend", manager.platform()))?;

    info!(
        platform = manager.platform(),
        capabilities = ?manager.capabilities(),
        launch_action_id = ?manager.launch_action_id(),
        "herald-debug ready"
    );

    let mut events = manager.subscribe();
    let event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(id = %event.id(), ?event, "notification event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event subscriber lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let notification = Notification::new()
        .with_title("herald-debug")
        .with_body("Click, dismiss, or wait a minute for this notification to expire.")
        .with_button("Acknowledge", "ack");
    let id = manager
        .show_notification(notification, Some(Utc::now() + Duration::minutes(1)))
        .await
        .context("failed to show notification")?;
    info!(%id, "notification shown");

    info!("press Ctrl+C to stop");
    signal::ctrl_c().await?;

    manager.dispose();
    event_task.abort();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("herald_debug=info".parse()?)
                .add_directive("herald_core=info".parse()?),
        )
        .init();

    let cfg: AppConfig = load_or_default(&default_config_path());
    match cfg.backend {
        Backend::Freedesktop => {
            run(NotificationManager::new(
                FreedesktopAdapter::new(cfg.freedesktop),
                cfg.manager,
            ))
            .await
        }
        Backend::Loopback => {
            run(NotificationManager::new(
                LoopbackAdapter::new(cfg.loopback),
                cfg.manager,
            ))
            .await
        }
    }
}
