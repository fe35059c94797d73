use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use keyward::event::KeywardEvent;
use keyward::notify::NotificationLayer;
use keyward::{
    Config, ConfigManager, DEFAULT_LOG_LEVEL, GlobalHotkeyBackend, HotkeyBackend, ImportReport,
    LOG_ENV, ShortcutRegistry, VERSION, shutdown,
};
use parking_lot::Mutex;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How often the config file is checked for edits.
const RELOAD_INTERVAL: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    // Initialize the logger
    let notifications = NotificationLayer::new();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .finish()
        .with(notifications.clone())
        .init();

    // Load config
    let config_manager = ConfigManager::new()?;
    let mut config = config_manager.load()?;
    notifications.set_enabled(config.notifications);
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config)?;

    let event_loop: EventLoop<KeywardEvent> = EventLoopBuilder::with_user_event().build();
    let event_sender = Mutex::new(event_loop.create_proxy());

    // SIGINT/SIGTERM leave the loop through the normal shutdown path
    let shutdown_sender = event_loop.create_proxy();
    ctrlc::set_handler(move || {
        shutdown_sender.send_event(KeywardEvent::Shutdown).ok();
    })
    .context("Failed to install signal handler")?;

    // Set up the registry and claim the configured shortcuts
    let registry = ShortcutRegistry::new(build_backend(&config)?);
    registry.on_trigger(move |event| {
        event_sender
            .lock()
            .send_event(KeywardEvent::Triggered(event.clone()))
            .ok();
    });
    log_import(&registry.import(config.shortcuts.clone()));

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + RELOAD_INTERVAL);

        match event {
            Event::NewEvents(StartCause::Init) => {
                info!(version = VERSION, path = ?config_manager.config_path(), "Keyward ready");
            }
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                match config_manager.reload(&mut config) {
                    Ok(true) => {
                        info!("Config changed, reloading shortcuts");
                        notifications.set_enabled(config.notifications);
                        log_import(&registry.import(config.shortcuts.clone()));
                    }
                    Ok(false) => {}
                    Err(e) => error!("Failed to reload config: {:?}", e),
                }
            }
            Event::UserEvent(KeywardEvent::Triggered(event)) => {
                info!(
                    id = %event.id,
                    action = %event.action,
                    accelerator = %event.accelerator,
                    "shortcut-triggered"
                );
            }
            Event::UserEvent(KeywardEvent::Shutdown) => {
                info!("Termination requested");
                *control_flow = ControlFlow::Exit;
            }
            Event::LoopDestroyed => {
                if let Err(e) = shutdown(&registry, &config_manager, &mut config) {
                    error!("{:?}", e);
                }
            }
            _ => {}
        }
    });
}

fn log_import(report: &ImportReport) {
    for id in &report.unclaimed {
        warn!(%id, "Shortcut is taken by another application, left unclaimed");
    }
    for (id, err) in &report.skipped {
        warn!(%id, error = %err, "Shortcut skipped");
    }
    info!(count = report.count, "Shortcuts loaded");
}

/// The OS backend, bounded by the configured timeout where the platform lets
/// the hotkey manager live off the main thread.
#[cfg(target_os = "linux")]
fn build_backend(config: &Config) -> Result<Box<dyn HotkeyBackend>> {
    match config.claim_timeout() {
        Some(timeout) => {
            let backend = keyward::BoundedBackend::spawn(GlobalHotkeyBackend::new, timeout)
                .context("Failed to start hotkey backend")?;
            Ok(Box::new(backend))
        }
        None => Ok(Box::new(
            GlobalHotkeyBackend::new().context("Failed to create hotkey manager")?,
        )),
    }
}

#[cfg(not(target_os = "linux"))]
fn build_backend(_config: &Config) -> Result<Box<dyn HotkeyBackend>> {
    // The hotkey manager must stay on the thread that runs the event loop.
    Ok(Box::new(
        GlobalHotkeyBackend::new().context("Failed to create hotkey manager")?,
    ))
}
