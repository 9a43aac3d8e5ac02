use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use miqat::prelude::*;
use miqat::services::FixedTimetable;
use miqat::ENGINE_NAME;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    // 2. Build a configuration for the engine.
    let config = MiqatConfig::default();
    let timezone = config.timezone;
    info!(
        "{} for {} ({}, {})",
        ENGINE_NAME.cyan(),
        config.location.label(),
        config.method.display_name(),
        timezone
    );

    // 3. Wire the engine to in-process collaborators.
    let engine = MiqatEngine::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(TokioScheduler::new()),
        Arc::new(FixedTimetable::standard(timezone)),
    );

    // 4. Spawn concurrent tasks to listen to the event streams.
    spawn_event_listeners(&engine);

    // 5. Register a badge listener to exercise the callback registry.
    register_badge_printer(&engine).await;

    // 6. Compute today's schedule, then run. Shuts down on Ctrl+C.
    engine.refresh(Utc::now()).await?;
    engine.run().await?;

    Ok(())
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &MiqatEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut schedule_rx = engine.subscribe_schedule_events();
    tokio::spawn(async move {
        while let Ok(event) = schedule_rx.recv().await {
            info!("[SCHEDULE] => {:?}", event);
        }
    });

    let mut badge_rx = engine.subscribe_badge_events();
    tokio::spawn(async move {
        while let Ok(event) = badge_rx.recv().await {
            match (&event.badge, event.next) {
                (Some(badge), Some(next)) if badge.urgent => {
                    info!("[BADGE] => {} until {}", badge.label.red().bold(), next);
                }
                (Some(badge), Some(next)) => {
                    info!("[BADGE] => {} until {}", badge.label.green(), next);
                }
                _ => info!("[BADGE] => cleared"),
            }
        }
    });
}

/// Registers a badge listener with the engine to demonstrate the registry.
async fn register_badge_printer(engine: &MiqatEngine) {
    let _listener_id = engine
        .on_badge(|event| {
            if let Some(badge) = &event.badge {
                tracing::debug!("[LISTENER] badge is now {}", badge.label);
            }
        })
        .await;
}
