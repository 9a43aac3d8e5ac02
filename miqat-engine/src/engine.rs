//! The engine that orchestrates countdown resolution across both execution
//! contexts.

use crate::codec;
use crate::common::{ListenerId, BADGE_ALARM, SCHEDULE_KEY};
use crate::config::MiqatConfig;
use crate::countdown;
use crate::error::RecordError;
use crate::events::{BadgeEvent, ScheduleEvent, SystemEvent, TickEvent};
use crate::host::HostScheduler;
use crate::resolver::{self, ResolvedState};
use crate::schedule::DaySchedule;
use crate::services::CalculationService;
use crate::store::RecordStore;
use crate::sync::{TimerPhase, TimerSync};
use anyhow::Context;
use chrono::{DateTime, Utc};
use slotmap::SlotMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, trace, warn};

/// A callback invoked with every badge publication.
pub type BadgeListener = Box<dyn FnMut(&BadgeEvent) + Send + Sync>;

/// The main miqat engine.
///
/// This struct is the central point of control. It holds the configuration,
/// owns the event streams and the timer synchronizer, and drives the
/// dispatcher loop. The engine is designed to be cloned and shared across
/// tasks, providing a handle to the running instance.
#[derive(Clone)]
pub struct MiqatEngine {
    config: Arc<MiqatConfig>,
    store: Arc<dyn RecordStore>,
    scheduler: Arc<dyn HostScheduler>,
    calculator: Arc<dyn CalculationService>,
    sync: Arc<TimerSync>,
    tick_sender: broadcast::Sender<TickEvent>,
    badge_sender: broadcast::Sender<BadgeEvent>,
    schedule_sender: broadcast::Sender<ScheduleEvent>,
    system_sender: broadcast::Sender<SystemEvent>,
    badge_listeners: Arc<RwLock<SlotMap<ListenerId, BadgeListener>>>,
}

// Core implementation block for internal logic.
impl MiqatEngine {
    /// Creates a new `MiqatEngine` wired to its collaborators.
    pub fn new(
        config: MiqatConfig,
        store: Arc<dyn RecordStore>,
        scheduler: Arc<dyn HostScheduler>,
        calculator: Arc<dyn CalculationService>,
    ) -> Self {
        const CHANNEL_CAPACITY: usize = 64;
        let (tick_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (badge_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (schedule_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (system_sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        let sync = Arc::new(TimerSync::new(
            config.refresh_period_secs,
            Arc::clone(&scheduler),
        ));

        Self {
            config: Arc::new(config),
            store,
            scheduler,
            calculator,
            sync,
            tick_sender,
            badge_sender,
            schedule_sender,
            system_sender,
            badge_listeners: Arc::new(RwLock::new(SlotMap::with_key())),
        }
    }

    /// Runs the engine until a shutdown signal is received.
    ///
    /// This method will:
    /// 1. Start the aligned foreground tick loop.
    /// 2. Register the background badge alarm on the same phase.
    /// 3. Spawn the dispatcher task that reacts to ticks, wakes and store
    ///    changes.
    /// 4. Wait for a Ctrl+C signal to initiate a graceful shutdown.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("miqat engine starting up...");
        let (shutdown_tx, _) = broadcast::channel(1);

        let tick_tx = self.tick_sender.clone();
        let mut tick_count: u64 = 0;
        self.sync.start_foreground(move || {
            tick_count += 1;
            tick_tx
                .send(TickEvent {
                    at: Utc::now(),
                    tick_count,
                })
                .ok();
        });
        self.sync.realign_alarm(Utc::now());

        let dispatcher = self.clone();
        let dispatcher_shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { dispatcher.dispatcher_loop(dispatcher_shutdown_rx).await });

        info!(
            "engine running with a {}s refresh period. Press Ctrl+C to shut down.",
            self.sync.period_secs()
        );
        tokio::signal::ctrl_c().await?;

        info!("shutdown signal received");
        shutdown_tx.send(()).ok();
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.sync.stop_foreground();
        self.scheduler.cancel(BADGE_ALARM);
        self.system_sender.send(SystemEvent::EngineShutdown).ok();
        info!("miqat engine has shut down");
        Ok(())
    }

    #[doc(hidden)]
    async fn dispatcher_loop(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut tick_rx = self.tick_sender.subscribe();
        let mut wake_rx = self.scheduler.subscribe_wakes();
        let mut change_rx = self.store.subscribe_changes();
        self.system_sender
            .send(SystemEvent::EngineStarted { at: Utc::now() })
            .ok();
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                Ok(tick) = tick_rx.recv() => {
                    trace!("tick #{} received", tick.tick_count);
                    self.publish_badge(tick.at).await;
                }
                Ok(wake) = wake_rx.recv() => {
                    if wake.name == BADGE_ALARM {
                        self.handle_alarm(wake.at).await;
                    }
                }
                Ok(change) = change_rx.recv() => {
                    if change.keys.iter().any(|key| key == SCHEDULE_KEY) {
                        self.publish_badge(Utc::now()).await;
                    }
                }
            }
        }
    }

    // A background wake runs to completion and exits: re-check freshness,
    // recompute when the day has rolled over, then republish.
    async fn handle_alarm(&self, now: DateTime<Utc>) {
        let today = self.config.local_date(now);
        match self.stored_schedule() {
            Some(decoded) => {
                if let Err(RecordError::Stale { stored, today }) =
                    codec::ensure_fresh(&decoded.schedule, today)
                {
                    self.schedule_sender
                        .send(ScheduleEvent::Stale { stored, today })
                        .ok();
                    if let Err(error) = self.refresh(now).await {
                        warn!("scheduled refresh failed: {error:#}");
                    }
                    return;
                }
            }
            None => {
                if let Err(error) = self.refresh(now).await {
                    warn!("scheduled refresh failed: {error:#}");
                }
                return;
            }
        }
        self.publish_badge(now).await;
    }

    fn stored_schedule(&self) -> Option<codec::Decoded> {
        let record = self.store.get(SCHEDULE_KEY)?;
        match codec::decode(&record) {
            Ok(decoded) => {
                if !decoded.malformed.is_empty() {
                    warn!(
                        "{} stored field(s) could not be reconstructed",
                        decoded.malformed.len()
                    );
                }
                Some(decoded)
            }
            Err(error) => {
                warn!("stored schedule is unreadable: {error}");
                None
            }
        }
    }
}

// Public API implementation block.
impl MiqatEngine {
    /// Recomputes today's and tomorrow's schedule through the calculation
    /// service, persists the whole record, realigns the background alarm to
    /// the current phase and republishes the badge.
    pub async fn refresh(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let config = &self.config;
        let today = config.local_date(now);
        let next_day = today.succ_opt().context("calendar date overflow")?;

        let today_times =
            self.calculator
                .calculate(&config.location, today, config.method, config.asr_school)?;
        let tomorrow_times = self.calculator.calculate(
            &config.location,
            next_day,
            config.method,
            config.asr_school,
        )?;

        let lookahead = DaySchedule::from_parts(
            next_day,
            tomorrow_times.into_iter().map(|(name, at)| (name, Some(at))),
            None,
        )
        .ok();
        let schedule = DaySchedule::from_parts(
            today,
            today_times.into_iter().map(|(name, at)| (name, Some(at))),
            lookahead,
        )?;

        self.store.set(SCHEDULE_KEY, codec::encode(&schedule));
        self.schedule_sender
            .send(ScheduleEvent::Refreshed {
                date: schedule.date,
            })
            .ok();
        self.sync.realign_alarm(now);
        self.publish_badge(now).await;
        Ok(())
    }

    /// Resolves the stored schedule against `now` and publishes the badge.
    ///
    /// A missing record, a stale record and an unresolvable schedule all
    /// clear the surface rather than failing.
    pub async fn publish_badge(&self, now: DateTime<Utc>) -> BadgeEvent {
        let event = match self.resolved_state(now) {
            ResolvedState::Resolved(resolution) => BadgeEvent {
                badge: Some(countdown::format(
                    resolution.remaining,
                    self.config.urgency_threshold_minutes,
                    false,
                )),
                next: Some(resolution.next),
                at: now,
            },
            ResolvedState::Unresolved => BadgeEvent {
                badge: None,
                next: None,
                at: now,
            },
        };

        self.badge_sender.send(event.clone()).ok();
        let mut listeners = self.badge_listeners.write().await;
        for (_id, listener) in listeners.iter_mut() {
            listener(&event);
        }
        event
    }

    /// Resolves the stored schedule against `now` without publishing.
    pub fn resolved_state(&self, now: DateTime<Utc>) -> ResolvedState {
        let today = self.config.local_date(now);
        match self.stored_schedule() {
            Some(decoded) if codec::ensure_fresh(&decoded.schedule, today).is_ok() => {
                resolver::resolve(&decoded.schedule, now)
            }
            _ => ResolvedState::Unresolved,
        }
    }

    /// Re-aligns the background alarm to the foreground phase.
    pub fn realign(&self, now: DateTime<Utc>) {
        self.sync.realign_alarm(now);
    }

    /// The phase both timers are currently aligned to.
    pub fn timer_phase(&self, now: DateTime<Utc>) -> TimerPhase {
        self.sync.phase(now)
    }

    pub fn config(&self) -> &MiqatConfig {
        &self.config
    }

    /// Registers a badge listener to be invoked on every publication.
    ///
    /// # Returns
    /// A `ListenerId` which can be used to later remove this listener.
    pub async fn on_badge(
        &self,
        listener: impl FnMut(&BadgeEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self
            .badge_listeners
            .write()
            .await
            .insert(Box::new(listener));
        self.system_sender
            .send(SystemEvent::ListenerAdded { id })
            .ok();
        id
    }

    /// Removes a badge listener from the engine.
    ///
    /// Returns `true` if the listener was found and removed.
    pub async fn remove_badge_listener(&self, id: ListenerId) -> bool {
        let was_removed = self.badge_listeners.write().await.remove(id).is_some();
        if was_removed {
            self.system_sender
                .send(SystemEvent::ListenerRemoved { id })
                .ok();
        }
        was_removed
    }

    /// Subscribes to the `TickEvent` stream.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<TickEvent> {
        self.tick_sender.subscribe()
    }

    /// Subscribes to the `BadgeEvent` stream.
    pub fn subscribe_badge_events(&self) -> broadcast::Receiver<BadgeEvent> {
        self.badge_sender.subscribe()
    }

    /// Subscribes to the `ScheduleEvent` stream.
    pub fn subscribe_schedule_events(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.schedule_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_sender.subscribe()
    }
}
