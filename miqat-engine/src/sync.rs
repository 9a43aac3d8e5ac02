//! Dual-timer synchronization.
//!
//! Two independently scheduled triggers drive the countdown: a fast
//! foreground refresh loop and a coarse background alarm owned by the host.
//! Left alone they drift apart by up to one period; this module keeps both
//! firing on the same wall-clock boundary.

use crate::common::BADGE_ALARM;
use crate::host::HostScheduler;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Background scheduling state: a fixed period phase-aligned to a
/// wall-clock anchor. Recomputed whenever the foreground reports its phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPhase {
    pub period_secs: u64,
    /// The epoch second of the boundary the period is aligned to.
    pub anchor_epoch_secs: i64,
}

/// Time until the next period boundary shared by both contexts.
///
/// With the default 15-second period every context fires at :00, :15, :30
/// and :45 of each minute. At an exact boundary the delay is one full
/// period, never zero.
pub fn aligned_delay(now: DateTime<Utc>, period_secs: u64) -> Duration {
    let period = period_secs.max(1) as i64;
    let into_period = now.timestamp().rem_euclid(period);
    Duration::from_secs((period - into_period) as u64)
}

/// Owns the foreground tick loop and the background alarm registration.
///
/// Both triggers live under fixed logical names; re-starting either cancels
/// the previous instance first, so duplicate concurrent timers cannot
/// exist.
pub struct TimerSync {
    period_secs: u64,
    scheduler: Arc<dyn HostScheduler>,
    foreground: Mutex<Option<JoinHandle<()>>>,
}

impl TimerSync {
    pub fn new(period_secs: u64, scheduler: Arc<dyn HostScheduler>) -> Self {
        Self {
            period_secs,
            scheduler,
            foreground: Mutex::new(None),
        }
    }

    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }

    /// The phase the background alarm aligns to, anchored at the boundary
    /// `now` belongs to.
    pub fn phase(&self, now: DateTime<Utc>) -> TimerPhase {
        let period = self.period_secs.max(1) as i64;
        TimerPhase {
            period_secs: self.period_secs,
            anchor_epoch_secs: now.timestamp() - now.timestamp().rem_euclid(period),
        }
    }

    /// Starts the cooperative foreground loop, cancelling any previous one.
    ///
    /// `on_tick` runs to completion before the next boundary is awaited; a
    /// slow tick delays but never overlaps the following one.
    pub fn start_foreground(&self, mut on_tick: impl FnMut() + Send + 'static) {
        let period = self.period_secs;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(aligned_delay(Utc::now(), period)).await;
                on_tick();
            }
        });

        let mut slot = self.foreground.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
            debug!("foreground loop restarted; previous instance cancelled");
        }
    }

    /// Stops the foreground loop. Safe to call when none is running.
    pub fn stop_foreground(&self) {
        let taken = self
            .foreground
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = taken {
            handle.abort();
        }
    }

    /// Cancels and re-registers the background badge alarm so its first
    /// fire lands on the next shared boundary and repeats every period.
    ///
    /// Called on startup and whenever the foreground surface reports a
    /// fresh countdown update, so a background context woken later
    /// re-synchronizes its phase instead of drifting.
    pub fn realign_alarm(&self, now: DateTime<Utc>) {
        let delay = aligned_delay(now, self.period_secs);
        self.scheduler.cancel(BADGE_ALARM);
        self.scheduler
            .schedule_repeating(BADGE_ALARM, delay, Duration::from_secs(self.period_secs));
    }
}
