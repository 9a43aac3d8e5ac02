//! Defines the event types broadcast by the miqat engine.
//!
//! This module acts as the public API for the engine's event system.
//! Listeners subscribe to these specific, strongly-typed events to perform
//! their work.

use crate::common::ListenerId;
use crate::countdown::Badge;
use crate::schedule::PrayerName;
use chrono::{DateTime, NaiveDate, Utc};

/// One beat of the foreground refresh loop.
#[derive(Debug, Clone)]
pub struct TickEvent {
    pub at: DateTime<Utc>,
    pub tick_count: u64,
}

/// A background wake-up delivered by the host scheduler.
#[derive(Debug, Clone)]
pub struct WakeEvent {
    /// The logical name of the trigger that fired.
    pub name: String,
    pub at: DateTime<Utc>,
}

/// Emitted by a record store after a write, naming the keys that changed.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub keys: Vec<String>,
}

/// The badge surface payload.
///
/// `badge: None` clears the surface — the normal outcome for a missing or
/// stale record and for an unresolvable schedule.
#[derive(Debug, Clone)]
pub struct BadgeEvent {
    pub badge: Option<Badge>,
    /// The prayer the countdown runs toward, when one is resolvable.
    pub next: Option<PrayerName>,
    pub at: DateTime<Utc>,
}

/// Events about the persisted day schedule.
#[derive(Debug, Clone)]
pub enum ScheduleEvent {
    /// A freshly calculated schedule was persisted.
    Refreshed { date: NaiveDate },
    /// The persisted schedule no longer matches the local calendar date.
    Stale { stored: NaiveDate, today: NaiveDate },
}

/// Events related to the lifecycle and state of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's dispatcher loop begins.
    EngineStarted { at: DateTime<Utc> },
    /// Fired once when the engine's `run` loop is about to exit.
    EngineShutdown,
    /// Fired when a new badge listener is added to the engine.
    ListenerAdded { id: ListenerId },
    /// Fired when a badge listener is removed from the engine.
    ListenerRemoved { id: ListenerId },
}
