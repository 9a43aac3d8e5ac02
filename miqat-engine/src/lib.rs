//! # Miqat
//!
//! A next-event resolution and countdown synchronization engine for daily
//! prayer schedules.
//!
//! Miqat tracks one calendar day's prayer events, continuously answers
//! "which event is active and how long until the next one", and keeps two
//! independently scheduled surfaces — a fast foreground refresh loop and a
//! coarse host-driven background alarm — ticking on the same wall-clock
//! boundary so their countdowns never drift apart.
//!
//! ## Core concepts
//!
//! - **DaySchedule**: one calendar day's named events plus an optional
//!   lookahead at the day after, treated as an immutable snapshot.
//! - **Resolver**: a pure function from (schedule, now) to the currently
//!   running prayer, the next one, and the remaining time — rolling over to
//!   tomorrow's Fajr after the last prayer of the day.
//! - **Dual-timer sync**: both refresh triggers are phase-aligned to the
//!   same sub-minute boundary; re-registering a trigger always cancels its
//!   predecessor first.
//! - **Round-trip codec**: the schedule survives a schema-less plain-data
//!   store, with instants sniffed back out of strings on the way in.
//!
//! ## Example usage
//!
//! ```rust,no_run
//! use miqat::prelude::*;
//! use miqat::services::FixedTimetable;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Create a configuration (or load one with `config::from_file`).
//!     let config = MiqatConfig::default();
//!     let timezone = config.timezone;
//!
//!     // 2. Wire the engine to its collaborators.
//!     let engine = MiqatEngine::new(
//!         config,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(TokioScheduler::new()),
//!         Arc::new(FixedTimetable::standard(timezone)),
//!     );
//!
//!     // 3. Subscribe to the badge stream before starting the engine.
//!     let mut badge_rx = engine.subscribe_badge_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = badge_rx.recv().await {
//!             println!("badge: {:?}", event.badge);
//!         }
//!     });
//!
//!     // 4. Compute today's schedule, then run. Shuts down on Ctrl+C.
//!     engine.refresh(chrono::Utc::now()).await?;
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Miqat Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod codec;
pub mod common;
pub mod config;
pub mod countdown;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod resolver;
pub mod schedule;
pub mod services;
pub mod store;
pub mod sync;

/// A prelude module for easy importing of the most common miqat types.
pub mod prelude {
    pub use crate::common::ListenerId;
    pub use crate::config::{AsrSchool, CalculationMethod, Location, MiqatConfig};
    pub use crate::countdown::Badge;
    pub use crate::engine::MiqatEngine;
    pub use crate::events::{BadgeEvent, ScheduleEvent, SystemEvent, TickEvent};
    pub use crate::host::{HostScheduler, TokioScheduler};
    pub use crate::resolver::{Resolution, ResolvedState};
    pub use crate::schedule::{DaySchedule, PrayerName};
    pub use crate::store::{MemoryStore, RecordStore};
    pub use crate::sync::{aligned_delay, TimerPhase, TimerSync};
}
