//! Common primitive types and shared constants.
//!
//! This module defines the basic ID type used to identify badge listeners
//! and the handful of names and defaults shared by both execution contexts.
//! Using distinct key types improves type safety and code clarity.

use slotmap::new_key_type;

new_key_type! {
    /// Uniquely and safely identifies a registered badge listener within the
    /// engine.
    ///
    /// This key is returned when a listener is added. It is guaranteed to be
    /// unique and will not be reused, preventing stale ID bugs.
    pub struct ListenerId;
}

/// Logical name of the background badge alarm.
///
/// Registering a periodic trigger under this name always cancels the previous
/// registration first, so two concurrent alarms can never share it.
pub const BADGE_ALARM: &str = "badge-update";

/// Storage key of the persisted day schedule record.
pub const SCHEDULE_KEY: &str = "prayer-schedule";

/// Default refresh period, in seconds, shared by the foreground tick loop and
/// the background alarm. Both fire on the same wall-clock boundaries.
pub const DEFAULT_PERIOD_SECS: u64 = 15;

/// Default countdown urgency threshold, in minutes.
pub const DEFAULT_URGENCY_MINUTES: i64 = 10;

/// Timeout guarding any request that crosses an execution-context boundary.
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
