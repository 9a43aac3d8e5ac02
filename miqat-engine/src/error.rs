//! Error types for the miqat engine.
//!
//! Everything here is local and recoverable: the worst outcome anywhere in
//! the engine is a cleared badge, never a crash. "No next event yet" is not
//! an error at all — the resolver models it as an explicit state instead.

use chrono::NaiveDate;

/// Errors building a day schedule.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Neither today nor the lookahead day carries a single usable event.
    #[error("no usable prayer events for today or tomorrow")]
    Incomplete,
}

/// Errors reading a persisted schedule record back.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The stored freshness key does not match the current local date.
    /// Recomputation is the caller's job, not the codec's.
    #[error("stored schedule is for {stored}, today is {today}")]
    Stale { stored: NaiveDate, today: NaiveDate },

    /// A required field is absent from the record.
    #[error("record is missing field `{0}`")]
    MissingField(&'static str),

    /// A field that must hold a calendar date could not be parsed.
    #[error("record field `{field}` is not a calendar date: {raw}")]
    BadDate { field: &'static str, raw: String },
}

/// Errors awaiting a response from the other execution context.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The responder did not answer within the shared timeout.
    #[error("request timed out")]
    TimedOut,

    /// The responder went away without answering.
    #[error("responder dropped without answering")]
    Closed,
}
