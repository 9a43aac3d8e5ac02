//! Turns a countdown delta into a badge label and an urgency flag.

use chrono::Duration;

/// What the badge surface renders.
///
/// The engine only ever emits this pair; color and any other severity
/// styling belong to the consuming surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub urgent: bool,
}

/// Formats a countdown delta.
///
/// Hours and minutes are floored, never rounded. The terse form is sized
/// for a badge (`"1:05"`, `"7"`, `"0"`); the verbose form suits expanded
/// views (`"1h 5m"`, `"7m"`). `urgent` is true when fewer than
/// `urgency_threshold_minutes` whole minutes remain.
pub fn format(delta: Duration, urgency_threshold_minutes: i64, verbose: bool) -> Badge {
    let total_minutes = delta.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let label = if verbose {
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    } else if hours > 0 {
        format!("{hours}:{minutes:02}")
    } else if minutes > 0 {
        format!("{minutes}")
    } else {
        "0".to_string()
    };

    Badge {
        label,
        urgent: total_minutes < urgency_threshold_minutes,
    }
}
