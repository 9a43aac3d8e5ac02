//! Resolves which event is currently active and which comes next.
//!
//! Resolution is a pure function over an immutable schedule snapshot and a
//! point in time. Replaying it with a stale `now` is harmless; at worst the
//! caller displays a momentarily stale countdown.

use crate::schedule::{DaySchedule, PrayerName};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Reverse;

/// The outcome of resolving a schedule against a point in time.
///
/// "No next event yet" is a normal transient condition, not an error, so it
/// is a state here rather than a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedState {
    Resolved(Resolution),
    /// Neither today nor tomorrow can supply an upcoming prayer.
    Unresolved,
}

impl ResolvedState {
    pub fn resolution(&self) -> Option<&Resolution> {
        match self {
            ResolvedState::Resolved(resolution) => Some(resolution),
            ResolvedState::Unresolved => None,
        }
    }
}

/// A derived snapshot; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The prayer whose interval contains `now`: it has started and the next
    /// one has not. `None` before the first prayer of the day.
    pub current: Option<PrayerName>,
    /// The soonest strictly-future prayer event.
    pub next: PrayerName,
    pub next_at: DateTime<Utc>,
    /// Time from `now` until `next_at`, clamped to zero.
    pub remaining: Duration,
}

/// Computes the currently-active and next upcoming prayer for `now`.
///
/// Today's prayers are filtered (sunrise excluded) and sorted ascending
/// before scanning — upstream ordering is not trusted. Past the last prayer
/// of the day, the countdown rolls over to tomorrow's Fajr.
pub fn resolve(schedule: &DaySchedule, now: DateTime<Utc>) -> ResolvedState {
    let mut prayers: Vec<(PrayerName, DateTime<Utc>)> = schedule.prayers().collect();
    prayers.sort_by_key(|&(name, at)| (at, name));

    // Among started prayers the running one is the latest by timestamp;
    // equal timestamps tie-break to the earlier canonical name.
    let current = prayers
        .iter()
        .filter(|&&(_, at)| at <= now)
        .max_by_key(|&&(name, at)| (at, Reverse(name)))
        .map(|&(name, _)| name);

    if let Some(&(name, at)) = prayers.iter().find(|&&(_, at)| at > now) {
        return ResolvedState::Resolved(Resolution {
            current,
            next: name,
            next_at: at,
            remaining: clamp_to_zero(at - now),
        });
    }

    match schedule.tomorrow_fajr() {
        Some(at) => ResolvedState::Resolved(Resolution {
            current,
            next: PrayerName::Fajr,
            next_at: at,
            remaining: clamp_to_zero(at - now),
        }),
        None => ResolvedState::Unresolved,
    }
}

// Ties go to "0 remaining", never a recursive re-resolve.
fn clamp_to_zero(delta: Duration) -> Duration {
    if delta < Duration::zero() {
        Duration::zero()
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
    }

    fn day_schedule(times: &[(PrayerName, u32, u32)], tomorrow_fajr: Option<(u32, u32)>) -> DaySchedule {
        let tomorrow = tomorrow_fajr.map(|(h, m)| {
            DaySchedule::from_parts(
                NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
                [(PrayerName::Fajr, Some(at(11, h, m)))],
                None,
            )
            .unwrap()
        });
        DaySchedule::from_parts(
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            times.iter().map(|&(name, h, m)| (name, Some(at(10, h, m)))),
            tomorrow,
        )
        .unwrap()
    }

    fn full_day() -> DaySchedule {
        day_schedule(
            &[
                (PrayerName::Fajr, 6, 0),
                (PrayerName::Sunrise, 7, 20),
                (PrayerName::Dhuhr, 12, 0),
                (PrayerName::Asr, 15, 0),
                (PrayerName::Maghrib, 18, 0),
                (PrayerName::Isha, 19, 30),
            ],
            Some((6, 5)),
        )
    }

    #[test]
    fn mid_day_resolves_current_and_next() {
        let state = resolve(&full_day(), at(10, 12, 30));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.current, Some(PrayerName::Dhuhr));
        assert_eq!(resolution.next, PrayerName::Asr);
        assert_eq!(resolution.remaining, Duration::minutes(150));
    }

    #[test]
    fn before_first_prayer_has_no_current() {
        let state = resolve(&full_day(), at(10, 5, 0));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.current, None);
        assert_eq!(resolution.next, PrayerName::Fajr);
    }

    #[test]
    fn sunrise_is_never_current_or_next() {
        let state = resolve(&full_day(), at(10, 7, 30));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.current, Some(PrayerName::Fajr));
        assert_eq!(resolution.next, PrayerName::Dhuhr);
    }

    #[test]
    fn after_last_prayer_rolls_over_to_tomorrow_fajr() {
        let state = resolve(&full_day(), at(10, 20, 0));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.current, Some(PrayerName::Isha));
        assert_eq!(resolution.next, PrayerName::Fajr);
        assert_eq!(resolution.next_at, at(11, 6, 5));
        assert_eq!(resolution.remaining, Duration::minutes(10 * 60 + 5));
    }

    #[test]
    fn after_last_prayer_without_lookahead_is_unresolved() {
        let schedule = day_schedule(&[(PrayerName::Dhuhr, 12, 0)], None);
        assert_eq!(resolve(&schedule, at(10, 13, 0)), ResolvedState::Unresolved);
    }

    #[test]
    fn single_prayer_day_resolves_while_it_is_upcoming() {
        let schedule = day_schedule(&[(PrayerName::Dhuhr, 12, 0)], None);
        let state = resolve(&schedule, at(10, 11, 0));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.current, None);
        assert_eq!(resolution.next, PrayerName::Dhuhr);
    }

    #[test]
    fn empty_schedule_is_unresolved() {
        let schedule = DaySchedule {
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            times: Default::default(),
            tomorrow: None,
        };
        assert_eq!(resolve(&schedule, at(10, 12, 0)), ResolvedState::Unresolved);
    }

    #[test]
    fn out_of_order_timestamps_resolve_like_sorted_ones() {
        // Asr earlier than Dhuhr on the wire; the resolver must order by
        // instant, not by name.
        let schedule = day_schedule(
            &[
                (PrayerName::Fajr, 6, 0),
                (PrayerName::Dhuhr, 15, 0),
                (PrayerName::Asr, 12, 0),
                (PrayerName::Maghrib, 18, 0),
            ],
            None,
        );
        let state = resolve(&schedule, at(10, 13, 0));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.current, Some(PrayerName::Asr));
        assert_eq!(resolution.next, PrayerName::Dhuhr);
    }

    #[test]
    fn equal_timestamps_tie_break_to_earlier_name() {
        let schedule = day_schedule(
            &[
                (PrayerName::Dhuhr, 12, 0),
                (PrayerName::Asr, 12, 0),
                (PrayerName::Maghrib, 18, 0),
            ],
            None,
        );
        let state = resolve(&schedule, at(10, 12, 0));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.current, Some(PrayerName::Dhuhr));
        // A true tie never yields `next == current`: next must be strictly
        // in the future.
        assert_eq!(resolution.next, PrayerName::Maghrib);
    }

    #[test]
    fn remaining_clamps_to_zero_when_now_passes_next() {
        let schedule = day_schedule(&[(PrayerName::Dhuhr, 12, 0)], Some((6, 5)));
        // Both today's prayers and tomorrow's Fajr are behind `now`.
        let state = resolve(&schedule, at(11, 7, 0));
        let resolution = state.resolution().unwrap();
        assert_eq!(resolution.remaining, Duration::zero());
    }

    #[test]
    fn countdown_is_monotonic_until_next_advances() {
        let schedule = full_day();
        let mut previous: Option<(DateTime<Utc>, Duration)> = None;
        let mut now = at(10, 5, 0);
        while now < at(10, 21, 0) {
            if let ResolvedState::Resolved(resolution) = resolve(&schedule, now) {
                if let Some((prev_next_at, prev_remaining)) = previous {
                    if prev_next_at == resolution.next_at {
                        assert!(resolution.remaining <= prev_remaining);
                    }
                }
                previous = Some((resolution.next_at, resolution.remaining));
            }
            now = now + Duration::minutes(1);
        }
    }
}
