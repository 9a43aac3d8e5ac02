//! One calendar day's event set: named prayer instants plus an optional
//! lookahead at the following day.

use crate::error::ScheduleError;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// A named instant within the day.
///
/// The declaration order is canonical: the resolver uses it to break ties
/// between events sharing a timestamp. `Sunrise` is informational only and
/// never participates in prayer resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// Every name, in canonical order.
    pub const ALL: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// Whether this event is an actual prayer. Sunrise is not.
    pub fn is_prayer(self) -> bool {
        !matches!(self, PrayerName::Sunrise)
    }

    /// The lowercase storage key for this name.
    pub fn key(self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Sunrise => "sunrise",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    /// Parses a storage key back into a name.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "fajr" => Some(PrayerName::Fajr),
            "sunrise" => Some(PrayerName::Sunrise),
            "dhuhr" => Some(PrayerName::Dhuhr),
            "asr" => Some(PrayerName::Asr),
            "maghrib" => Some(PrayerName::Maghrib),
            "isha" => Some(PrayerName::Isha),
            _ => None,
        }
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        };
        f.write_str(name)
    }
}

/// One calendar day's events plus an optional lookahead at the day after.
///
/// `times` is keyed by name, not ordered by instant: chronological ordering
/// is the resolver's responsibility, so the prayer-only and all-events views
/// can order independently without duplicating storage. Snapshots are
/// immutable once built; a new day or new settings produce a new schedule,
/// they never mutate this one.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    /// Local calendar date, the partition key for freshness checks.
    pub date: NaiveDate,
    pub times: BTreeMap<PrayerName, DateTime<Utc>>,
    /// The day immediately following `date`, consulted only for its first
    /// prayer once today's events are exhausted.
    pub tomorrow: Option<Box<DaySchedule>>,
}

impl DaySchedule {
    /// Builds a schedule from raw per-name timestamps, dropping absent
    /// entries.
    ///
    /// Fails only when today and tomorrow together hold no usable event.
    pub fn from_parts(
        date: NaiveDate,
        raw: impl IntoIterator<Item = (PrayerName, Option<DateTime<Utc>>)>,
        tomorrow: Option<DaySchedule>,
    ) -> Result<Self, ScheduleError> {
        let times: BTreeMap<_, _> = raw
            .into_iter()
            .filter_map(|(name, at)| Some((name, at?)))
            .collect();
        let tomorrow_empty = tomorrow.as_ref().map_or(true, |t| t.times.is_empty());
        if times.is_empty() && tomorrow_empty {
            return Err(ScheduleError::Incomplete);
        }
        Ok(Self {
            date,
            times,
            tomorrow: tomorrow.map(Box::new),
        })
    }

    /// The prayer events of this day, sunrise excluded.
    pub fn prayers(&self) -> impl Iterator<Item = (PrayerName, DateTime<Utc>)> + '_ {
        self.times
            .iter()
            .filter(|(name, _)| name.is_prayer())
            .map(|(name, at)| (*name, *at))
    }

    /// Tomorrow's first prayer, when the lookahead is present.
    pub fn tomorrow_fajr(&self) -> Option<DateTime<Utc>> {
        self.tomorrow
            .as_ref()
            .and_then(|t| t.times.get(&PrayerName::Fajr).copied())
    }
}
