//! Contracts for the external collaborators the engine consumes.
//!
//! The engine never computes astronomy and never performs network I/O: it
//! receives already-computed timestamps and already-resolved places through
//! these traits and leaves the implementations to its host.

use crate::config::{AsrSchool, CalculationMethod, Location};
use crate::schedule::PrayerName;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Timestamps for a single calendar day, keyed by event name. An absent
/// event simply has no key.
pub type DayTimes = BTreeMap<PrayerName, DateTime<Utc>>;

/// The astronomical calculation collaborator.
///
/// One call covers one calendar day for one location/method/asr tuple;
/// callers invoke it twice per refresh (today, then tomorrow).
pub trait CalculationService: Send + Sync {
    fn calculate(
        &self,
        location: &Location,
        date: NaiveDate,
        method: CalculationMethod,
        asr_school: AsrSchool,
    ) -> anyhow::Result<DayTimes>;
}

/// A resolved place.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
}

/// The geocoding collaborator. Implementations live with the caller; the
/// engine itself only ever sees coordinates that are already resolved.
pub trait Geocoder: Send + Sync {
    fn forward_geocode(&self, query: &str) -> anyhow::Result<Place>;

    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> anyhow::Result<Place>;
}

/// A calculation stand-in that maps every date onto the same local wall
/// times.
///
/// Useful for development binaries and tests; real deployments plug an
/// astronomical library in behind [`CalculationService`].
pub struct FixedTimetable {
    timezone: Tz,
    times: Vec<(PrayerName, NaiveTime)>,
}

impl FixedTimetable {
    pub fn new(timezone: Tz, times: Vec<(PrayerName, NaiveTime)>) -> Self {
        Self { timezone, times }
    }

    /// A plausible mid-latitude timetable.
    pub fn standard(timezone: Tz) -> Self {
        let entry = |name, hour, min| (name, NaiveTime::from_hms_opt(hour, min, 0).unwrap());
        Self::new(
            timezone,
            vec![
                entry(PrayerName::Fajr, 5, 0),
                entry(PrayerName::Sunrise, 6, 25),
                entry(PrayerName::Dhuhr, 12, 30),
                entry(PrayerName::Asr, 15, 45),
                entry(PrayerName::Maghrib, 18, 35),
                entry(PrayerName::Isha, 20, 0),
            ],
        )
    }
}

impl CalculationService for FixedTimetable {
    fn calculate(
        &self,
        _location: &Location,
        date: NaiveDate,
        _method: CalculationMethod,
        _asr_school: AsrSchool,
    ) -> anyhow::Result<DayTimes> {
        let mut times = DayTimes::new();
        for (name, wall) in &self.times {
            // Skip instants that do not exist locally (DST gaps).
            let Some(instant) = self.timezone.from_local_datetime(&date.and_time(*wall)).single()
            else {
                continue;
            };
            times.insert(*name, instant.with_timezone(&Utc));
        }
        Ok(times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timetable_projects_wall_times_onto_the_requested_date() {
        let table = FixedTimetable::standard(Tz::UTC);
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let times = table
            .calculate(
                &Location {
                    latitude: 0.0,
                    longitude: 0.0,
                    city: None,
                    country: None,
                },
                date,
                CalculationMethod::Mwl,
                AsrSchool::Standard,
            )
            .unwrap();

        assert_eq!(times.len(), 6);
        let dhuhr = times[&PrayerName::Dhuhr];
        assert_eq!(dhuhr.date_naive(), date);
        assert_eq!(dhuhr.format("%H:%M").to_string(), "12:30");
    }
}
