//! Round-trip codec between a [`DaySchedule`] and a schema-less plain
//! record.
//!
//! The store persists only plain, date-less values, so every instant
//! becomes an RFC 3339 string on the way in and is sniffed back out
//! structurally on the way out. `decode(encode(x)) == x` for every valid
//! schedule.

use crate::error::RecordError;
use crate::schedule::{DaySchedule, PrayerName};
use crate::store::PlainRecord;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

const DATE_KEY: &str = "date";
const TIMES_KEY: &str = "times";
const TOMORROW_KEY: &str = "tomorrow";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value that was expected to be an instant but could not be
/// reconstructed. Kept raw so decoding never loses data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedField {
    pub field: String,
    pub raw: String,
}

/// A decoded record: the reconstructed schedule plus any fields the
/// structural heuristic could not reconstruct.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub schedule: DaySchedule,
    pub malformed: Vec<MalformedField>,
}

/// Encodes a schedule as a plain record.
pub fn encode(schedule: &DaySchedule) -> PlainRecord {
    let mut record = PlainRecord::new();
    record.insert(
        DATE_KEY.to_string(),
        Value::String(schedule.date.format(DATE_FORMAT).to_string()),
    );
    record.insert(TIMES_KEY.to_string(), encode_times(&schedule.times));
    if let Some(tomorrow) = &schedule.tomorrow {
        record.insert(TOMORROW_KEY.to_string(), Value::Object(encode(tomorrow)));
    }
    record
}

fn encode_times(times: &BTreeMap<PrayerName, DateTime<Utc>>) -> Value {
    let mut map = PlainRecord::new();
    for (name, at) in times {
        map.insert(
            name.key().to_string(),
            Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
    }
    Value::Object(map)
}

/// Decodes a plain record back into a schedule.
///
/// The store has no schema, so instant-shaped strings are detected by the
/// presence of the date/time separator. A value under a known event key
/// that is not instant-shaped, or that fails to parse, is reported in
/// [`Decoded::malformed`] and skipped; decoding itself fails only on a
/// missing or unreadable date key. Unknown keys are ignored.
pub fn decode(record: &PlainRecord) -> Result<Decoded, RecordError> {
    decode_day(record, "")
}

/// A record is usable only when its date key matches the current local
/// calendar date. A stale record triggers recomputation by the caller.
pub fn ensure_fresh(schedule: &DaySchedule, today: NaiveDate) -> Result<(), RecordError> {
    if schedule.date == today {
        Ok(())
    } else {
        Err(RecordError::Stale {
            stored: schedule.date,
            today,
        })
    }
}

fn decode_day(record: &PlainRecord, prefix: &str) -> Result<Decoded, RecordError> {
    let raw_date = record
        .get(DATE_KEY)
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingField(DATE_KEY))?;
    let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|_| RecordError::BadDate {
        field: DATE_KEY,
        raw: raw_date.to_string(),
    })?;

    let mut times = BTreeMap::new();
    let mut malformed = Vec::new();
    if let Some(Value::Object(raw_times)) = record.get(TIMES_KEY) {
        for (key, value) in raw_times {
            let Some(name) = PrayerName::from_key(key) else {
                continue;
            };
            let field = format!("{prefix}{key}");
            match value.as_str() {
                Some(raw) if looks_like_instant(raw) => match parse_instant(raw) {
                    Some(at) => {
                        times.insert(name, at);
                    }
                    None => malformed.push(MalformedField {
                        field,
                        raw: raw.to_string(),
                    }),
                },
                Some(raw) => malformed.push(MalformedField {
                    field,
                    raw: raw.to_string(),
                }),
                None => malformed.push(MalformedField {
                    field,
                    raw: value.to_string(),
                }),
            }
        }
    }

    let tomorrow = match record.get(TOMORROW_KEY) {
        Some(Value::Object(inner)) => {
            let decoded = decode_day(inner, "tomorrow.")?;
            malformed.extend(decoded.malformed);
            Some(Box::new(decoded.schedule))
        }
        _ => None,
    };

    Ok(Decoded {
        schedule: DaySchedule {
            date,
            times,
            tomorrow,
        },
        malformed,
    })
}

// The structural heuristic: a date/time separator marks an instant-shaped
// string. A plain string containing a 'T' would be misread; see DESIGN.md.
fn looks_like_instant(raw: &str) -> bool {
    raw.contains('T')
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
    }

    fn sample_schedule() -> DaySchedule {
        let tomorrow = DaySchedule::from_parts(
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
            [
                (PrayerName::Fajr, Some(at(11, 5, 1))),
                (PrayerName::Sunrise, Some(at(11, 6, 24))),
            ],
            None,
        )
        .unwrap();
        DaySchedule::from_parts(
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            [
                (PrayerName::Fajr, Some(at(10, 5, 0))),
                (PrayerName::Sunrise, Some(at(10, 6, 25))),
                (PrayerName::Dhuhr, Some(at(10, 12, 30))),
                (PrayerName::Asr, Some(at(10, 15, 45))),
                (PrayerName::Maghrib, Some(at(10, 18, 35))),
                (PrayerName::Isha, Some(at(10, 20, 0))),
            ],
            Some(tomorrow),
        )
        .unwrap()
    }

    #[test]
    fn round_trip_law_holds() {
        let schedule = sample_schedule();
        let decoded = decode(&encode(&schedule)).unwrap();
        assert_eq!(decoded.schedule, schedule);
        assert!(decoded.malformed.is_empty());
    }

    #[test]
    fn round_trip_preserves_sub_second_instants() {
        let mut schedule = sample_schedule();
        schedule.times.insert(
            PrayerName::Fajr,
            at(10, 5, 0) + chrono::Duration::milliseconds(250),
        );
        let decoded = decode(&encode(&schedule)).unwrap();
        assert_eq!(decoded.schedule, schedule);
    }

    #[test]
    fn unparseable_instant_shaped_strings_are_flagged_not_fatal() {
        let mut record = encode(&sample_schedule());
        let times = record.get_mut(TIMES_KEY).unwrap().as_object_mut().unwrap();
        times.insert(
            "dhuhr".to_string(),
            Value::String("2026-03-10Tnot-a-time".to_string()),
        );
        times.insert("asr".to_string(), Value::String("later today".to_string()));

        let decoded = decode(&record).unwrap();
        assert!(!decoded.schedule.times.contains_key(&PrayerName::Dhuhr));
        assert!(!decoded.schedule.times.contains_key(&PrayerName::Asr));
        let fields: Vec<_> = decoded.malformed.iter().map(|m| m.field.as_str()).collect();
        assert!(fields.contains(&"dhuhr"));
        assert!(fields.contains(&"asr"));
        // The raw values survive for the caller to inspect.
        assert!(decoded.malformed.iter().any(|m| m.raw == "later today"));
    }

    #[test]
    fn unknown_time_keys_are_ignored() {
        let mut record = encode(&sample_schedule());
        let times = record.get_mut(TIMES_KEY).unwrap().as_object_mut().unwrap();
        times.insert(
            "midnight".to_string(),
            Value::String("2026-03-10T23:59:00Z".to_string()),
        );

        let decoded = decode(&record).unwrap();
        assert_eq!(decoded.schedule, sample_schedule());
    }

    #[test]
    fn missing_date_fails_decode() {
        let mut record = encode(&sample_schedule());
        record.remove(DATE_KEY);
        assert!(matches!(
            decode(&record),
            Err(RecordError::MissingField("date"))
        ));
    }

    #[test]
    fn stale_date_is_detected_against_local_today() {
        let schedule = sample_schedule();
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert!(ensure_fresh(&schedule, today).is_ok());

        let next_day = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        match ensure_fresh(&schedule, next_day) {
            Err(RecordError::Stale { stored, today }) => {
                assert_eq!(stored, schedule.date);
                assert_eq!(today, next_day);
            }
            other => panic!("expected stale error, got {other:?}"),
        }
    }
}
