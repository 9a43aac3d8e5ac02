//! Configuration structures for the miqat engine.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`. This keeps the location, calculation
//! preferences and timing knobs external to the application code.

use crate::common::{DEFAULT_PERIOD_SECS, DEFAULT_URGENCY_MINUTES};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The top-level configuration for the [`MiqatEngine`](crate::engine::MiqatEngine).
///
/// Typically loaded from a TOML file at startup via [`from_file`].
#[derive(Debug, Clone, Deserialize)]
pub struct MiqatConfig {
    /// Where prayer times are calculated for.
    pub location: Location,

    /// The calculation method handed to the external calculation service.
    #[serde(default)]
    pub method: CalculationMethod,

    /// The Asr shadow-length convention handed to the calculation service.
    #[serde(default)]
    pub asr_school: AsrSchool,

    /// The timezone used for local calendar dates. Freshness of the stored
    /// schedule is judged against this local date, never the UTC date.
    /// Uses IANA Time Zone Database names (e.g., "Europe/London").
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// The shared refresh period of the foreground loop and the background
    /// alarm, in seconds.
    #[serde(default = "default_period")]
    pub refresh_period_secs: u64,

    /// Countdowns below this many minutes are flagged urgent.
    #[serde(default = "default_urgency")]
    pub urgency_threshold_minutes: i64,
}

impl MiqatConfig {
    /// The calendar date at `now` in the configured timezone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}

impl Default for MiqatConfig {
    fn default() -> Self {
        Self {
            location: Location {
                latitude: 21.4225,
                longitude: 39.8262,
                city: Some("Makkah".to_string()),
                country: Some("Saudi Arabia".to_string()),
            },
            method: CalculationMethod::default(),
            asr_school: AsrSchool::default(),
            timezone: default_timezone(),
            refresh_period_secs: default_period(),
            urgency_threshold_minutes: default_urgency(),
        }
    }
}

/// A geographic location, optionally annotated with a resolved place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Location {
    /// A short human label: "City, Country" when resolved, coordinates otherwise.
    pub fn label(&self) -> String {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            _ => format!("{:.4}, {:.4}", self.latitude, self.longitude),
        }
    }
}

/// Calculation method codes understood by the external calculation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationMethod {
    #[default]
    #[serde(rename = "MWL")]
    Mwl,
    #[serde(rename = "ISNA")]
    Isna,
    Egypt,
    Karachi,
    UmmAlQura,
    Dubai,
    Moonsighting,
    Qatar,
    Singapore,
    #[serde(rename = "JAKIM")]
    Jakim,
    Kemenag,
    Tehran,
    Turkey,
}

impl CalculationMethod {
    /// The long display name of the method.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Mwl => "Muslim World League",
            Self::Isna => "Islamic Society of North America",
            Self::Egypt => "Egyptian General Authority",
            Self::Karachi => "University of Islamic Sciences, Karachi",
            Self::UmmAlQura => "Umm Al-Qura University, Makkah",
            Self::Dubai => "Dubai",
            Self::Moonsighting => "Moonsighting Committee",
            Self::Qatar => "Qatar",
            Self::Singapore => "Singapore",
            Self::Jakim => "Jabatan Kemajuan Islam Malaysia",
            Self::Kemenag => "Kementerian Agama, Indonesia",
            Self::Tehran => "Institute of Geophysics, University of Tehran",
            Self::Turkey => "Turkey Diyanet",
        }
    }
}

/// The Asr shadow-length convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsrSchool {
    /// Shafi, Maliki and Hanbali convention.
    #[default]
    Standard,
    Hanafi,
}

/// Loads a [`MiqatConfig`] from a TOML file.
pub fn from_file(path: &str) -> Result<MiqatConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(path))
        .build()?
        .try_deserialize()
}

// --- Default value functions for serde ---

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_period() -> u64 {
    DEFAULT_PERIOD_SECS
}

fn default_urgency() -> i64 {
    DEFAULT_URGENCY_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MINIMAL: &str = r#"
timezone = "Europe/London"

[location]
latitude = 51.5074
longitude = -0.1278
city = "London"
country = "United Kingdom"
"#;

    #[test]
    fn minimal_file_fills_defaults() {
        let cfg: MiqatConfig = config::Config::builder()
            .add_source(config::File::from_str(MINIMAL, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.timezone, Tz::Europe__London);
        assert_eq!(cfg.method, CalculationMethod::Mwl);
        assert_eq!(cfg.asr_school, AsrSchool::Standard);
        assert_eq!(cfg.refresh_period_secs, 15);
        assert_eq!(cfg.urgency_threshold_minutes, 10);
        assert_eq!(cfg.location.label(), "London, United Kingdom");
    }

    #[test]
    fn local_date_follows_configured_timezone() {
        let cfg = MiqatConfig {
            timezone: Tz::Asia__Karachi,
            ..MiqatConfig::default()
        };
        // 22:00 UTC is already the next day at UTC+5.
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 22, 0, 0).unwrap();
        assert_eq!(
            cfg.local_date(now),
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
        );
    }
}
