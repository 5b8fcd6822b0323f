//! Solar ephemeris — named instants of the solar day for a coordinate.
//!
//! Port of the standard sun-position equations (as popularised by the
//! `suncalc` library): solar transit from the julian cycle, declination
//! from the ecliptic longitude, and hour angles for a set of named
//! altitudes. On top of the astronomical events this module derives four
//! synthetic positions: `morning`/`evening` at 15° and `lateMorning`/
//! `afternoon` at (solar-noon altitude − 6°). The offsets are kept exactly
//! as the surrounding system has always used them.
//!
//! Everything here is pure: one call computes the whole map of instants
//! for a date, with no shared registration step.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Geographic coordinates used for all solar computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A named instant in the solar day cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolarPosition {
    #[serde(rename = "solarNoon")]
    SolarNoon,
    #[serde(rename = "nadir")]
    Nadir,
    #[serde(rename = "sunrise")]
    Sunrise,
    #[serde(rename = "sunset")]
    Sunset,
    #[serde(rename = "sunriseEnd")]
    SunriseEnd,
    #[serde(rename = "sunsetStart")]
    SunsetStart,
    #[serde(rename = "dawn")]
    Dawn,
    #[serde(rename = "dusk")]
    Dusk,
    #[serde(rename = "nauticalDawn")]
    NauticalDawn,
    #[serde(rename = "nauticalDusk")]
    NauticalDusk,
    #[serde(rename = "nightEnd")]
    NightEnd,
    #[serde(rename = "night")]
    Night,
    #[serde(rename = "goldenHourEnd")]
    GoldenHourEnd,
    #[serde(rename = "goldenHour")]
    GoldenHour,
    #[serde(rename = "morning")]
    Morning,
    #[serde(rename = "lateMorning")]
    LateMorning,
    #[serde(rename = "afternoon")]
    Afternoon,
    #[serde(rename = "evening")]
    Evening,
}

impl SolarPosition {
    const ALL: [(Self, &'static str); 18] = [
        (Self::SolarNoon, "solarNoon"),
        (Self::Nadir, "nadir"),
        (Self::Sunrise, "sunrise"),
        (Self::Sunset, "sunset"),
        (Self::SunriseEnd, "sunriseEnd"),
        (Self::SunsetStart, "sunsetStart"),
        (Self::Dawn, "dawn"),
        (Self::Dusk, "dusk"),
        (Self::NauticalDawn, "nauticalDawn"),
        (Self::NauticalDusk, "nauticalDusk"),
        (Self::NightEnd, "nightEnd"),
        (Self::Night, "night"),
        (Self::GoldenHourEnd, "goldenHourEnd"),
        (Self::GoldenHour, "goldenHour"),
        (Self::Morning, "morning"),
        (Self::LateMorning, "lateMorning"),
        (Self::Afternoon, "afternoon"),
        (Self::Evening, "evening"),
    ];

    /// The name used in storage and as scheduler registry key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(position, _)| *position == self)
            .map_or("", |(_, name)| name)
    }
}

impl fmt::Display for SolarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown position name.
#[derive(Debug, thiserror::Error)]
#[error("unknown solar position: {0}")]
pub struct UnknownPosition(String);

impl FromStr for SolarPosition {
    type Err = UnknownPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(position, _)| *position)
            .ok_or_else(|| UnknownPosition(s.to_string()))
    }
}

const RAD: f64 = PI / 180.0;
const DAY_MS: f64 = 86_400_000.0;
const J1970: f64 = 2_440_588.0;
const J2000: f64 = 2_451_545.0;
const J0: f64 = 0.0009;
const OBLIQUITY: f64 = RAD * 23.4397;
const PERIHELION: f64 = RAD * 102.9372;

/// Altitude thresholds (degrees) for the astronomical event pairs.
const EVENT_ANGLES: [(f64, SolarPosition, SolarPosition); 6] = [
    (-0.833, SolarPosition::Sunrise, SolarPosition::Sunset),
    (-0.3, SolarPosition::SunriseEnd, SolarPosition::SunsetStart),
    (-6.0, SolarPosition::Dawn, SolarPosition::Dusk),
    (-12.0, SolarPosition::NauticalDawn, SolarPosition::NauticalDusk),
    (-18.0, SolarPosition::NightEnd, SolarPosition::Night),
    (6.0, SolarPosition::GoldenHourEnd, SolarPosition::GoldenHour),
];

fn to_days(at: Timestamp) -> f64 {
    at.timestamp_millis() as f64 / DAY_MS - 0.5 + J1970 - J2000
}

fn from_julian(julian: f64) -> Option<Timestamp> {
    if !julian.is_finite() {
        return None;
    }
    let millis = (julian + 0.5 - J1970) * DAY_MS;
    chrono::DateTime::from_timestamp_millis(millis.round() as i64)
}

fn solar_mean_anomaly(days: f64) -> f64 {
    RAD * (357.5291 + 0.985_600_28 * days)
}

fn ecliptic_longitude(anomaly: f64) -> f64 {
    // Equation of center plus perihelion of the Earth.
    let center = RAD
        * (1.9148 * anomaly.sin() + 0.02 * (2.0 * anomaly).sin() + 0.0003 * (3.0 * anomaly).sin());
    anomaly + center + PERIHELION + PI
}

fn declination(longitude: f64) -> f64 {
    (longitude.sin() * OBLIQUITY.sin()).asin()
}

fn right_ascension(longitude: f64) -> f64 {
    (longitude.sin() * OBLIQUITY.cos()).atan2(longitude.cos())
}

fn sidereal_time(days: f64, lw: f64) -> f64 {
    RAD * (280.16 + 360.985_623_5 * days) - lw
}

fn solar_transit(ds: f64, anomaly: f64, longitude: f64) -> f64 {
    J2000 + ds + 0.0053 * anomaly.sin() - 0.0069 * (2.0 * longitude).sin()
}

/// Sun altitude above the horizon at an instant, in degrees.
#[must_use]
pub fn sun_altitude(at: Timestamp, coordinates: Coordinates) -> f64 {
    let lw = RAD * -coordinates.longitude;
    let phi = RAD * coordinates.latitude;
    let days = to_days(at);

    let longitude = ecliptic_longitude(solar_mean_anomaly(days));
    let dec = declination(longitude);
    let hour_angle = sidereal_time(days, lw) - right_ascension(longitude);

    (phi.sin() * dec.sin() + phi.cos() * dec.cos() * hour_angle.cos()).asin() / RAD
}

/// Compute every named solar instant for one calendar date.
///
/// Positions that do not occur on that date at the given coordinates
/// (polar day/night) are absent from the returned map. `solarNoon` and
/// `nadir` are always present.
#[must_use]
pub fn solar_events(date: NaiveDate, coordinates: Coordinates) -> HashMap<SolarPosition, Timestamp> {
    let midnight = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    let Some(midnight) = midnight else {
        return HashMap::new();
    };

    let lw = RAD * -coordinates.longitude;
    let phi = RAD * coordinates.latitude;

    let days = to_days(midnight);
    let cycle = (days - J0 - lw / (2.0 * PI)).round();
    let ds = J0 + lw / (2.0 * PI) + cycle;
    let anomaly = solar_mean_anomaly(ds);
    let longitude = ecliptic_longitude(anomaly);
    let dec = declination(longitude);

    let j_noon = solar_transit(ds, anomaly, longitude);

    let mut events = HashMap::new();
    if let Some(noon) = from_julian(j_noon) {
        events.insert(SolarPosition::SolarNoon, noon);
    }
    if let Some(nadir) = from_julian(j_noon - 0.5) {
        events.insert(SolarPosition::Nadir, nadir);
    }

    let mut insert_pair = |angle_deg: f64, rising: SolarPosition, setting: SolarPosition| {
        let h = angle_deg * RAD;
        let cos_hour = (h.sin() - phi.sin() * dec.sin()) / (phi.cos() * dec.cos());
        if cos_hour.abs() > 1.0 {
            // The sun never crosses this altitude today.
            return;
        }
        let w = cos_hour.acos();
        let j_set = solar_transit(J0 + (w + lw) / (2.0 * PI) + cycle, anomaly, longitude);
        let j_rise = j_noon - (j_set - j_noon);
        if let Some(at) = from_julian(j_rise) {
            events.insert(rising, at);
        }
        if let Some(at) = from_julian(j_set) {
            events.insert(setting, at);
        }
    };

    for (angle, rising, setting) in EVENT_ANGLES {
        insert_pair(angle, rising, setting);
    }

    // Synthetic positions: morning/evening at a fixed 15° and
    // lateMorning/afternoon six degrees under the day's peak altitude.
    let noon_altitude = from_julian(j_noon)
        .map_or(0.0, |noon| sun_altitude(noon, coordinates));
    insert_pair(15.0, SolarPosition::Morning, SolarPosition::Evening);
    insert_pair(
        noon_altitude - 6.0,
        SolarPosition::LateMorning,
        SolarPosition::Afternoon,
    );

    events
}
