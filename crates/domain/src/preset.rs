//! Preset operands — values computed from the wall clock and the sun.

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::solar::{Coordinates, SolarPosition, solar_events, sun_altitude};

/// A system-computed operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Current date, `YYYY-MM-DD`.
    Date,
    /// Current time, `HH:MM`.
    Time,
    /// Month number, `1`–`12`.
    Month,
    /// Weekday name, e.g. `Monday`.
    Day,
    /// Meteorological season for the northern hemisphere.
    SeasonNorthern,
    /// Meteorological season for the southern hemisphere.
    SeasonSouthern,
    /// `day` between sunrise and sunset, `night` otherwise.
    SunPosition,
}

impl Preset {
    /// Resolve the preset at a given local instant.
    #[must_use]
    pub fn value(self, at: DateTime<Local>, coordinates: Coordinates) -> String {
        match self {
            Self::Date => at.format("%Y-%m-%d").to_string(),
            Self::Time => at.format("%H:%M").to_string(),
            Self::Month => at.month().to_string(),
            Self::Day => at.format("%A").to_string(),
            Self::SeasonNorthern => season(at.month(), Hemisphere::Northern).to_string(),
            Self::SeasonSouthern => season(at.month(), Hemisphere::Southern).to_string(),
            Self::SunPosition => sun_position(at.with_timezone(&Utc), coordinates).to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum Hemisphere {
    Northern,
    Southern,
}

fn season(month: u32, hemisphere: Hemisphere) -> &'static str {
    let northern = match month {
        3..=5 => "spring",
        6..=8 => "summer",
        9..=11 => "fall",
        _ => "winter",
    };
    match (hemisphere, northern) {
        (Hemisphere::Northern, name) => name,
        (Hemisphere::Southern, "spring") => "fall",
        (Hemisphere::Southern, "summer") => "winter",
        (Hemisphere::Southern, "fall") => "spring",
        (Hemisphere::Southern, _) => "summer",
    }
}

fn sun_position(at: DateTime<Utc>, coordinates: Coordinates) -> &'static str {
    let events = solar_events(at.date_naive(), coordinates);
    match (
        events.get(&SolarPosition::Sunrise),
        events.get(&SolarPosition::Sunset),
    ) {
        (Some(sunrise), Some(sunset)) => {
            if at >= *sunrise && at <= *sunset {
                "day"
            } else {
                "night"
            }
        }
        // Polar day or night: the horizon crossing does not exist, fall
        // back to the sun's actual altitude.
        _ => {
            if sun_altitude(at, coordinates) > -0.833 {
                "day"
            } else {
                "night"
            }
        }
    }
}
