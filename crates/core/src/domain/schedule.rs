use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::text;

/// Calendar weekday. The storage encoding uses unaccented Spanish names, the
/// vocabulary providers actually submit; `parse` additionally accepts accented
/// spellings and English names, case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "lunes",
            Self::Tuesday => "martes",
            Self::Wednesday => "miercoles",
            Self::Thursday => "jueves",
            Self::Friday => "viernes",
            Self::Saturday => "sabado",
            Self::Sunday => "domingo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match text::fold(value).as_str() {
            "lunes" | "monday" => Some(Self::Monday),
            "martes" | "tuesday" => Some(Self::Tuesday),
            "miercoles" | "wednesday" => Some(Self::Wednesday),
            "jueves" | "thursday" => Some(Self::Thursday),
            "viernes" | "friday" => Some(Self::Friday),
            "sabado" | "saturday" => Some(Self::Saturday),
            "domingo" | "sunday" => Some(Self::Sunday),
            _ => None,
        }
    }

    pub fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

/// Delivery day range, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Every weekday occurring between `start` and `end` inclusive. The scan
    /// stops once all seven weekdays are covered; an inverted window yields
    /// nothing.
    pub fn weekdays(&self) -> Vec<Weekday> {
        let mut found = Vec::new();
        let mut cursor = self.start;
        while cursor.date_naive() <= self.end.date_naive() && found.len() < 7 {
            let weekday = Weekday::from_chrono(cursor.weekday());
            if !found.contains(&weekday) {
                found.push(weekday);
            }
            cursor += Duration::days(1);
        }
        found
    }
}

/// Delivery hour range, half-open `[start, end)`, hours of day 0..=24.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u8,
    pub end: u8,
}

/// One weekly availability slot on a drop zone or pick-up point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub weekday: Weekday,
    pub hour_start: u8,
    pub hour_end: u8,
}

impl ScheduleWindow {
    /// True when this slot's weekday is requested and its hours overlap the
    /// requested range: `slot.start < window.end && slot.end > window.start`.
    pub fn matches(&self, weekdays: &[Weekday], hours: &HourWindow) -> bool {
        weekdays.contains(&self.weekday)
            && self.hour_start < hours.end
            && self.hour_end > hours.start
    }
}
