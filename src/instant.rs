use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};

use crate::errors::CronError;
use crate::Direction;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A wall-clock timestamp truncated to the minute.
///
/// The weekday is always derived from the date and never stored. Instants
/// order chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(NaiveDateTime);

impl Instant {
    /// Creates an instant from calendar parts.
    ///
    /// # Errors
    ///
    /// - `CronError::InvalidDate` if the date does not exist (e.g. February 30th).
    /// - `CronError::InvalidTime` if the hour or minute is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use croncalc::Instant;
    ///
    /// let leap_day = Instant::new(2024, 2, 29, 12, 30).unwrap();
    /// assert_eq!(leap_day.weekday(), 4); // Thursday
    /// assert!(Instant::new(2023, 2, 29, 12, 30).is_err());
    /// ```
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Result<Self, CronError> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(CronError::InvalidDate)?;
        let time = date
            .and_hms_opt(hour, minute, 0)
            .ok_or(CronError::InvalidTime)?;
        Ok(Self(time))
    }

    /// Converts a naive date and time, discarding seconds and below.
    pub fn from_naive(naive: NaiveDateTime) -> Self {
        let truncated = naive
            .with_second(0)
            .and_then(|naive| naive.with_nanosecond(0))
            .unwrap_or(naive);
        Self(truncated)
    }

    /// Converts a zoned date and time using its local wall-clock reading.
    pub fn from_datetime<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        Self::from_naive(time.naive_local())
    }

    /// The current local wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn to_naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Day of the week, 0 (Sunday) to 6 (Saturday).
    pub fn weekday(&self) -> u32 {
        self.0.weekday().num_days_from_sunday()
    }

    pub fn checked_add_minutes(&self, minutes: i64) -> Option<Self> {
        Duration::try_minutes(minutes)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
    }

    /// The adjacent minute in `direction`.
    pub(crate) fn step(&self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::Forward => self.checked_add_minutes(1),
            Direction::Backward => self.checked_add_minutes(-1),
        }
    }
}

impl From<NaiveDateTime> for Instant {
    fn from(naive: NaiveDateTime) -> Self {
        Self::from_naive(naive)
    }
}

impl From<Instant> for NaiveDateTime {
    fn from(instant: Instant) -> Self {
        instant.0
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DISPLAY_FORMAT))
    }
}

impl FromStr for Instant {
    type Err = CronError;

    /// Parses `YYYY-MM-DD HH:MM`, optionally followed by `:SS` which is discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, DISPLAY_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
            .map(Self::from_naive)
            .map_err(|_| CronError::InvalidDate)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Instant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Instant {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Day of the week (0 = Sunday) of a calendar date, if the date exists.
pub(crate) fn weekday_of(year: i32, month: u32, day: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.weekday().num_days_from_sunday())
}

/// Gregorian leap year: every fourth year, except centuries not divisible by 400.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` of `year`, or 0 for a month outside 1-12.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}
