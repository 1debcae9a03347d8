use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::{config::always_true, error::AlarmError, TimeOfDay};

pub type AlarmId = u64;

/// the minute of the day an alarm goes off at (`0..1440`)
///
/// stored as `"HH:MM"` (24 hour) but parses 12 hour input such as `"7:30 pm"` as well
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmTime(u16);

impl AlarmTime {
    pub fn from_hm(hour: u8, minute: u8) -> Result<Self, AlarmError> {
        if hour < 24 && minute < 60 {
            Ok(Self(u16::from(hour) * 60 + u16::from(minute)))
        } else {
            Err(AlarmError::OutOfRange { hour, minute })
        }
    }

    /// `hour` is `1..=12`, 12 AM being midnight and 12 PM noon
    pub fn from_12h(hour: u8, minute: u8, time_of_day: TimeOfDay) -> Result<Self, AlarmError> {
        if !(1..=12).contains(&hour) {
            return Err(AlarmError::OutOfRange { hour, minute });
        }
        let hour = match (hour, time_of_day) {
            (12, TimeOfDay::AM) => 0,
            (12, TimeOfDay::PM) => 12,
            (hour, TimeOfDay::AM) => hour,
            (hour, TimeOfDay::PM) => hour + 12,
        };
        Self::from_hm(hour, minute)
    }

    /// truncates to the minute
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn of<T: Timelike>(time: &T) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    #[must_use]
    pub const fn minute_of_day(self) -> u16 {
        self.0
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }

    #[must_use]
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::default() + Duration::minutes(i64::from(self.0))
    }

    /// formats with a chrono strftime string, e.g. `"%l:%M %p"`
    #[must_use]
    pub fn format(self, time_format: &str) -> String {
        self.to_naive_time().format(time_format).to_string()
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for AlarmTime {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AlarmError::InvalidTime(s.to_string());
        let trimmed = s.trim();
        // everything from the first letter on is the meridiem
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (clock, meridiem) = trimmed.split_at(split);
        let (hour, minute) = clock.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: u8 = minute.trim().parse().map_err(|_| invalid())?;
        if meridiem.is_empty() {
            Self::from_hm(hour, minute)
        } else {
            let time_of_day = TimeOfDay::parse(meridiem).ok_or_else(invalid)?;
            Self::from_12h(hour, minute, time_of_day)
        }
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = AlarmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlarmTime> for String {
    fn from(time: AlarmTime) -> Self {
        time.to_string()
    }
}

/// which days an alarm may go off on
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RepeatRule {
    #[default]
    Once,
    Daily,
    Weekdays,
    Weekends,
    /// kept as written, matches every day
    Unknown(String),
}

impl RepeatRule {
    #[must_use]
    pub const fn matches(&self, day: Weekday) -> bool {
        match self {
            Self::Weekdays => !matches!(day, Weekday::Sat | Weekday::Sun),
            Self::Weekends => matches!(day, Weekday::Sat | Weekday::Sun),
            Self::Once | Self::Daily | Self::Unknown(_) => true,
        }
    }

    /// like `From<String>` but refuses rules it doesn't know
    #[must_use]
    pub fn parse_known(text: &str) -> Option<Self> {
        match Self::from(text.to_string()) {
            Self::Unknown(_) => None,
            known => Some(known),
        }
    }

    #[must_use]
    pub fn describe(&self) -> &str {
        match self {
            Self::Once => "Once",
            Self::Daily => "Every day",
            Self::Weekdays => "Mon-Fri",
            Self::Weekends => "Sat-Sun",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for RepeatRule {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "once" => Self::Once,
            "daily" => Self::Daily,
            "weekdays" => Self::Weekdays,
            "weekends" => Self::Weekends,
            _ => Self::Unknown(value),
        }
    }
}

impl From<RepeatRule> for String {
    fn from(rule: RepeatRule) -> Self {
        match rule {
            RepeatRule::Once => "once".to_string(),
            RepeatRule::Daily => "daily".to_string(),
            RepeatRule::Weekdays => "weekdays".to_string(),
            RepeatRule::Weekends => "weekends".to_string(),
            RepeatRule::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// represents an alarm: when it goes off, which days, and how it sounds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub id: AlarmId,
    pub name: String,
    pub time: AlarmTime,
    #[serde(default)]
    pub repeat: RepeatRule,
    #[serde(default = "always_true")]
    pub active: bool,
    pub sound: String,
    /// percent, `0..=100`
    pub volume: u8,
}

impl Alarm {
    pub const DEFAULT_NAME: &'static str = "Alarm";
    pub const DEFAULT_VOLUME: u8 = 80;

    /// whether the alarm should go off during the minute `now` falls in
    #[must_use]
    pub fn is_due(&self, now: &NaiveDateTime) -> bool {
        self.active && self.time == AlarmTime::of(now) && self.repeat.matches(now.weekday())
    }

    /// the next minute after `now` the alarm would go off at, if it is active
    #[must_use]
    pub fn next_occurrence(&self, now: &NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.active {
            return None;
        }
        let today = now.date();
        let current = AlarmTime::of(now);
        (0..=7)
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
            .find(|day| self.repeat.matches(day.weekday()) && (*day != today || self.time > current))
            .map(|day| day.and_time(self.time.to_naive_time()))
    }
}
