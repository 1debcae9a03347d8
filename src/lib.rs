#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::fmt;

pub mod alarm;
/// building new alarms and applying edits to existing ones
pub mod alarm_edit;
pub mod clock;
pub mod communication;
pub mod config;
pub mod error;
pub mod notify;
pub mod runner;
pub mod store;
pub mod time_source;

#[cfg(test)]
pub(crate) mod testing;

pub use alarm::{Alarm, AlarmId, AlarmTime, RepeatRule};
pub use clock::{AlarmEvent, AlarmState, Clock, EventKind, OncePolicy, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOfDay {
    #[default]
    AM,
    PM,
}

impl TimeOfDay {
    /// parses `am`/`pm` in any case, with or without dots (`a.m.`)
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .collect::<String>()
            .to_ascii_lowercase();
        match cleaned.as_str() {
            "am" | "a" => Some(Self::AM),
            "pm" | "p" => Some(Self::PM),
            _ => None,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AM => write!(f, "AM"),
            Self::PM => write!(f, "PM"),
        }
    }
}
