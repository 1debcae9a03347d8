use std::{io, path::PathBuf};

use thiserror::Error;

/// failures reading or writing the alarm list
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("couldn't access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no home directory to keep the config in")]
    NoConfigDir,
}

/// failures starting sound playback for a ringing alarm
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no sound named {0:?} is configured")]
    UnknownSound(String),
    #[error("couldn't open sound file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("audio thread is not running")]
    Disconnected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlarmError {
    #[error("alarm has no time")]
    MissingTime,
    #[error("invalid alarm time {0:?}, expected HH:MM or H:MM AM/PM")]
    InvalidTime(String),
    #[error("hour {hour} minute {minute} is not a valid time of day")]
    OutOfRange { hour: u8, minute: u8 },
}
